use super::Ledger;
use crate::core::credit::{Credit, CreditSchedule, PayStatus};
use crate::core::error::{LedgerError, Result};
use crate::core::investment::Investment;
use crate::core::transaction::{SettlementLink, Transaction, TransactionStatus};
use crate::store::WriteBatch;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of applying a status to a transaction.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub transaction: Transaction,
    /// False when the transaction already had the requested status.
    pub changed: bool,
}

impl Ledger {
    /// Moves a transaction to `status` and applies every effect of it.
    ///
    /// The status change, balance moves, ledger entry and credit or
    /// investment bookkeeping are committed as one batch. Settlement hooks
    /// run afterwards.
    pub async fn apply_status(&self, id: Uuid, status: TransactionStatus) -> Result<Settlement> {
        let settlement = {
            let _guard = self.write_lock.lock().await;
            let tx = self.transaction(id).await?;
            self.settle(tx, status, Utc::now()).await?
        };
        if settlement.changed {
            self.run_hooks(&settlement.transaction).await;
        }
        Ok(settlement)
    }

    /// Pays a pending transaction from one of the client's accounts.
    pub async fn pay(&self, client: Uuid, id: Uuid, sender: Uuid) -> Result<Settlement> {
        let settlement = {
            let _guard = self.write_lock.lock().await;
            let account = self.account(sender).await?;
            if account.client != client {
                return Err(LedgerError::NotAccountOwner);
            }
            let mut tx = self.transaction(id).await?;
            if tx.status != TransactionStatus::Pending {
                return Err(LedgerError::InvalidTransition {
                    from: tx.status,
                    to: TransactionStatus::Confirmed,
                });
            }
            match tx.sender {
                Some(bound) if bound != sender => {
                    return Err(LedgerError::Validation(
                        "This payment must be paid from another account".to_string(),
                    ));
                }
                _ => {}
            }
            if tx.recipient == sender {
                return Err(LedgerError::SameAccount);
            }
            tx.sender = Some(sender);
            self.settle(tx, TransactionStatus::Confirmed, Utc::now())
                .await?
        };
        self.run_hooks(&settlement.transaction).await;
        Ok(settlement)
    }

    /// Applies `status` to `tx`. Callers must hold the write lock.
    pub(super) async fn settle(
        &self,
        mut tx: Transaction,
        status: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<Settlement> {
        if !tx.transition(status, now)? {
            debug!(transaction = %tx.id, %status, "Status unchanged");
            return Ok(Settlement {
                transaction: tx,
                changed: false,
            });
        }

        let mut batch = WriteBatch::new();
        if status == TransactionStatus::Confirmed {
            self.book(
                &mut batch,
                tx.sender,
                tx.recipient,
                tx.amount,
                tx.kind,
                Some(tx.id),
                now,
            )
            .await?;
            if let Some(link) = tx.settlement_link() {
                self.settle_link(&mut batch, link, now).await?;
            }
        }
        batch.put(&tx)?;
        self.repo.commit(batch).await?;

        info!(transaction = %tx.id, amount = %tx.amount, %status, "Settled transaction");
        Ok(Settlement {
            transaction: tx,
            changed: true,
        })
    }

    async fn settle_link(
        &self,
        batch: &mut WriteBatch,
        link: SettlementLink,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match link {
            SettlementLink::CreditInstallment { credit, schedule } => {
                let mut credit: Credit = self
                    .repo
                    .get(credit)
                    .await?
                    .ok_or(LedgerError::CreditNotFound(credit))?;
                if credit.status == PayStatus::Paid {
                    warn!(credit = %credit.id, "Installment confirmed for a paid credit");
                    return Ok(());
                }
                if credit.apply_installment(now) {
                    batch.delete::<CreditSchedule>(schedule);
                    info!(credit = %credit.id, "Credit paid off");
                } else if let Some(mut schedule) =
                    self.repo.get::<CreditSchedule>(schedule).await?
                {
                    schedule.last_payment = Some(now);
                    batch.put(&schedule)?;
                }
                batch.put(&credit)?;
            }
            SettlementLink::InvestmentPayout { investment } => {
                let mut investment: Investment = self
                    .repo
                    .get(investment)
                    .await?
                    .ok_or(LedgerError::InvestmentNotFound(investment))?;
                investment.mark_paid(now);
                batch.put(&investment)?;
                info!(investment = %investment.id, "Investment paid out");
            }
        }
        Ok(())
    }

    pub(super) async fn run_hooks(&self, tx: &Transaction) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_settled(tx).await {
                warn!(transaction = %tx.id, "Settlement hook failed: {e:#}");
            }
        }
    }
}
