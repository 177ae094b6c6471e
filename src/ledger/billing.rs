use super::Ledger;
use crate::core::credit::{CreditSchedule, PayStatus};
use crate::core::error::Result;
use crate::core::investment::Investment;
use crate::core::money::Amount;
use crate::core::transaction::{
    Callback, SettlementLink, Transaction, TransactionKind, TransactionStatus,
};
use crate::store::WriteBatch;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

impl Ledger {
    /// Cancels pending transactions whose pay date has passed.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let overdue: Vec<Transaction> = self
            .pending_transactions()
            .await?
            .into_iter()
            .filter(|t| t.is_overdue(now))
            .collect();

        let mut expired = 0;
        for tx in overdue {
            match self.apply_status(tx.id, TransactionStatus::Cancelled).await {
                Ok(settlement) if settlement.changed => expired += 1,
                Ok(_) => {}
                Err(e) => warn!(transaction = %tx.id, "Failed to expire transaction: {e}"),
            }
        }
        if expired > 0 {
            info!(count = expired, "Expired overdue transactions");
        }
        Ok(expired)
    }

    /// Issues an installment payment for every credit due on `now`'s date.
    ///
    /// Billing moves the schedule forward, so a second pass on the same day
    /// issues nothing.
    pub async fn bill_credits(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let due: Vec<CreditSchedule> = self
            .credit_schedules()
            .await?
            .into_iter()
            .filter(|s| s.is_due(now))
            .collect();
        if due.is_empty() {
            return Ok(0);
        }

        let bank = self.bank_min_funds().await?;
        let mut batch = WriteBatch::new();
        let mut billed = 0;
        for mut schedule in due {
            let credit = match self.credit(schedule.credit).await {
                Ok(credit) if credit.status == PayStatus::Active => credit,
                Ok(_) => continue,
                Err(e) => {
                    warn!(schedule = %schedule.id, "Skipping schedule: {e}");
                    continue;
                }
            };

            let amount = Amount::new(credit.monthly_payment.min(credit.remaining_amount))?;
            let tx = Transaction::new(
                Some(credit.payment_account),
                bank.id,
                amount,
                TransactionKind::Credit,
                self.bank_pay_date(now),
                now,
            )?
            .with_callback(Callback::link(SettlementLink::CreditInstallment {
                credit: credit.id,
                schedule: schedule.id,
            }));
            schedule.modified = now;

            batch.put(&tx)?;
            batch.put(&schedule)?;
            billed += 1;
            debug!(credit = %credit.id, transaction = %tx.id, %amount, "Issued installment");
        }
        self.repo.commit(batch).await?;

        if billed > 0 {
            info!(count = billed, "Billed credit installments");
        }
        Ok(billed)
    }

    /// Issues a payout for every matured investment without one pending.
    ///
    /// With `bank.settle_payouts` set, the bank confirms each payout right
    /// away; otherwise it stays pending until the bank client pays it.
    pub async fn repay_investments(&self, now: DateTime<Utc>) -> Result<usize> {
        let (count, settled) = {
            let _guard = self.write_lock.lock().await;
            let matured: Vec<Investment> = self
                .investments()
                .await?
                .into_iter()
                .filter(|i| i.status == PayStatus::Active && i.is_mature(now))
                .collect();
            if matured.is_empty() {
                return Ok(0);
            }

            let pending: HashSet<Uuid> = self
                .pending_transactions()
                .await?
                .iter()
                .filter_map(|t| match t.settlement_link() {
                    Some(SettlementLink::InvestmentPayout { investment }) => Some(investment),
                    _ => None,
                })
                .collect();

            let bank = self.bank_max_funds().await?;
            let mut batch = WriteBatch::new();
            let mut issued = Vec::new();
            for investment in matured.iter().filter(|i| !pending.contains(&i.id)) {
                let tx = Transaction::new(
                    Some(bank.id),
                    investment.recipient_account,
                    Amount::new(investment.remaining_amount)?,
                    TransactionKind::Investment,
                    self.bank_pay_date(now),
                    now,
                )?
                .with_callback(Callback::link(SettlementLink::InvestmentPayout {
                    investment: investment.id,
                }));
                batch.put(&tx)?;
                debug!(investment = %investment.id, transaction = %tx.id, "Issued payout");
                issued.push(tx);
            }
            self.repo.commit(batch).await?;
            if !issued.is_empty() {
                info!(count = issued.len(), "Issued investment payouts");
            }
            if !self.settings.bank.settle_payouts {
                return Ok(issued.len());
            }

            let count = issued.len();
            let mut settled = Vec::with_capacity(count);
            for tx in issued {
                let id = tx.id;
                match self.settle(tx, TransactionStatus::Confirmed, now).await {
                    Ok(settlement) => settled.push(settlement),
                    Err(e) => warn!(transaction = %id, "Payout left pending: {e}"),
                }
            }
            (count, settled)
        };

        for settlement in settled.iter().filter(|s| s.changed) {
            self.run_hooks(&settlement.transaction).await;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{LedgerSettings, PaymentRequest, ProductRequest};
    use crate::core::error::LedgerError;
    use super::*;
    use crate::core::credit::Credit;
    use crate::core::tariff::TariffKind;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    async fn credit(ledger: &Ledger) -> Credit {
        let (client, account) = funded_client(ledger, dec!(0)).await;
        let tariff = tariff_of(ledger, TariffKind::Personal).await;
        ledger
            .request_credit(ProductRequest {
                client: client.id,
                recipient_account: account.id,
                payment_account: account.id,
                tariff: tariff.id,
                amount: dec!(12000),
                term: 12,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_expire_cancels_only_overdue() {
        let ledger = bootstrapped().await;
        let (_, account) = funded_client(&ledger, dec!(0)).await;
        let now = Utc::now();
        let mut ids = Vec::new();
        for pay_date in [now - Duration::hours(1), now + Duration::hours(1)] {
            let tx = ledger
                .create_payment(PaymentRequest {
                    sender: None,
                    recipient: account.id,
                    amount: Amount::new(dec!(5)).unwrap(),
                    kind: TransactionKind::Purchase,
                    pay_date,
                    provider_ref: None,
                    callback: None,
                })
                .await
                .unwrap();
            ids.push(tx.id);
        }

        assert_eq!(ledger.expire_overdue(now).await.unwrap(), 1);
        assert_eq!(
            ledger.transaction(ids[0]).await.unwrap().status,
            TransactionStatus::Cancelled
        );
        assert_eq!(
            ledger.transaction(ids[1]).await.unwrap().status,
            TransactionStatus::Pending
        );
        assert_eq!(ledger.expire_overdue(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bill_credits_once_per_day() {
        let ledger = bootstrapped().await;
        let credit = credit(&ledger).await;
        let schedule = ledger.credit_schedules().await.unwrap().remove(0);
        let due = schedule
            .next_payment_date()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc();

        assert_eq!(ledger.bill_credits(due - Duration::days(1)).await.unwrap(), 0);
        assert_eq!(ledger.bill_credits(due).await.unwrap(), 1);
        assert_eq!(ledger.bill_credits(due).await.unwrap(), 0);

        let pending = ledger.pending_transactions().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].sender, Some(credit.payment_account));
        assert_eq!(pending[0].amount.value(), dec!(1066.19));
        assert_eq!(
            pending[0].settlement_link(),
            Some(SettlementLink::CreditInstallment {
                credit: credit.id,
                schedule: schedule.id
            })
        );
    }

    #[tokio::test]
    async fn test_paid_installment_reduces_credit() {
        let ledger = bootstrapped().await;
        let credit = credit(&ledger).await;
        let due = ledger.credit_schedules().await.unwrap()[0]
            .next_payment_date()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc();
        ledger.bill_credits(due).await.unwrap();
        let installment = ledger.pending_transactions().await.unwrap().remove(0);

        ledger
            .pay(credit.client, installment.id, credit.payment_account)
            .await
            .unwrap();

        let credit = ledger.credit(credit.id).await.unwrap();
        assert_eq!(credit.remaining_amount, dec!(12794.28) - dec!(1066.19));
        assert_eq!(credit.status, PayStatus::Active);
        assert!(ledger.credit_schedules().await.unwrap()[0].last_payment.is_some());
    }

    #[tokio::test]
    async fn test_last_installment_closes_credit() {
        let ledger = bootstrapped().await;
        let mut credit = credit(&ledger).await;
        credit.remaining_amount = credit.monthly_payment;
        let mut batch = WriteBatch::new();
        batch.put(&credit).unwrap();
        ledger.repo.commit(batch).await.unwrap();

        let due = ledger.credit_schedules().await.unwrap()[0]
            .next_payment_date()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc();
        ledger.bill_credits(due).await.unwrap();
        let installment = ledger.pending_transactions().await.unwrap().remove(0);
        ledger
            .apply_status(installment.id, TransactionStatus::Confirmed)
            .await
            .unwrap();

        let credit = ledger.credit(credit.id).await.unwrap();
        assert_eq!(credit.status, PayStatus::Paid);
        assert_eq!(credit.remaining_amount, dec!(0));
        assert!(ledger.credit_schedules().await.unwrap().is_empty());
    }

    async fn stock_investment(ledger: &Ledger) -> (Investment, Uuid) {
        let (client, account) = funded_client(ledger, dec!(5000)).await;
        let tariff = tariff_of(ledger, TariffKind::Stock).await;
        let investment = ledger
            .open_investment(ProductRequest {
                client: client.id,
                recipient_account: account.id,
                payment_account: account.id,
                tariff: tariff.id,
                amount: dec!(1000),
                term: 1,
            })
            .await
            .unwrap();
        (investment, account.id)
    }

    #[tokio::test]
    async fn test_repay_investments_settles_payout() {
        let ledger = bootstrapped().await;
        let (investment, account) = stock_investment(&ledger).await;

        let matured = investment.modified + Duration::days(365);
        assert_eq!(ledger.repay_investments(Utc::now()).await.unwrap(), 0);
        assert_eq!(ledger.repay_investments(matured).await.unwrap(), 1);
        assert_eq!(ledger.repay_investments(matured).await.unwrap(), 0);

        assert!(ledger.pending_transactions().await.unwrap().is_empty());
        let paid = ledger.investment(investment.id).await.unwrap();
        assert_eq!(paid.status, PayStatus::Paid);
        assert_eq!(
            ledger.account(account).await.unwrap().funds,
            dec!(4000) + investment.remaining_amount
        );
    }

    #[tokio::test]
    async fn test_unsettled_payout_is_paid_by_bank() {
        let mut settings = LedgerSettings::default();
        settings.bank.settle_payouts = false;
        let ledger = bootstrapped_with(settings).await;
        let (investment, account) = stock_investment(&ledger).await;

        let matured = investment.modified + Duration::days(365);
        assert_eq!(ledger.repay_investments(matured).await.unwrap(), 1);
        assert_eq!(ledger.repay_investments(matured).await.unwrap(), 0);

        let payout = ledger.pending_transactions().await.unwrap().remove(0);
        assert_eq!(payout.recipient, account);
        assert_eq!(payout.amount.value(), investment.remaining_amount);
        assert!(payout.provider_ref.is_none());

        // Only the bank may pay its own payout.
        let investor = ledger.account(account).await.unwrap().client;
        let err = ledger.pay(investor, payout.id, account).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let bank = ledger.bank_max_funds().await.unwrap();
        let settlement = ledger.pay(bank.client, payout.id, bank.id).await.unwrap();
        assert_eq!(settlement.transaction.status, TransactionStatus::Confirmed);

        let investment = ledger.investment(investment.id).await.unwrap();
        assert_eq!(investment.status, PayStatus::Paid);
        assert_eq!(
            ledger.account(account).await.unwrap().funds,
            dec!(4000) + investment.remaining_amount
        );
        assert_eq!(ledger.repay_investments(matured).await.unwrap(), 0);
    }
}
