use super::Ledger;
use crate::core::account::Account;
use crate::core::credit::{Credit, CreditSchedule, MAX_NUMBER_OF_CREDITS, PayStatus};
use crate::core::error::{LedgerError, Result};
use crate::core::investment::Investment;
use crate::core::money::Amount;
use crate::core::transaction::TransactionKind;
use crate::store::WriteBatch;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// A client's request for a credit or an investment.
#[derive(Debug, Clone)]
pub struct ProductRequest {
    pub client: Uuid,
    /// Receives the disbursement or the payout.
    pub recipient_account: Uuid,
    /// Pays installments or the invested amount.
    pub payment_account: Uuid,
    pub tariff: Uuid,
    pub amount: Decimal,
    /// Months for credits, years for investments.
    pub term: u32,
}

impl Ledger {
    pub async fn credits(&self) -> Result<Vec<Credit>> {
        Ok(self.repo.all().await?)
    }

    pub async fn credit_schedules(&self) -> Result<Vec<CreditSchedule>> {
        Ok(self.repo.all().await?)
    }

    pub async fn investments(&self) -> Result<Vec<Investment>> {
        Ok(self.repo.all().await?)
    }

    pub async fn credit(&self, id: Uuid) -> Result<Credit> {
        self.repo
            .get(id)
            .await?
            .ok_or(LedgerError::CreditNotFound(id))
    }

    pub async fn investment(&self, id: Uuid) -> Result<Investment> {
        self.repo
            .get(id)
            .await?
            .ok_or(LedgerError::InvestmentNotFound(id))
    }

    /// Grants a credit and disburses it from the bank's richest account.
    pub async fn request_credit(&self, request: ProductRequest) -> Result<Credit> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let (recipient, _) = self.product_accounts(&request).await?;

        let active = self
            .credits()
            .await?
            .iter()
            .filter(|c| c.client == request.client && c.status == PayStatus::Active)
            .count();
        if active >= MAX_NUMBER_OF_CREDITS {
            return Err(LedgerError::CreditLimitReached);
        }

        let tariff = self.tariff(request.tariff).await?;
        let credit = Credit::new(
            request.client,
            request.recipient_account,
            request.payment_account,
            request.amount,
            &tariff,
            request.term,
            now,
        )?;

        let bank = self.bank_max_funds().await?;
        if bank.funds < credit.amount {
            return Err(LedgerError::BankInsolvent);
        }

        let mut batch = WriteBatch::new();
        self.book(
            &mut batch,
            Some(bank.id),
            recipient.id,
            Amount::new(credit.amount)?,
            TransactionKind::Credit,
            None,
            now,
        )
        .await?;
        let schedule = CreditSchedule::new(credit.id, now);
        batch.put(&credit)?;
        batch.put(&schedule)?;
        self.repo.commit(batch).await?;

        info!(
            credit = %credit.id,
            client = %credit.client,
            amount = %credit.amount,
            monthly = %credit.monthly_payment,
            "Granted credit"
        );
        Ok(credit)
    }

    /// Opens an investment and moves its amount into the bank's poorest account.
    pub async fn open_investment(&self, request: ProductRequest) -> Result<Investment> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let (_, payment) = self.product_accounts(&request).await?;

        if self.investments().await?.iter().any(|i| {
            i.client == request.client
                && i.tariff == request.tariff
                && i.status == PayStatus::Active
        }) {
            return Err(LedgerError::InvestmentTariffExists);
        }

        let tariff = self.tariff(request.tariff).await?;
        let investment = Investment::new(
            request.client,
            request.recipient_account,
            request.payment_account,
            request.amount,
            &tariff,
            request.term,
            now,
        )?;
        let amount = Amount::new(investment.amount)?;
        if !payment.has_funds(amount) {
            return Err(LedgerError::InsufficientFunds);
        }

        let bank = self.bank_min_funds().await?;
        let mut batch = WriteBatch::new();
        self.book(
            &mut batch,
            Some(payment.id),
            bank.id,
            amount,
            TransactionKind::Investment,
            None,
            now,
        )
        .await?;
        batch.put(&investment)?;
        self.repo.commit(batch).await?;

        info!(
            investment = %investment.id,
            client = %investment.client,
            amount = %investment.amount,
            "Opened investment"
        );
        Ok(investment)
    }

    /// Loads and checks the accounts named by a product request.
    async fn product_accounts(&self, request: &ProductRequest) -> Result<(Account, Account)> {
        let client = self.client(request.client).await?;
        if client.is_bank() {
            return Err(LedgerError::BankParticipant);
        }
        let recipient = self.account(request.recipient_account).await?;
        let payment = self.account(request.payment_account).await?;
        if recipient.client != client.id || payment.client != client.id {
            return Err(LedgerError::NotAccountOwner);
        }
        Ok((recipient, payment))
    }
}
