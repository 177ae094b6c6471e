//! The ledger service: the only writer of accounts and transactions.
//!
//! Every mutating operation takes the ledger's write lock, reads the rows it
//! needs, and commits all resulting changes as one [`WriteBatch`]. Effects
//! outside the ledger run through [`SettlementHook`]s after the commit.

mod billing;
mod bootstrap;
mod products;
mod settlement;

pub use bootstrap::BootstrapReport;
pub use products::ProductRequest;
pub use settlement::Settlement;

use crate::core::account::{Account, AccountKind};
use crate::core::client::{Client, ClientKind};
use crate::core::config::{AppConfig, BankConfig, TariffRates};
use crate::core::error::{LedgerError, Result};
use crate::core::money::Amount;
use crate::core::provider::SettlementHook;
use crate::core::tariff::{Product, Tariff};
use crate::core::transaction::{
    Callback, LedgerEntry, Transaction, TransactionKind, TransactionStatus,
};
use crate::store::{Repository, Store, WriteBatch};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Settings the ledger needs from [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct LedgerSettings {
    pub bank: BankConfig,
    pub tariffs: TariffRates,
}

impl From<&AppConfig> for LedgerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            bank: config.bank.clone(),
            tariffs: config.tariffs.clone(),
        }
    }
}

/// A new payment to be settled later by the provider or the payer.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub sender: Option<Uuid>,
    pub recipient: Uuid,
    pub amount: Amount,
    pub kind: TransactionKind,
    pub pay_date: DateTime<Utc>,
    pub provider_ref: Option<String>,
    pub callback: Option<Callback>,
}

pub struct Ledger {
    repo: Repository,
    settings: LedgerSettings,
    hooks: Vec<Arc<dyn SettlementHook>>,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>, settings: LedgerSettings) -> Self {
        Self {
            repo: Repository::new(store),
            settings,
            hooks: Vec::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn SettlementHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    // Queries

    pub async fn client(&self, id: Uuid) -> Result<Client> {
        self.repo
            .get(id)
            .await?
            .ok_or(LedgerError::ClientNotFound(id))
    }

    pub async fn account(&self, id: Uuid) -> Result<Account> {
        self.repo
            .get(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub async fn tariff(&self, id: Uuid) -> Result<Tariff> {
        self.repo
            .get(id)
            .await?
            .ok_or(LedgerError::TariffNotFound(id))
    }

    pub async fn transaction(&self, id: Uuid) -> Result<Transaction> {
        self.repo
            .get(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    pub async fn clients(&self) -> Result<Vec<Client>> {
        Ok(self.repo.all().await?)
    }

    pub async fn tariffs(&self, product: Product) -> Result<Vec<Tariff>> {
        let mut tariffs: Vec<Tariff> = self.repo.all().await?;
        tariffs.retain(|t| t.product() == product);
        Ok(tariffs)
    }

    pub async fn accounts_of(&self, client: Uuid) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.repo.all().await?;
        accounts.retain(|a| a.client == client);
        accounts.sort_by_key(|a| a.created);
        Ok(accounts)
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self.repo.all().await?;
        transactions.sort_by_key(|t| t.created);
        Ok(transactions)
    }

    /// Pending transactions, oldest first.
    pub async fn pending_transactions(&self) -> Result<Vec<Transaction>> {
        let mut pending = self.transactions().await?;
        pending.retain(|t| t.status == TransactionStatus::Pending);
        Ok(pending)
    }

    pub async fn find_by_provider_ref(&self, reference: &str) -> Result<Option<Transaction>> {
        Ok(self
            .transactions()
            .await?
            .into_iter()
            .find(|t| t.provider_ref.as_deref() == Some(reference)))
    }

    /// Ledger entries touching `account`, oldest first.
    pub async fn ledger_entries(&self, account: Uuid) -> Result<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self.repo.all().await?;
        entries.retain(|e| e.recipient == account || e.sender == Some(account));
        entries.sort_by_key(|e| e.created);
        Ok(entries)
    }

    // Clients and accounts

    pub async fn register_client(
        &self,
        name: &str,
        email: Option<&str>,
        phone: &str,
    ) -> Result<Client> {
        let client = Client::new(name, email, phone, ClientKind::Private, Utc::now())?;
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::new();
        batch.put(&client)?;
        self.repo.commit(batch).await?;
        info!(client = %client.id, "Registered client");
        Ok(client)
    }

    /// Opens an account; a client holds at most one account per tariff.
    pub async fn open_account(
        &self,
        client: Uuid,
        tariff: Uuid,
        kind: AccountKind,
    ) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        self.client(client).await?;
        self.tariff(tariff).await?.expect_product(Product::Account)?;
        if self
            .accounts_of(client)
            .await?
            .iter()
            .any(|a| a.tariff == tariff)
        {
            return Err(LedgerError::AccountTariffExists);
        }

        let account = Account::new(client, tariff, kind, Utc::now());
        let mut batch = WriteBatch::new();
        batch.put(&account)?;
        self.repo.commit(batch).await?;
        info!(client = %client, account = %account.id, "Opened account");
        Ok(account)
    }

    /// Moves funds between accounts; `client` must own the sender.
    pub async fn transfer(
        &self,
        client: Uuid,
        from: Uuid,
        to: Uuid,
        amount: Amount,
    ) -> Result<LedgerEntry> {
        if from == to {
            return Err(LedgerError::SameAccount);
        }
        let _guard = self.write_lock.lock().await;
        let sender = self.account(from).await?;
        if sender.client != client {
            return Err(LedgerError::NotAccountOwner);
        }

        let mut batch = WriteBatch::new();
        let entry = self
            .book(
                &mut batch,
                Some(from),
                to,
                amount,
                TransactionKind::Transfer,
                None,
                Utc::now(),
            )
            .await?;
        self.repo.commit(batch).await?;
        info!(from = %from, to = %to, %amount, "Transferred funds");
        Ok(entry)
    }

    // Payments

    pub async fn create_payment(&self, request: PaymentRequest) -> Result<Transaction> {
        let now = Utc::now();
        let mut tx = Transaction::new(
            request.sender,
            request.recipient,
            request.amount,
            request.kind,
            request.pay_date,
            now,
        )?;
        tx.provider_ref = request.provider_ref;
        tx.callback = request.callback;

        let _guard = self.write_lock.lock().await;
        self.account(tx.recipient).await?;
        if let Some(sender) = tx.sender {
            self.account(sender).await?;
        }
        if let Some(reference) = tx.provider_ref.as_deref() {
            if self.find_by_provider_ref(reference).await?.is_some() {
                return Err(LedgerError::Validation(format!(
                    "Provider reference {reference} is already in use"
                )));
            }
        }

        let mut batch = WriteBatch::new();
        batch.put(&tx)?;
        self.repo.commit(batch).await?;
        info!(transaction = %tx.id, amount = %tx.amount, "Created pending payment");
        Ok(tx)
    }

    /// Default deadline for payments the bank issues itself.
    pub(crate) fn bank_pay_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.settings.bank.pay_date_days)
    }

    /// Moves `amount` between two accounts inside `batch` and records the entry.
    ///
    /// A `None` sender means the money enters the bank from outside.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn book(
        &self,
        batch: &mut WriteBatch,
        sender: Option<Uuid>,
        recipient: Uuid,
        amount: Amount,
        kind: TransactionKind,
        transaction: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        if sender == Some(recipient) {
            return Err(LedgerError::SameAccount);
        }
        let mut to = self.account(recipient).await?;
        if let Some(sender) = sender {
            let mut from = self.account(sender).await?;
            from.withdraw(amount, now)?;
            batch.put(&from)?;
        }
        to.deposit(amount, now);
        batch.put(&to)?;

        let entry = LedgerEntry::new(sender, recipient, amount, kind, transaction, now);
        batch.put(&entry)?;
        Ok(entry)
    }

    /// Accounts owned by the bank client.
    pub(crate) async fn bank_accounts(&self) -> Result<Vec<Account>> {
        let clients: Vec<Client> = self.repo.all().await?;
        let bank = clients
            .into_iter()
            .find(Client::is_bank)
            .ok_or(LedgerError::BankMissing)?;
        let accounts = self.accounts_of(bank.id).await?;
        if accounts.is_empty() {
            return Err(LedgerError::BankMissing);
        }
        Ok(accounts)
    }

    /// The bank account with the most funds; disbursements come from here.
    pub(crate) async fn bank_max_funds(&self) -> Result<Account> {
        self.bank_accounts()
            .await?
            .into_iter()
            .max_by(|a, b| a.funds.cmp(&b.funds))
            .ok_or(LedgerError::BankMissing)
    }

    /// The bank account with the least funds; incoming money goes here.
    pub(crate) async fn bank_min_funds(&self) -> Result<Account> {
        self.bank_accounts()
            .await?
            .into_iter()
            .min_by(|a, b| a.funds.cmp(&b.funds))
            .ok_or(LedgerError::BankMissing)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::core::tariff::TariffKind;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_open_account_once_per_tariff() {
        let ledger = bootstrapped().await;
        let (client, account) = funded_client(&ledger, dec!(0)).await;

        let result = ledger
            .open_account(client.id, account.tariff, AccountKind::Checking)
            .await;
        assert!(matches!(result, Err(LedgerError::AccountTariffExists)));

        let credit_tariff = tariff_of(&ledger, TariffKind::Auto).await;
        let result = ledger
            .open_account(client.id, credit_tariff.id, AccountKind::Loan)
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let ledger = bootstrapped().await;
        let (client, from) = funded_client(&ledger, dec!(100)).await;
        let to = second_account(&ledger, client.id).await;

        let entry = ledger
            .transfer(client.id, from.id, to.id, Amount::new(dec!(40)).unwrap())
            .await
            .unwrap();
        assert_eq!(entry.kind, TransactionKind::Transfer);

        assert_eq!(ledger.account(from.id).await.unwrap().funds, dec!(60));
        assert_eq!(ledger.account(to.id).await.unwrap().funds, dec!(40));
        assert_eq!(ledger.ledger_entries(to.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_validation() {
        let ledger = bootstrapped().await;
        let (client, from) = funded_client(&ledger, dec!(10)).await;
        let to = second_account(&ledger, client.id).await;
        let ten = Amount::new(dec!(10)).unwrap();

        let result = ledger.transfer(client.id, from.id, from.id, ten).await;
        assert!(matches!(result, Err(LedgerError::SameAccount)));

        let result = ledger.transfer(Uuid::new_v4(), from.id, to.id, ten).await;
        assert!(matches!(result, Err(LedgerError::NotAccountOwner)));

        let result = ledger
            .transfer(client.id, from.id, to.id, Amount::new(dec!(11)).unwrap())
            .await;
        assert!(matches!(result, Err(LedgerError::InsufficientFunds)));
        assert_eq!(ledger.account(from.id).await.unwrap().funds, dec!(10));
        assert_eq!(ledger.account(to.id).await.unwrap().funds, dec!(0));
    }

    #[tokio::test]
    async fn test_create_payment_rejects_duplicate_reference() {
        let ledger = bootstrapped().await;
        let (_, account) = funded_client(&ledger, dec!(0)).await;
        let request = PaymentRequest {
            sender: None,
            recipient: account.id,
            amount: Amount::new(dec!(25)).unwrap(),
            kind: TransactionKind::Purchase,
            pay_date: Utc::now() + Duration::days(1),
            provider_ref: Some("pay_1".to_string()),
            callback: None,
        };

        let tx = ledger.create_payment(request.clone()).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(
            ledger.find_by_provider_ref("pay_1").await.unwrap().unwrap().id,
            tx.id
        );

        let result = ledger.create_payment(request).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(ledger.pending_transactions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_payment_requires_known_accounts() {
        let ledger = bootstrapped().await;
        let result = ledger
            .create_payment(PaymentRequest {
                sender: None,
                recipient: Uuid::new_v4(),
                amount: Amount::new(dec!(25)).unwrap(),
                kind: TransactionKind::Purchase,
                pay_date: Utc::now(),
                provider_ref: None,
                callback: None,
            })
            .await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }
}
