use super::Ledger;
use crate::core::account::{Account, AccountKind};
use crate::core::client::{Client, ClientKind};
use crate::core::error::{LedgerError, Result};
use crate::core::money::{Amount, MIN_TRANSACT_VALUE, round};
use crate::core::tariff::{Product, Tariff, TariffKind};
use crate::core::transaction::{LedgerEntry, TransactionKind};
use crate::store::WriteBatch;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapReport {
    pub tariffs_created: usize,
    pub bank_created: bool,
}

impl Ledger {
    /// Seeds the tariff catalogue and the bank client. Safe to run repeatedly.
    pub async fn bootstrap(&self) -> Result<BootstrapReport> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let mut batch = WriteBatch::new();
        let mut report = BootstrapReport::default();

        let mut tariffs: Vec<Tariff> = self.repo.all().await?;
        if tariffs.is_empty() {
            let rates = &self.settings.tariffs;
            let families = [
                (TariffKind::ACCOUNT.as_slice(), rates.account),
                (TariffKind::CREDIT.as_slice(), rates.credit),
                (TariffKind::INVESTMENT.as_slice(), rates.investment),
            ];
            for (kinds, rate) in families {
                for kind in kinds {
                    let tariff = Tariff::new(*kind, rate, now)?;
                    batch.put(&tariff)?;
                    tariffs.push(tariff);
                }
            }
            report.tariffs_created = tariffs.len();
        }

        let clients: Vec<Client> = self.repo.all().await?;
        if !clients.iter().any(Client::is_bank) {
            let admin = &self.settings.bank.admin;
            let bank = Client::new(
                &admin.display_name(),
                admin.email.as_deref(),
                &admin.phone,
                ClientKind::Bank,
                now,
            )?;
            let tariff = tariffs
                .iter()
                .find(|t| t.kind == TariffKind::Current)
                .or_else(|| tariffs.iter().find(|t| t.product() == Product::Account))
                .ok_or_else(|| {
                    LedgerError::Validation(
                        "No account tariff to open the bank account with".to_string(),
                    )
                })?;
            let mut account = Account::new(bank.id, tariff.id, AccountKind::Checking, now);

            let initial = round(self.settings.bank.initial_funds);
            if initial >= MIN_TRANSACT_VALUE {
                let amount = Amount::new(initial)?;
                account.deposit(amount, now);
                let entry =
                    LedgerEntry::new(None, account.id, amount, TransactionKind::Transfer, None, now);
                batch.put(&entry)?;
            } else if initial != Decimal::ZERO {
                warn!(funds = %initial, "Initial bank funds below the minimum amount, not deposited");
            }
            batch.put(&bank)?;
            batch.put(&account)?;
            report.bank_created = true;
            info!(client = %bank.id, funds = %account.funds, "Created bank client");
        }

        self.repo.commit(batch).await?;
        if report.tariffs_created > 0 {
            info!(count = report.tariffs_created, "Seeded tariffs");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::super::LedgerSettings;
    use super::*;
    use crate::store::memory::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()), LedgerSettings::default());

        let first = ledger.bootstrap().await.unwrap();
        assert_eq!(first.tariffs_created, 10);
        assert!(first.bank_created);

        let second = ledger.bootstrap().await.unwrap();
        assert_eq!(second, BootstrapReport::default());

        assert_eq!(ledger.tariffs(Product::Account).await.unwrap().len(), 3);
        assert_eq!(ledger.tariffs(Product::Credit).await.unwrap().len(), 5);
        assert_eq!(ledger.tariffs(Product::Investment).await.unwrap().len(), 2);

        let banks: Vec<Client> = ledger
            .clients()
            .await
            .unwrap()
            .into_iter()
            .filter(Client::is_bank)
            .collect();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].name, "Central Bank");
    }

    #[tokio::test]
    async fn test_bootstrap_uses_configured_funds_and_rates() {
        let mut settings = LedgerSettings::default();
        settings.bank.initial_funds = dec!(5000);
        settings.tariffs.credit = dec!(9.5);
        let ledger = Ledger::new(Arc::new(MemoryStore::new()), settings);
        ledger.bootstrap().await.unwrap();

        let bank = ledger.bank_max_funds().await.unwrap();
        assert_eq!(bank.funds, dec!(5000));
        assert_eq!(ledger.ledger_entries(bank.id).await.unwrap().len(), 1);
        assert!(
            ledger
                .tariffs(Product::Credit)
                .await
                .unwrap()
                .iter()
                .all(|t| t.rate == dec!(9.5))
        );
    }

    #[tokio::test]
    async fn test_bootstrap_skips_funds_below_minimum() {
        let mut settings = LedgerSettings::default();
        settings.bank.initial_funds = dec!(0.5);
        let ledger = Ledger::new(Arc::new(MemoryStore::new()), settings);

        let report = ledger.bootstrap().await.unwrap();
        assert!(report.bank_created);
        let bank = ledger.bank_max_funds().await.unwrap();
        assert_eq!(bank.funds, dec!(0));
        assert!(ledger.ledger_entries(bank.id).await.unwrap().is_empty());
    }
}
