use crate::core::error::LedgerError;
use crate::core::money::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Loan,
    Investment,
}

/// A balance held by a client under one account tariff.
///
/// Funds only change through ledger entries, so every mutation here is
/// paired with a [`crate::core::transaction::LedgerEntry`] by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub client: Uuid,
    pub tariff: Uuid,
    pub kind: AccountKind,
    pub funds: Decimal,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Account {
    pub fn new(client: Uuid, tariff: Uuid, kind: AccountKind, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            tariff,
            kind,
            funds: Decimal::ZERO,
            created: now,
            modified: now,
        }
    }

    pub fn has_funds(&self, amount: Amount) -> bool {
        self.funds >= amount.value()
    }

    pub fn deposit(&mut self, amount: Amount, now: DateTime<Utc>) {
        self.funds += amount.value();
        self.modified = now;
    }

    pub fn withdraw(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if !self.has_funds(amount) {
            return Err(LedgerError::InsufficientFunds);
        }
        self.funds -= amount.value();
        self.modified = now;
        Ok(())
    }
}
