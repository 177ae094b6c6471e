//! Interest tariffs for accounts, credits and investments.

use crate::core::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

pub const MIN_TARIFF_RATE: Decimal = Decimal::ZERO;
pub const MAX_TARIFF_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// The product family a tariff applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Account,
    Credit,
    Investment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TariffKind {
    // accounts
    Deposit,
    Saving,
    Current,
    // credits
    Auto,
    Student,
    Home,
    Personal,
    Business,
    // investments
    Cryptocurrency,
    Stock,
}

impl TariffKind {
    pub const ACCOUNT: [TariffKind; 3] = [TariffKind::Deposit, TariffKind::Saving, TariffKind::Current];
    pub const CREDIT: [TariffKind; 5] = [
        TariffKind::Auto,
        TariffKind::Student,
        TariffKind::Home,
        TariffKind::Personal,
        TariffKind::Business,
    ];
    pub const INVESTMENT: [TariffKind; 2] = [TariffKind::Cryptocurrency, TariffKind::Stock];

    pub fn product(&self) -> Product {
        match self {
            TariffKind::Deposit | TariffKind::Saving | TariffKind::Current => Product::Account,
            TariffKind::Auto
            | TariffKind::Student
            | TariffKind::Home
            | TariffKind::Personal
            | TariffKind::Business => Product::Credit,
            TariffKind::Cryptocurrency | TariffKind::Stock => Product::Investment,
        }
    }
}

impl Display for TariffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub id: Uuid,
    pub kind: TariffKind,
    /// Yearly interest rate in percent.
    pub rate: Decimal,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Tariff {
    pub fn new(kind: TariffKind, rate: Decimal, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        if rate < MIN_TARIFF_RATE || rate > MAX_TARIFF_RATE {
            return Err(LedgerError::Validation(format!(
                "Tariff rate must be between {MIN_TARIFF_RATE} and {MAX_TARIFF_RATE}, got {rate}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            rate,
            created: now,
            modified: now,
        })
    }

    pub fn product(&self) -> Product {
        self.kind.product()
    }

    /// Fails unless the tariff belongs to `product`.
    pub fn expect_product(&self, product: Product) -> Result<(), LedgerError> {
        if self.product() == product {
            Ok(())
        } else {
            Err(LedgerError::Validation(format!(
                "Tariff {} cannot be used for {:?}",
                self.kind, product
            )))
        }
    }
}

impl Display for Tariff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | {}%", self.kind, self.rate)
    }
}
