//! Monetary values.

use crate::core::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Every stored amount is rounded to cents.
pub const DECIMAL_PLACES: u32 = 2;

/// Smallest amount a transaction may move.
pub const MIN_TRANSACT_VALUE: Decimal = Decimal::ONE;

/// Rounds to [`DECIMAL_PLACES`] using banker's rounding.
pub fn round(value: Decimal) -> Decimal {
    value.round_dp(DECIMAL_PLACES)
}

/// A positive amount of money, at least [`MIN_TRANSACT_VALUE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        let value = round(value);
        if value >= MIN_TRANSACT_VALUE {
            Ok(Self(value))
        } else {
            Err(LedgerError::Validation(format!(
                "Amount must be at least {MIN_TRANSACT_VALUE}, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
