use crate::core::credit::PayStatus;
use crate::core::error::LedgerError;
use crate::core::money::round;
use crate::core::tariff::{Product, Tariff};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_INVESTMENT_VALUE: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
pub const MAX_INVESTMENT_VALUE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Years.
pub const MIN_INVESTMENT_TERM: u32 = 1;
pub const MAX_INVESTMENT_TERM: u32 = 10;

const DAYS_PER_YEAR: i64 = 365;

/// Money a client lends to the bank for a number of years at compound interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub client: Uuid,
    pub amount: Decimal,
    pub tariff: Uuid,
    /// Receives the payout at maturity.
    pub recipient_account: Uuid,
    /// Funds the investment.
    pub payment_account: Uuid,
    pub term: u32,
    pub remaining_amount: Decimal,
    pub monthly_payment: Decimal,
    pub status: PayStatus,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Investment {
    pub fn new(
        client: Uuid,
        recipient_account: Uuid,
        payment_account: Uuid,
        amount: Decimal,
        tariff: &Tariff,
        term: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        tariff.expect_product(Product::Investment)?;
        if amount < MIN_INVESTMENT_VALUE || amount > MAX_INVESTMENT_VALUE {
            return Err(LedgerError::Validation(format!(
                "Investment amount must be between {MIN_INVESTMENT_VALUE} and {MAX_INVESTMENT_VALUE}"
            )));
        }
        if !(MIN_INVESTMENT_TERM..=MAX_INVESTMENT_TERM).contains(&term) {
            return Err(LedgerError::Validation(format!(
                "Investment term must be between {MIN_INVESTMENT_TERM} and {MAX_INVESTMENT_TERM} years"
            )));
        }
        let growth = (Decimal::ONE + tariff.rate / Decimal::ONE_HUNDRED)
            .checked_powi(i64::from(term))
            .ok_or_else(|| LedgerError::Validation("Investment parameters overflow".to_string()))?;
        let remaining_amount = round(amount * growth);
        Ok(Self {
            id: Uuid::new_v4(),
            client,
            amount: round(amount),
            tariff: tariff.id,
            recipient_account,
            payment_account,
            term,
            remaining_amount,
            monthly_payment: round(remaining_amount / Decimal::from(term)),
            status: PayStatus::Active,
            created: now,
            modified: now,
        })
    }

    /// An investment matures `term` years after it was last touched.
    pub fn is_mature(&self, now: DateTime<Utc>) -> bool {
        now - self.modified >= Duration::days(i64::from(self.term) * DAYS_PER_YEAR)
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) {
        self.status = PayStatus::Paid;
        self.modified = now;
    }
}
