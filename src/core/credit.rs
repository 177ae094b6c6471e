//! Credits (loans) and their monthly repayment schedule.

use crate::core::error::LedgerError;
use crate::core::money::round;
use crate::core::tariff::{Product, Tariff};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_CREDIT_VALUE: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
pub const MAX_CREDIT_VALUE: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
/// Months.
pub const MIN_CREDIT_TERM: u32 = 3;
pub const MAX_CREDIT_TERM: u32 = 120;
pub const MAX_NUMBER_OF_CREDITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayStatus {
    Active,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub id: Uuid,
    pub client: Uuid,
    /// Receives the disbursed amount.
    pub recipient_account: Uuid,
    /// Installments are drawn from here.
    pub payment_account: Uuid,
    pub amount: Decimal,
    pub tariff: Uuid,
    pub term: u32,
    pub monthly_payment: Decimal,
    pub remaining_amount: Decimal,
    pub status: PayStatus,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Credit {
    pub fn new(
        client: Uuid,
        recipient_account: Uuid,
        payment_account: Uuid,
        amount: Decimal,
        tariff: &Tariff,
        term: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        tariff.expect_product(Product::Credit)?;
        if amount < MIN_CREDIT_VALUE || amount > MAX_CREDIT_VALUE {
            return Err(LedgerError::Validation(format!(
                "Credit amount must be between {MIN_CREDIT_VALUE} and {MAX_CREDIT_VALUE}"
            )));
        }
        if !(MIN_CREDIT_TERM..=MAX_CREDIT_TERM).contains(&term) {
            return Err(LedgerError::Validation(format!(
                "Credit term must be between {MIN_CREDIT_TERM} and {MAX_CREDIT_TERM} months"
            )));
        }
        let (monthly_payment, remaining_amount) = annuity(amount, tariff.rate, term)?;
        Ok(Self {
            id: Uuid::new_v4(),
            client,
            recipient_account,
            payment_account,
            amount: round(amount),
            tariff: tariff.id,
            term,
            monthly_payment,
            remaining_amount,
            status: PayStatus::Active,
            created: now,
            modified: now,
        })
    }

    /// Books one confirmed installment. Returns true once the credit is paid off.
    pub fn apply_installment(&mut self, now: DateTime<Utc>) -> bool {
        self.remaining_amount -= self.monthly_payment;
        if self.remaining_amount <= Decimal::ZERO {
            self.remaining_amount = Decimal::ZERO;
            self.status = PayStatus::Paid;
        }
        self.modified = now;
        self.status == PayStatus::Paid
    }
}

/// Computes `(monthly_payment, remaining_amount)` of an annuity credit.
///
/// `yearly_rate` is in percent; both results are rounded to cents and the
/// remaining amount is always `monthly_payment * term`.
pub fn annuity(
    amount: Decimal,
    yearly_rate: Decimal,
    term: u32,
) -> Result<(Decimal, Decimal), LedgerError> {
    if term == 0 {
        return Err(LedgerError::Validation("Credit term cannot be zero".to_string()));
    }
    let months = Decimal::from(term);
    let rate = yearly_rate / Decimal::ONE_HUNDRED / Decimal::from(12);
    let monthly = if rate.is_zero() {
        amount / months
    } else {
        let growth = (Decimal::ONE + rate)
            .checked_powi(i64::from(term))
            .ok_or_else(|| LedgerError::Validation("Credit parameters overflow".to_string()))?;
        amount * rate * growth / (growth - Decimal::ONE)
    };
    let monthly = round(monthly);
    Ok((monthly, round(monthly * months)))
}

/// Tracks when the next installment of a credit falls due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditSchedule {
    pub id: Uuid,
    pub credit: Uuid,
    pub created: DateTime<Utc>,
    /// Last time an installment was billed.
    pub modified: DateTime<Utc>,
    /// Last time an installment was paid.
    pub last_payment: Option<DateTime<Utc>>,
}

impl CreditSchedule {
    pub fn new(credit: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            credit,
            created: now,
            modified: now,
            last_payment: None,
        }
    }

    /// Installments fall on the credit's day of month, in the month after
    /// the last billing, clamped to the end of shorter months.
    pub fn next_payment_date(&self) -> NaiveDate {
        let billed = self.modified.date_naive();
        let next_month = billed
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .unwrap_or(billed);
        let day = self.created.day().min(days_in_month(next_month));
        next_month.with_day(day).unwrap_or(next_month)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_payment_date() == now.date_naive()
    }
}

fn days_in_month(first_of_month: NaiveDate) -> u32 {
    first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(28, |last| last.day())
}
