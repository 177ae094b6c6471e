use crate::core::transaction::TransactionStatus;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by ledger operations.
///
/// Validation failures carry the message shown to the client; storage
/// failures are wrapped transparently so callers can tell them apart.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No such client exists: {0}")]
    ClientNotFound(Uuid),
    #[error("No such account exists: {0}")]
    AccountNotFound(Uuid),
    #[error("No such tariff: {0}")]
    TariffNotFound(Uuid),
    #[error("No such payment: {0}")]
    TransactionNotFound(Uuid),
    #[error("No such credit: {0}")]
    CreditNotFound(Uuid),
    #[error("No such investment: {0}")]
    InvestmentNotFound(Uuid),
    #[error("Accounts cannot be the same")]
    SameAccount,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("You must be the account owner")]
    NotAccountOwner,
    #[error("Cannot modify this payment ({from} -> {to})")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
    #[error("You already have an account with this tariff")]
    AccountTariffExists,
    #[error("You already have an investment with this tariff")]
    InvestmentTariffExists,
    #[error("You have reached the maximum number of credits")]
    CreditLimitReached,
    #[error("The bank is unable to pay this amount")]
    BankInsolvent,
    #[error("The bank cannot take out credits or investments with itself")]
    BankParticipant,
    #[error("The bank client has not been bootstrapped")]
    BankMissing,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// True for failures caused by the request rather than the system.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
