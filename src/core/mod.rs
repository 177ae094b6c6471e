//! Domain types and the abstractions the ledger is built on

pub mod account;
pub mod client;
pub mod config;
pub mod credit;
pub mod error;
pub mod investment;
pub mod log;
pub mod money;
pub mod provider;
pub mod tariff;
pub mod transaction;

// Re-export main types for cleaner imports
pub use error::{LedgerError, Result};
pub use money::Amount;
pub use provider::{PaymentProvider, ProviderStatus, SettlementHook};
pub use transaction::{Transaction, TransactionStatus};
