//! Payment provider abstractions

use crate::core::transaction::{Transaction, TransactionStatus};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Status of a payment as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderStatus {
    Success,
    Failed,
    Expired,
    /// Anything else (`processing`, `new`, ...). Never changes local state.
    Other(String),
}

impl ProviderStatus {
    /// The local status this provider status settles to, if any.
    pub fn settlement(&self) -> Option<TransactionStatus> {
        match self {
            ProviderStatus::Success => Some(TransactionStatus::Confirmed),
            ProviderStatus::Failed | ProviderStatus::Expired => Some(TransactionStatus::Cancelled),
            ProviderStatus::Other(_) => None,
        }
    }
}

impl From<&str> for ProviderStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => ProviderStatus::Success,
            "failed" => ProviderStatus::Failed,
            "expired" => ProviderStatus::Expired,
            _ => ProviderStatus::Other(value.to_string()),
        }
    }
}

impl From<String> for ProviderStatus {
    fn from(value: String) -> Self {
        ProviderStatus::from(value.as_str())
    }
}

impl From<ProviderStatus> for String {
    fn from(status: ProviderStatus) -> Self {
        status.to_string()
    }
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderStatus::Success => write!(f, "success"),
            ProviderStatus::Failed => write!(f, "failed"),
            ProviderStatus::Expired => write!(f, "expired"),
            ProviderStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Asks the provider for the current status of the payment `reference`.
    async fn fetch_status(&self, reference: &str) -> Result<ProviderStatus>;
}

/// Runs after a transaction reached a terminal status and was committed.
///
/// Hooks handle side effects outside the ledger; their failures are logged
/// and never undo the settlement.
#[async_trait]
pub trait SettlementHook: Send + Sync {
    async fn on_settled(&self, transaction: &Transaction) -> Result<()>;
}
