//! Transactions, their lifecycle and the ledger entries they produce.

use crate::core::error::LedgerError;
use crate::core::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Confirmed => write!(f, "confirmed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Transfer,
    Purchase,
    Credit,
    Investment,
}

/// An HTTP endpoint told about the outcome of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Ledger records that must be updated when a transaction confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementLink {
    CreditInstallment { credit: Uuid, schedule: Uuid },
    InvestmentPayout { investment: Uuid },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<Webhook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<SettlementLink>,
}

impl Callback {
    pub fn webhook(url: &str) -> Self {
        Self {
            webhook: Some(Webhook {
                url: url.to_string(),
                headers: BTreeMap::new(),
            }),
            link: None,
        }
    }

    pub fn link(link: SettlementLink) -> Self {
        Self {
            webhook: None,
            link: Some(link),
        }
    }
}

/// A payment awaiting settlement.
///
/// A transaction starts `Pending` and moves exactly once to `Confirmed` or
/// `Cancelled`. `sender` is `None` while the payer is unknown, or when the
/// funds arrive from outside the bank through the payment provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub sender: Option<Uuid>,
    pub recipient: Uuid,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub kind: TransactionKind,
    /// Deadline after which a pending transaction expires.
    pub pay_date: DateTime<Utc>,
    /// Reference assigned by the external payment provider.
    pub provider_ref: Option<String>,
    pub callback: Option<Callback>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        sender: Option<Uuid>,
        recipient: Uuid,
        amount: Amount,
        kind: TransactionKind,
        pay_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if sender == Some(recipient) {
            return Err(LedgerError::SameAccount);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            sender,
            recipient,
            amount,
            status: TransactionStatus::Pending,
            kind,
            pay_date,
            provider_ref: None,
            callback: None,
            created: now,
            modified: now,
        })
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Moves the transaction to `to`.
    ///
    /// Returns `Ok(false)` when nothing changes. Terminal states never change.
    pub fn transition(
        &mut self,
        to: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        if self.status == to {
            return Ok(false);
        }
        if self.status.is_terminal() || to == TransactionStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.modified = now;
        Ok(true)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Pending && self.pay_date <= now
    }

    pub fn settlement_link(&self) -> Option<SettlementLink> {
        self.callback.as_ref().and_then(|c| c.link)
    }
}

/// Append-only record of one balance move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub sender: Option<Uuid>,
    pub recipient: Uuid,
    pub amount: Amount,
    pub kind: TransactionKind,
    /// The transaction this entry settles, if any.
    pub transaction: Option<Uuid>,
    pub created: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        sender: Option<Uuid>,
        recipient: Uuid,
        amount: Amount,
        kind: TransactionKind,
        transaction: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            recipient,
            amount,
            kind,
            transaction,
            created: now,
        }
    }
}
