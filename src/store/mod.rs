pub mod disk;
pub mod memory;

use crate::core::account::Account;
use crate::core::client::Client;
use crate::core::credit::{Credit, CreditSchedule};
use crate::core::investment::Investment;
use crate::core::tariff::Tariff;
use crate::core::transaction::{LedgerEntry, Transaction};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use uuid::Uuid;

/// Names of every collection a store must provide.
pub const COLLECTIONS: [&str; 8] = [
    Client::COLLECTION,
    Tariff::COLLECTION,
    Account::COLLECTION,
    Transaction::COLLECTION,
    LedgerEntry::COLLECTION,
    Credit::COLLECTION,
    CreditSchedule::COLLECTION,
    Investment::COLLECTION,
];

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Put {
        collection: &'static str,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        collection: &'static str,
        key: Vec<u8>,
    },
}

/// A set of writes applied all-or-nothing by [`Store::commit`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<R: Record>(&mut self, record: &R) -> Result<()> {
        let value = serde_json::to_vec(record)
            .with_context(|| format!("Failed to encode {} record", R::COLLECTION))?;
        self.mutations.push(Mutation::Put {
            collection: R::COLLECTION,
            key: record.id().as_bytes().to_vec(),
            value,
        });
        Ok(())
    }

    pub fn delete<R: Record>(&mut self, id: Uuid) {
        self.mutations.push(Mutation::Delete {
            collection: R::COLLECTION,
            key: id.as_bytes().to_vec(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Raw key-value storage partitioned into named collections.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Every value of a collection, in key order.
    async fn scan(&self, collection: &str) -> Result<Vec<Vec<u8>>>;

    /// Applies the batch atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// A JSON-encoded entity keyed by its UUID.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
}

macro_rules! record {
    ($ty:ty, $collection:literal) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

record!(Client, "clients");
record!(Tariff, "tariffs");
record!(Account, "accounts");
record!(Transaction, "transactions");
record!(LedgerEntry, "ledger_entries");
record!(Credit, "credits");
record!(CreditSchedule, "credit_schedules");
record!(Investment, "investments");

/// Typed access on top of a [`Store`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get<R: Record>(&self, id: Uuid) -> Result<Option<R>> {
        match self.store.get(R::COLLECTION, id.as_bytes()).await? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt {} record {id}", R::COLLECTION))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub async fn all<R: Record>(&self) -> Result<Vec<R>> {
        self.store
            .scan(R::COLLECTION)
            .await?
            .iter()
            .map(|bytes| {
                serde_json::from_slice(bytes)
                    .with_context(|| format!("Corrupt record in {}", R::COLLECTION))
            })
            .collect()
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.store.commit(batch).await
    }
}
