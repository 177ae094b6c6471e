use super::{Mutation, Store, WriteBatch};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type Collection = BTreeMap<Vec<u8>, Vec<u8>>;

/// Volatile store for tests and dry runs.
///
/// A batch is applied under a single write lock, so readers never observe a
/// partially committed batch.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, collection: &str, key: &[u8], value: &[u8]) {
        let mut inner = self.inner.write().await;
        inner
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().await;
        Ok(inner.get(collection).and_then(|c| c.get(key)).cloned())
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Vec<u8>>> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut inner = self.inner.write().await;
        let count = batch.len();
        for mutation in batch.into_mutations() {
            match mutation {
                Mutation::Put {
                    collection,
                    key,
                    value,
                } => {
                    inner
                        .entry(collection.to_string())
                        .or_default()
                        .insert(key, value);
                }
                Mutation::Delete { collection, key } => {
                    if let Some(c) = inner.get_mut(collection) {
                        c.remove(&key);
                    }
                }
            }
        }
        debug!(mutations = count, "Committed batch to memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::{Account, AccountKind};
    use crate::store::Record;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_memory_store_get_put() {
        let store = MemoryStore::new();
        let account = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Checking, Utc::now());

        assert!(store.get(Account::COLLECTION, account.id.as_bytes()).await.unwrap().is_none());

        let mut batch = WriteBatch::new();
        batch.put(&account).unwrap();
        store.commit(batch).await.unwrap();

        assert!(store.get(Account::COLLECTION, account.id.as_bytes()).await.unwrap().is_some());
        assert_eq!(store.scan(Account::COLLECTION).await.unwrap().len(), 1);
        assert!(store.scan("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = MemoryStore::new();
        let account = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Loan, Utc::now());

        let mut batch = WriteBatch::new();
        batch.put(&account).unwrap();
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete::<Account>(account.id);
        store.commit(batch).await.unwrap();

        assert!(store.get(Account::COLLECTION, account.id.as_bytes()).await.unwrap().is_none());
    }
}
