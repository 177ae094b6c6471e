use super::{COLLECTIONS, Mutation, Store, WriteBatch};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Persistent store backed by a fjall keyspace, one partition per collection.
#[derive(Clone)]
pub struct DiskStore {
    keyspace: Arc<Keyspace>,
    partitions: Arc<HashMap<&'static str, PartitionHandle>>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", path.display()))?;

        let mut partitions = HashMap::new();
        for name in COLLECTIONS {
            let partition = keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .with_context(|| format!("Failed to open partition {name}"))?;
            partitions.insert(name, partition);
        }
        debug!(path = %path.display(), "Opened disk store");

        Ok(Self {
            keyspace: Arc::new(keyspace),
            partitions: Arc::new(partitions),
        })
    }

    fn partition(&self, collection: &str) -> Result<&PartitionHandle> {
        self.partitions
            .get(collection)
            .ok_or_else(|| anyhow!("Unknown collection: {collection}"))
    }
}

#[async_trait]
impl Store for DiskStore {
    async fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.partition(collection)?.get(key)?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Vec<u8>>> {
        self.partition(collection)?
            .iter()
            .map(|item| -> Result<Vec<u8>> {
                let (_, value) = item?;
                Ok(value.to_vec())
            })
            .collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let count = batch.len();
        let mut fjall_batch = self.keyspace.batch();
        for mutation in batch.into_mutations() {
            match mutation {
                Mutation::Put {
                    collection,
                    key,
                    value,
                } => fjall_batch.insert(self.partition(collection)?, key, value),
                Mutation::Delete { collection, key } => {
                    fjall_batch.remove(self.partition(collection)?, key)
                }
            }
        }
        fjall_batch.commit().context("Failed to commit batch")?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist keyspace")?;
        debug!(mutations = count, "Committed batch to disk store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::{Account, AccountKind};
    use crate::core::transaction::LedgerEntry;
    use crate::store::{Record, Repository};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_disk_store_get_put() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let account = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Checking, Utc::now());

        assert!(store.get(Account::COLLECTION, account.id.as_bytes()).await.unwrap().is_none());

        let mut batch = WriteBatch::new();
        batch.put(&account).unwrap();
        store.commit(batch).await.unwrap();

        assert!(store.get(Account::COLLECTION, account.id.as_bytes()).await.unwrap().is_some());
        assert!(store.get(LedgerEntry::COLLECTION, account.id.as_bytes()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_through_repository() {
        let dir = tempdir().unwrap();
        let repo = Repository::new(Arc::new(DiskStore::open(dir.path()).unwrap()));
        let mut first = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Checking, Utc::now());
        first.funds = dec!(99.99);
        let second = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Investment, Utc::now());

        let mut batch = WriteBatch::new();
        batch.put(&first).unwrap();
        batch.put(&second).unwrap();
        repo.commit(batch).await.unwrap();

        let loaded: Account = repo.get(first.id).await.unwrap().unwrap();
        assert_eq!(loaded.funds, dec!(99.99));
        assert_eq!(repo.all::<Account>().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_disk_store_delete_and_unknown_collection() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let account = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Loan, Utc::now());

        let mut batch = WriteBatch::new();
        batch.put(&account).unwrap();
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete::<Account>(account.id);
        store.commit(batch).await.unwrap();
        assert!(store.scan(Account::COLLECTION).await.unwrap().is_empty());

        assert!(store.get("unknown", b"key").await.is_err());
    }

    #[tokio::test]
    async fn test_disk_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let mut kept = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Checking, Utc::now());
        kept.funds = dec!(250.75);
        let removed = Account::new(Uuid::new_v4(), Uuid::new_v4(), AccountKind::Loan, Utc::now());

        {
            let repo = Repository::new(Arc::new(DiskStore::open(dir.path()).unwrap()));
            let mut batch = WriteBatch::new();
            batch.put(&kept).unwrap();
            batch.put(&removed).unwrap();
            repo.commit(batch).await.unwrap();

            let mut batch = WriteBatch::new();
            batch.delete::<Account>(removed.id);
            repo.commit(batch).await.unwrap();
        }

        let repo = Repository::new(Arc::new(DiskStore::open(dir.path()).unwrap()));
        let loaded: Account = repo.get(kept.id).await.unwrap().unwrap();
        assert_eq!(loaded, kept);
        assert!(repo.get::<Account>(removed.id).await.unwrap().is_none());
        assert_eq!(repo.all::<Account>().await.unwrap().len(), 1);
    }
}
