use crate::database::error::DatabaseError;
use crate::database::repository::{LockedRecord, TransactionStore};
use crate::payments::types::TransactionRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Thread-safe in-memory transaction store
///
/// Each record sits behind its own mutex, so locking one transaction never
/// blocks notifications for another.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    records: Arc<RwLock<HashMap<String, Arc<Mutex<TransactionRecord>>>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, record: &TransactionRecord) -> Result<i64, DatabaseError> {
        let mut records = self.records.write().await;
        if records.contains_key(record.vendor_tx_id()) {
            return Err(DatabaseError::duplicate_vendor_tx_id(record.vendor_tx_id()));
        }
        records.insert(
            record.vendor_tx_id().to_string(),
            Arc::new(Mutex::new(record.clone())),
        );
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn get_for_update(
        &self,
        vendor_tx_id: &str,
    ) -> Result<Option<Box<dyn LockedRecord>>, DatabaseError> {
        // Release the map lock before waiting on the record
        let entry = self.records.read().await.get(vendor_tx_id).cloned();
        let Some(entry) = entry else {
            return Ok(None);
        };

        let guard = entry.lock_owned().await;
        let working = (*guard).clone();
        Ok(Some(Box::new(InMemoryLockedRecord { guard, working })))
    }

    async fn find(&self, vendor_tx_id: &str) -> Result<Option<TransactionRecord>, DatabaseError> {
        let entry = self.records.read().await.get(vendor_tx_id).cloned();
        match entry {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }
}

struct InMemoryLockedRecord {
    guard: OwnedMutexGuard<TransactionRecord>,
    working: TransactionRecord,
}

#[async_trait]
impl LockedRecord for InMemoryLockedRecord {
    fn record(&self) -> &TransactionRecord {
        &self.working
    }

    fn record_mut(&mut self) -> &mut TransactionRecord {
        &mut self.working
    }

    async fn save(self: Box<Self>) -> Result<(), DatabaseError> {
        let InMemoryLockedRecord { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::{ExtraData, FieldMap};
    use chrono::Utc;
    use std::time::Duration;

    fn record(id: &str) -> TransactionRecord {
        TransactionRecord::new(id, FieldMap::new(), FieldMap::new(), ExtraData::default())
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryTransactionStore::new();
        let id = store.create(&record("tx1")).await.unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.create(&record("tx2")).await.unwrap(), 2);

        let found = store.find("tx1").await.unwrap().unwrap();
        assert_eq!(found.vendor_tx_id(), "tx1");
        assert!(store.find("missing").await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_vendor_tx_id_rejected() {
        let store = InMemoryTransactionStore::new();
        store.create(&record("tx1")).await.unwrap();
        let err = store.create(&record("tx1")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_unsaved_changes_are_discarded() {
        let store = InMemoryTransactionStore::new();
        store.create(&record("tx1")).await.unwrap();

        {
            let mut locked = store.get_for_update("tx1").await.unwrap().unwrap();
            locked.record_mut().mark_notified(Utc::now(), FieldMap::new());
        }

        let found = store.find("tx1").await.unwrap().unwrap();
        assert!(found.notification_received_at().is_none());
    }

    #[tokio::test]
    async fn test_saved_changes_are_visible() {
        let store = InMemoryTransactionStore::new();
        store.create(&record("tx1")).await.unwrap();

        let mut locked = store.get_for_update("tx1").await.unwrap().unwrap();
        locked.record_mut().mark_notified(Utc::now(), FieldMap::new());
        locked.save().await.unwrap();

        let found = store.find("tx1").await.unwrap().unwrap();
        assert!(found.notification_received_at().is_some());
    }

    #[tokio::test]
    async fn test_health_check_always_passes() {
        assert!(InMemoryTransactionStore::new().health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_get_for_update_missing_record() {
        let store = InMemoryTransactionStore::new();
        assert!(store.get_for_update("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_per_record() {
        let store = InMemoryTransactionStore::new();
        store.create(&record("tx1")).await.unwrap();
        store.create(&record("tx2")).await.unwrap();

        let held = store.get_for_update("tx1").await.unwrap().unwrap();

        // Another record is unaffected
        let other = tokio::time::timeout(Duration::from_millis(100), store.get_for_update("tx2"))
            .await
            .expect("tx2 should not be blocked");
        assert!(other.unwrap().is_some());

        // The same record waits for the holder
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), store.get_for_update("tx1")).await;
        assert!(blocked.is_err());

        drop(held);
        let relocked = tokio::time::timeout(Duration::from_millis(100), store.get_for_update("tx1"))
            .await
            .expect("lock should be released on drop");
        assert!(relocked.unwrap().is_some());
    }
}
