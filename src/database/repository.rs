use crate::database::error::DatabaseError;
use crate::payments::types::TransactionRecord;
use async_trait::async_trait;

/// Keyed store of transaction records
///
/// Records are keyed by vendor transaction code, which must be unique.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new record, returning its store id.
    /// Fails with a unique-constraint error if the vendor transaction code exists.
    async fn create(&self, record: &TransactionRecord) -> Result<i64, DatabaseError>;

    /// Fetch a record and hold an exclusive lock on it until the returned
    /// handle is saved or dropped
    async fn get_for_update(
        &self,
        vendor_tx_id: &str,
    ) -> Result<Option<Box<dyn LockedRecord>>, DatabaseError>;

    /// Plain read without locking
    async fn find(&self, vendor_tx_id: &str) -> Result<Option<TransactionRecord>, DatabaseError>;

    /// Check the backing store is reachable
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Exclusive handle on one record
///
/// Changes made through `record_mut` become visible only after `save`.
/// Dropping the handle without saving discards them and releases the lock.
#[async_trait]
pub trait LockedRecord: Send {
    fn record(&self) -> &TransactionRecord;

    fn record_mut(&mut self) -> &mut TransactionRecord;

    /// Persist all changes atomically and release the lock
    async fn save(self: Box<Self>) -> Result<(), DatabaseError>;
}
