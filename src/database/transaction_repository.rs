use crate::database::error::DatabaseError;
use crate::database::repository::{LockedRecord, TransactionStore};
use crate::database::transaction::DatabaseTransaction;
use crate::payments::types::{Acknowledgement, ExtraData, FieldMap, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT vendor_tx_id, created_at, request, response, extra_data, \
     notification_received_at, notification_data, acknowledgement_data \
     FROM vsp_transactions WHERE vendor_tx_id = $1";

/// Row shape of `vsp_transactions`
#[derive(Debug, FromRow)]
struct TransactionRow {
    vendor_tx_id: String,
    created_at: DateTime<Utc>,
    request: Json<FieldMap>,
    response: Json<FieldMap>,
    extra_data: Json<ExtraData>,
    notification_received_at: Option<DateTime<Utc>>,
    notification_data: Option<Json<FieldMap>>,
    acknowledgement_data: Option<Json<Acknowledgement>>,
}

impl From<TransactionRow> for TransactionRecord {
    fn from(row: TransactionRow) -> Self {
        TransactionRecord::restore(
            row.vendor_tx_id,
            row.created_at,
            row.request.0,
            row.response.0,
            row.extra_data.0,
            row.notification_received_at,
            row.notification_data.map(|j| j.0),
            row.acknowledgement_data.map(|j| j.0),
        )
    }
}

/// PostgreSQL transaction store
///
/// `get_for_update` opens a database transaction and takes a row lock with
/// `SELECT ... FOR UPDATE`; the lock is held until the handle is saved
/// (commit) or dropped (rollback).
#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn create(&self, record: &TransactionRecord) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO vsp_transactions
             (vendor_tx_id, created_at, request, response, extra_data)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(record.vendor_tx_id())
        .bind(record.created_at())
        .bind(Json(record.request()))
        .bind(Json(record.response()))
        .bind(Json(record.extra_data()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = DatabaseError::from_sqlx(e);
            if err.is_unique_violation() {
                DatabaseError::duplicate_vendor_tx_id(record.vendor_tx_id())
            } else {
                err
            }
        })
    }

    async fn get_for_update(
        &self,
        vendor_tx_id: &str,
    ) -> Result<Option<Box<dyn LockedRecord>>, DatabaseError> {
        let mut tx = DatabaseTransaction::begin(&self.pool).await?;

        let row = sqlx::query_as::<_, TransactionRow>(&format!("{} FOR UPDATE", SELECT_COLUMNS))
            .bind(vendor_tx_id)
            .fetch_optional(&mut **tx.tx_mut()?)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        match row {
            Some(row) => {
                debug!("Locked transaction {}", vendor_tx_id);
                Ok(Some(Box::new(PgLockedRecord {
                    tx,
                    record: row.into(),
                })))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    async fn find(&self, vendor_tx_id: &str) -> Result<Option<TransactionRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, TransactionRow>(SELECT_COLUMNS)
            .bind(vendor_tx_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(row.map(TransactionRecord::from))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        crate::database::health_check(&self.pool).await
    }
}

struct PgLockedRecord {
    tx: DatabaseTransaction,
    record: TransactionRecord,
}

#[async_trait]
impl LockedRecord for PgLockedRecord {
    fn record(&self) -> &TransactionRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut TransactionRecord {
        &mut self.record
    }

    async fn save(self: Box<Self>) -> Result<(), DatabaseError> {
        let PgLockedRecord { mut tx, record } = *self;

        // request, response and extra_data are immutable and never rewritten
        sqlx::query(
            "UPDATE vsp_transactions
             SET notification_received_at = $2, notification_data = $3, acknowledgement_data = $4
             WHERE vendor_tx_id = $1",
        )
        .bind(record.vendor_tx_id())
        .bind(record.notification_received_at())
        .bind(record.notification_data().map(Json))
        .bind(record.acknowledgement_data().map(Json))
        .execute(&mut **tx.tx_mut()?)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await
    }
}
