//! Gateway notification handling
//!
//! The gateway posts one notification per transaction (and retries until it
//! gets an acknowledgement). Each notification is verified against the stored
//! record and processed at most once; the reply tells the gateway where to
//! send the customer next.

use crate::database::repository::{LockedRecord, TransactionStore};
use crate::error::AppResult;
use crate::payments::signature::is_valid_signature;
use crate::payments::traits::NotificationHooks;
use crate::payments::types::{Acknowledgement, AcknowledgementStatus, FieldMap, TransactionRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DETAIL_UNKNOWN_TRANSACTION: &str = "VendorTxCode did not match any transaction";
pub const DETAIL_BAD_SIGNATURE: &str = "VPSSignature did not match";
pub const DETAIL_ALREADY_PROCESSED: &str = "Transaction already processed";

pub struct NotificationHandler {
    store: Arc<dyn TransactionStore>,
    hooks: Arc<dyn NotificationHooks>,
    default_redirect_url: String,
}

impl NotificationHandler {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        hooks: Arc<dyn NotificationHooks>,
        default_redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            hooks,
            default_redirect_url: default_redirect_url.into(),
        }
    }

    /// Process one gateway notification and build the acknowledgement.
    ///
    /// Unknown transactions, bad signatures and repeat deliveries produce
    /// acknowledgements and leave the record untouched. An `Err` means the
    /// store or a hook failed; nothing was saved and the host should answer
    /// with a server error so the gateway retries.
    pub async fn handle_notification(&self, fields: &FieldMap) -> AppResult<Acknowledgement> {
        let vendor_tx_id = fields
            .get("VendorTxCode")
            .map(String::as_str)
            .unwrap_or_default();

        let Some(mut locked) = self.store.get_for_update(vendor_tx_id).await? else {
            warn!(vendor_tx_id, "Notification for unknown transaction");
            return Ok(Acknowledgement::new(
                AcknowledgementStatus::Error,
                self.default_redirect_url.clone(),
                DETAIL_UNKNOWN_TRANSACTION,
            ));
        };

        if !is_valid_signature(locked.record(), fields) {
            warn!(vendor_tx_id, "Notification signature mismatch");
            return Ok(Acknowledgement::new(
                AcknowledgementStatus::Invalid,
                self.failure_url(locked.record()),
                DETAIL_BAD_SIGNATURE,
            ));
        }

        if locked.record().notification_received_at().is_some() {
            info!(vendor_tx_id, "Duplicate notification ignored");
            return Ok(Acknowledgement::new(
                AcknowledgementStatus::Error,
                self.failure_url(locked.record()),
                DETAIL_ALREADY_PROCESSED,
            ));
        }

        locked
            .record_mut()
            .mark_notified(Utc::now(), fields.clone());

        let status = fields.get("Status").map(String::as_str).unwrap_or_default();
        let redirect_url = if status == "OK" {
            self.run_hook(vendor_tx_id, self.hooks.on_success(locked.record()).await)?;
            self.success_url(locked.record())
        } else {
            self.run_hook(vendor_tx_id, self.hooks.on_failure(locked.record()).await)?;
            self.failure_url(locked.record())
        };

        let ack_status = if status == "ERROR" {
            AcknowledgementStatus::Invalid
        } else {
            AcknowledgementStatus::Ok
        };
        let ack = Acknowledgement::new(ack_status, redirect_url, "");

        locked.record_mut().acknowledge(ack.clone());
        save(locked, vendor_tx_id).await?;

        info!(
            vendor_tx_id,
            gateway_status = status,
            ack_status = %ack.status,
            "Notification processed"
        );
        Ok(ack)
    }

    fn success_url(&self, record: &TransactionRecord) -> String {
        record
            .extra_data()
            .success_url
            .clone()
            .unwrap_or_else(|| self.default_redirect_url.clone())
    }

    fn failure_url(&self, record: &TransactionRecord) -> String {
        record
            .extra_data()
            .failure_url
            .clone()
            .unwrap_or_else(|| self.default_redirect_url.clone())
    }

    fn run_hook(&self, vendor_tx_id: &str, result: AppResult<()>) -> AppResult<()> {
        result.map_err(|e| {
            error!(vendor_tx_id, error = %e, "Notification hook failed, update discarded");
            e
        })
    }
}

async fn save(locked: Box<dyn LockedRecord>, vendor_tx_id: &str) -> AppResult<()> {
    locked.save().await.map_err(|e| {
        error!(vendor_tx_id, error = %e, "Failed to save notification");
        e.into()
    })
}
