//! Transaction registration
//!
//! Registers a payment with the gateway and stores the record the later
//! notification is checked against.

use crate::config::GatewayConfig;
use crate::database::repository::TransactionStore;
use crate::error::{AppError, AppResult};
use crate::payments::codec::{decode_response, encode_basket, encode_request, format_money_value};
use crate::payments::sanitize::truncate_overlong_fields;
use crate::payments::traits::{HttpTransport, UrlResolver};
use crate::payments::types::{ExtraData, FieldMap, TransactionRecord, TransactionRequest, UrlContext};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const PROTOCOL_VERSION: &str = "2.23";
pub const DEFAULT_TX_TYPE: &str = "PAYMENT";
/// Longest `VendorTxCode` the gateway and the record store accept
pub const VENDOR_TX_CODE_LENGTH: usize = 40;

pub struct TransactionInitiator {
    config: GatewayConfig,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TransactionStore>,
    resolver: Arc<dyn UrlResolver>,
}

impl TransactionInitiator {
    pub fn new(
        config: GatewayConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TransactionStore>,
        resolver: Arc<dyn UrlResolver>,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            resolver,
        }
    }

    /// Register a transaction and return the gateway `NextURL` the customer
    /// must be sent to.
    ///
    /// Nothing is stored unless the gateway accepted the transaction.
    pub async fn start_transaction(
        &self,
        request: TransactionRequest,
        mut extra_data: ExtraData,
        context: Option<&UrlContext>,
    ) -> AppResult<String> {
        let fields = self.build_fields(request, context)?;
        extra_data.success_url = self.absolutize_optional(extra_data.success_url, context)?;
        extra_data.failure_url = self.absolutize_optional(extra_data.failure_url, context)?;

        let fields = truncate_overlong_fields(&fields);
        let vendor_tx_id = fields
            .get("VendorTxCode")
            .cloned()
            .unwrap_or_default();

        info!(
            vendor_tx_id = %vendor_tx_id,
            amount = fields.get("Amount").map(String::as_str),
            "Registering transaction"
        );

        let body = encode_request(&fields)?;
        let response = self.transport.post(&self.config.url, body).await?;
        if !response.is_success() {
            error!(
                vendor_tx_id = %vendor_tx_id,
                status = response.status,
                "Gateway returned HTTP error"
            );
            return Err(AppError::transport(
                format!("Gateway returned HTTP {}", response.status),
                Some(response.status),
            ));
        }

        let decoded = decode_response(&response.body)?;
        let status = decoded
            .get("Status")
            .ok_or_else(|| AppError::malformed_response("response without Status"))?;
        if status != "OK" {
            let detail = decoded.get("StatusDetail").cloned().unwrap_or_default();
            warn!(
                vendor_tx_id = %vendor_tx_id,
                gateway_status = %status,
                detail = %detail,
                "Gateway rejected transaction"
            );
            return Err(AppError::gateway_rejected(status.clone(), detail));
        }

        let next_url = decoded
            .get("NextURL")
            .cloned()
            .ok_or_else(|| AppError::malformed_response("OK response without NextURL"))?;

        let record = TransactionRecord::new(vendor_tx_id.clone(), fields, decoded, extra_data);
        self.store.create(&record).await.map_err(|e| {
            error!(vendor_tx_id = %vendor_tx_id, error = %e, "Failed to store transaction");
            AppError::from(e)
        })?;

        info!(vendor_tx_id = %vendor_tx_id, "Transaction registered");
        Ok(next_url)
    }

    /// Merge protocol defaults, configured defaults and caller fields, lowest
    /// precedence first, then apply the typed request values
    fn build_fields(
        &self,
        request: TransactionRequest,
        context: Option<&UrlContext>,
    ) -> AppResult<FieldMap> {
        let mut fields = FieldMap::new();
        fields.insert("VPSProtocol".to_string(), PROTOCOL_VERSION.to_string());
        fields.insert("TxType".to_string(), DEFAULT_TX_TYPE.to_string());
        fields.insert("VendorTxCode".to_string(), new_vendor_tx_code());
        fields.extend(self.config.default_fields());
        fields.extend(request.fields);

        let vendor_tx_id = fields
            .get("VendorTxCode")
            .map(String::as_str)
            .unwrap_or_default();
        if vendor_tx_id.is_empty() || vendor_tx_id.len() > VENDOR_TX_CODE_LENGTH {
            return Err(AppError::validation(format!(
                "VendorTxCode must be 1 to {} bytes, got {}",
                VENDOR_TX_CODE_LENGTH,
                vendor_tx_id.len()
            )));
        }

        fields.insert("Amount".to_string(), format_money_value(request.amount));

        let notification_url = self
            .resolver
            .absolutize(&request.notification_url, context)
            .map_err(|e| e.with_context("NotificationURL"))?;
        fields.insert("NotificationURL".to_string(), notification_url);

        if let Some(items) = request.basket {
            fields.insert("Basket".to_string(), encode_basket(&items));
        }

        Ok(fields)
    }

    fn absolutize_optional(
        &self,
        url: Option<String>,
        context: Option<&UrlContext>,
    ) -> AppResult<Option<String>> {
        url.map(|url| self.resolver.absolutize(&url, context))
            .transpose()
    }
}

/// 122 random bits as 32 hex characters, within the 40 character limit
fn new_vendor_tx_code() -> String {
    Uuid::new_v4().simple().to_string()
}
