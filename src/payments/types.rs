//! Gateway types and data structures
//!
//! Requests, records and acknowledgements exchanged with the VSP Server
//! gateway.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Flat field set as sent to or received from the gateway
pub type FieldMap = BTreeMap<String, String>;

/// One basket line item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketItem {
    pub description: Option<String>,
    pub quantity: Option<String>,
    /// Unit price excluding tax
    pub unit_value_net: Option<String>,
    pub unit_tax: Option<String>,
    /// Unit price including tax
    pub unit_value: Option<String>,
    pub line_total: Option<String>,
}

impl BasketItem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn unit_value_net(mut self, value: impl Into<String>) -> Self {
        self.unit_value_net = Some(value.into());
        self
    }

    pub fn unit_tax(mut self, value: impl Into<String>) -> Self {
        self.unit_tax = Some(value.into());
        self
    }

    pub fn unit_value(mut self, value: impl Into<String>) -> Self {
        self.unit_value = Some(value.into());
        self
    }

    pub fn line_total(mut self, value: impl Into<String>) -> Self {
        self.line_total = Some(value.into());
        self
    }

    /// Field values in wire order
    pub(crate) fn wire_fields(&self) -> [Option<&str>; 6] {
        [
            self.description.as_deref(),
            self.quantity.as_deref(),
            self.unit_value_net.as_deref(),
            self.unit_tax.as_deref(),
            self.unit_value.as_deref(),
            self.line_total.as_deref(),
        ]
    }
}

/// Caller-supplied transaction fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub amount: Decimal,
    /// Where the gateway posts its notification; may be relative
    pub notification_url: String,
    #[serde(default)]
    pub basket: Option<Vec<BasketItem>>,
    /// Any other gateway fields (`Currency`, `Description`, `BillingSurname`, ...)
    #[serde(default)]
    pub fields: FieldMap,
}

impl TransactionRequest {
    pub fn new(amount: Decimal, notification_url: impl Into<String>) -> Self {
        Self {
            amount,
            notification_url: notification_url.into(),
            basket: None,
            fields: FieldMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn basket(mut self, items: Vec<BasketItem>) -> Self {
        self.basket = Some(items);
        self
    }
}

/// Side-channel data stored with the transaction but never sent to the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_url: Option<String>,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ExtraData {
    pub fn with_redirects(success_url: impl Into<String>, failure_url: impl Into<String>) -> Self {
        Self {
            success_url: Some(success_url.into()),
            failure_url: Some(failure_url.into()),
            data: serde_json::Map::new(),
        }
    }
}

/// Absolute-URL context of the request that started a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlContext {
    pub base_url: String,
}

impl UrlContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

/// Raw outcome of an outbound HTTP call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Status we send back in a notification acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcknowledgementStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "INVALID")]
    Invalid,
    #[serde(rename = "ERROR")]
    Error,
}

impl AcknowledgementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcknowledgementStatus::Ok => "OK",
            AcknowledgementStatus::Invalid => "INVALID",
            AcknowledgementStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for AcknowledgementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcknowledgementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(AcknowledgementStatus::Ok),
            "INVALID" => Ok(AcknowledgementStatus::Invalid),
            "ERROR" => Ok(AcknowledgementStatus::Error),
            other => Err(format!("unknown acknowledgement status '{}'", other)),
        }
    }
}

/// Reply to a gateway notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Acknowledgement {
    pub status: AcknowledgementStatus,
    #[serde(rename = "RedirectURL")]
    pub redirect_url: String,
    pub status_detail: String,
}

impl Acknowledgement {
    pub fn new(
        status: AcknowledgementStatus,
        redirect_url: impl Into<String>,
        status_detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            redirect_url: redirect_url.into(),
            status_detail: status_detail.into(),
        }
    }
}

/// Position of a record in the notification state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Created, waiting for the gateway notification
    Initiated,
    /// Notification accepted, acknowledgement not yet recorded
    Processing,
    /// Terminal
    Acknowledged,
}

/// Correlates an outbound transaction with its later notification
///
/// `request` and `response` are fixed at creation: the notification signature
/// is computed from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    vendor_tx_id: String,
    created_at: DateTime<Utc>,
    request: FieldMap,
    response: FieldMap,
    extra_data: ExtraData,
    notification_received_at: Option<DateTime<Utc>>,
    notification_data: Option<FieldMap>,
    acknowledgement_data: Option<Acknowledgement>,
}

impl TransactionRecord {
    pub fn new(
        vendor_tx_id: impl Into<String>,
        request: FieldMap,
        response: FieldMap,
        extra_data: ExtraData,
    ) -> Self {
        Self {
            vendor_tx_id: vendor_tx_id.into(),
            created_at: Utc::now(),
            request,
            response,
            extra_data,
            notification_received_at: None,
            notification_data: None,
            acknowledgement_data: None,
        }
    }

    /// Rebuild a record from storage
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        vendor_tx_id: String,
        created_at: DateTime<Utc>,
        request: FieldMap,
        response: FieldMap,
        extra_data: ExtraData,
        notification_received_at: Option<DateTime<Utc>>,
        notification_data: Option<FieldMap>,
        acknowledgement_data: Option<Acknowledgement>,
    ) -> Self {
        Self {
            vendor_tx_id,
            created_at,
            request,
            response,
            extra_data,
            notification_received_at,
            notification_data,
            acknowledgement_data,
        }
    }

    pub fn vendor_tx_id(&self) -> &str {
        &self.vendor_tx_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn request(&self) -> &FieldMap {
        &self.request
    }

    pub fn response(&self) -> &FieldMap {
        &self.response
    }

    pub fn extra_data(&self) -> &ExtraData {
        &self.extra_data
    }

    pub fn notification_received_at(&self) -> Option<DateTime<Utc>> {
        self.notification_received_at
    }

    pub fn notification_data(&self) -> Option<&FieldMap> {
        self.notification_data.as_ref()
    }

    pub fn acknowledgement_data(&self) -> Option<&Acknowledgement> {
        self.acknowledgement_data.as_ref()
    }

    pub fn state(&self) -> TransactionState {
        match (&self.notification_received_at, &self.acknowledgement_data) {
            (None, _) => TransactionState::Initiated,
            (Some(_), None) => TransactionState::Processing,
            (Some(_), Some(_)) => TransactionState::Acknowledged,
        }
    }

    /// Record the first accepted notification. Never overwrites an earlier one.
    pub(crate) fn mark_notified(&mut self, received_at: DateTime<Utc>, data: FieldMap) -> bool {
        if self.notification_received_at.is_some() {
            return false;
        }
        self.notification_received_at = Some(received_at);
        self.notification_data = Some(data);
        true
    }

    pub(crate) fn acknowledge(&mut self, ack: Acknowledgement) {
        self.acknowledgement_data = Some(ack);
    }
}
