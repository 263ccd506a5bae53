//! Collaborator trait definitions
//!
//! The initiator and notification handler reach the outside world only
//! through these traits, so they carry no dependency on a particular HTTP
//! client or web framework.

use crate::error::{AppError, AppResult};
use crate::payments::types::{HttpResponse, TransactionRecord, UrlContext};
use async_trait::async_trait;
use tracing::info;

/// Outbound HTTP used to register transactions with the gateway
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a form-encoded body.
    ///
    /// Returns the status and body for any HTTP response; only failures to
    /// get a response at all (DNS, connect, timeout) are errors.
    async fn post(&self, url: &str, body: String) -> AppResult<HttpResponse>;
}

/// Application hooks run once per transaction when its notification arrives
///
/// Both hooks run while the record is locked; an error aborts the update so
/// the gateway's retry gets a second chance.
#[async_trait]
pub trait NotificationHooks: Send + Sync {
    async fn on_success(&self, record: &TransactionRecord) -> AppResult<()>;

    /// Failed, aborted or rejected transactions. Nothing to do by default.
    async fn on_failure(&self, _record: &TransactionRecord) -> AppResult<()> {
        Ok(())
    }
}

/// Turns relative URLs into absolute ones
pub trait UrlResolver: Send + Sync {
    fn absolutize(&self, url: &str, context: Option<&UrlContext>) -> AppResult<String>;
}

/// Resolves relative URLs against the configured base URL, falling back to
/// the request context only when no base is configured
///
/// The request context comes from client-supplied headers, so it must never
/// override a configured base.
#[derive(Debug, Clone, Default)]
pub struct BaseUrlResolver {
    base_url: Option<String>,
}

impl BaseUrlResolver {
    pub fn new(base_url: Option<String>) -> Self {
        Self { base_url }
    }
}

impl UrlResolver for BaseUrlResolver {
    fn absolutize(&self, url: &str, context: Option<&UrlContext>) -> AppResult<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }

        let base = self
            .base_url
            .as_deref()
            .or(context.map(|ctx| ctx.base_url.as_str()))
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "No base URL or request context supplied: cannot make '{}' absolute",
                    url
                ))
            })?;

        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        );
        let parsed = url::Url::parse(&joined).map_err(|e| {
            AppError::configuration(format!("Invalid absolute URL '{}': {}", joined, e))
        })?;
        Ok(parsed.to_string())
    }
}

/// Hooks that only log; the default for the standalone service
#[derive(Debug, Clone, Default)]
pub struct LoggingHooks;

#[async_trait]
impl NotificationHooks for LoggingHooks {
    async fn on_success(&self, record: &TransactionRecord) -> AppResult<()> {
        info!(
            vendor_tx_id = record.vendor_tx_id(),
            amount = record.request().get("Amount").map(String::as_str),
            "Payment completed"
        );
        Ok(())
    }

    async fn on_failure(&self, record: &TransactionRecord) -> AppResult<()> {
        info!(
            vendor_tx_id = record.vendor_tx_id(),
            status = record
                .notification_data()
                .and_then(|data| data.get("Status"))
                .map(String::as_str),
            "Payment not completed"
        );
        Ok(())
    }
}
