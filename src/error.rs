//! Application error types
//!
//! Errors surfaced to the hosting application. Lookup misses, signature
//! mismatches and duplicate notifications are not errors: the notification
//! handler turns them into acknowledgements.

use crate::database::error::DatabaseError;
use std::fmt;
use thiserror::Error;

/// Result type for gateway operations
pub type AppResult<T> = Result<T, AppError>;

/// Failures of the surrounding infrastructure (configuration, storage)
#[derive(Debug, Clone, Error)]
pub enum InfrastructureError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{0}")]
    Database(DatabaseError),
}

/// Failures talking to the payment gateway
#[derive(Debug, Clone, Error)]
pub enum ExternalError {
    /// DNS, connection, timeout or non-success HTTP status
    #[error("Gateway transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
    },

    /// The gateway answered with a status other than `OK`
    #[error("Gateway rejected transaction ({status}): {detail}")]
    GatewayRejected { status: String, detail: String },

    /// The gateway answered with a body we could not decode
    #[error("Malformed gateway response: {message}")]
    MalformedResponse { message: String },
}

#[derive(Debug, Clone, Error)]
pub enum AppErrorKind {
    #[error(transparent)]
    Infrastructure(InfrastructureError),

    #[error(transparent)]
    External(ExternalError),

    /// Caller-supplied transaction data the gateway or store cannot accept
    #[error("Invalid transaction request: {message}")]
    Validation { message: String },

    /// An application success/failure hook failed
    #[error("Notification hook failed: {message}")]
    Hook { message: String },
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: message.into(),
            },
        ))
    }

    pub fn transport(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::new(AppErrorKind::External(ExternalError::Transport {
            message: message.into(),
            status_code,
        }))
    }

    pub fn gateway_rejected(status: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AppErrorKind::External(ExternalError::GatewayRejected {
            status: status.into(),
            detail: detail.into(),
        }))
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::External(ExternalError::MalformedResponse {
            message: message.into(),
        }))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation {
            message: message.into(),
        })
    }

    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Hook {
            message: message.into(),
        })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::Infrastructure(InfrastructureError::Configuration { .. })
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, AppErrorKind::Validation { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::External(ExternalError::Transport { .. })
        )
    }

    pub fn is_malformed_response(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::External(ExternalError::MalformedResponse { .. })
        )
    }

    /// Gateway status and detail text when the gateway rejected the request
    pub fn gateway_status(&self) -> Option<(&str, &str)> {
        match &self.kind {
            AppErrorKind::External(ExternalError::GatewayRejected { status, detail }) => {
                Some((status.as_str(), detail.as_str()))
            }
            _ => None,
        }
    }

    /// HTTP status code reported by the transport, if any
    pub fn http_status(&self) -> Option<u16> {
        match &self.kind {
            AppErrorKind::External(ExternalError::Transport { status_code, .. }) => *status_code,
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{} ({})", self.kind, context)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for AppError {}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Database(
            err,
        )))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        if err.is_timeout() {
            AppError::transport(format!("Request timed out: {}", err), status_code)
        } else {
            AppError::transport(format!("Request error: {}", err), status_code)
        }
    }
}
