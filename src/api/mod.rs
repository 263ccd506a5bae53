pub mod error;
pub mod health;
pub mod notification;
pub mod transactions;

use crate::config::Config;
use crate::database::TransactionStore;
use crate::payments::{NotificationHandler, TransactionInitiator};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub initiator: Arc<TransactionInitiator>,
    pub notifications: Arc<NotificationHandler>,
    /// Same store the initiator and handler use; pinged by `/health`
    pub transactions: Arc<dyn TransactionStore>,
    /// Store backend name reported by `/health`
    pub store: &'static str,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/transactions", post(transactions::start_transaction))
        .route("/vsp/notification", post(notification::receive_notification))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
