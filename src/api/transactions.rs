use axum::{extract::State, Json};
use http::HeaderMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::AppError;
use crate::payments::{BasketItem, ExtraData, FieldMap, TransactionRequest, UrlContext};

#[derive(Debug, Deserialize)]
pub struct StartTransactionBody {
    pub amount: Decimal,
    pub notification_url: String,
    #[serde(default)]
    pub basket: Option<Vec<BasketItem>>,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub extra_data: ExtraData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartTransactionResponse {
    pub next_url: String,
}

pub async fn start_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<StartTransactionBody>,
) -> Result<Json<StartTransactionResponse>, AppError> {
    let request = TransactionRequest {
        amount: body.amount,
        notification_url: body.notification_url,
        basket: body.basket,
        fields: body.fields,
    };
    let context = request_context(&headers);

    info!(amount = %request.amount, "Starting transaction");
    let next_url = state
        .initiator
        .start_transaction(request, body.extra_data, context.as_ref())
        .await?;

    Ok(Json(StartTransactionResponse { next_url }))
}

/// Absolute base of the incoming request, from `Host` and `X-Forwarded-Proto`
fn request_context(headers: &HeaderMap) -> Option<UrlContext> {
    let host = headers.get("host")?.to_str().ok()?;
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    Some(UrlContext::new(format!("{}://{}", scheme, host)))
}
