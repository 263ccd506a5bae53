use axum::{extract::State, response::IntoResponse, Form};
use http::header;

use crate::api::AppState;
use crate::error::AppError;
use crate::payments::codec::encode_acknowledgement;
use crate::payments::FieldMap;

/// Gateway notification callback; replies with the plain-text acknowledgement
pub async fn receive_notification(
    State(state): State<AppState>,
    Form(fields): Form<FieldMap>,
) -> Result<impl IntoResponse, AppError> {
    let ack = state.notifications.handle_notification(&fields).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain")],
        encode_acknowledgement(&ack),
    ))
}
