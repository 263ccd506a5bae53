use crate::error::{AppError, AppErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            AppErrorKind::Infrastructure(_) | AppErrorKind::Hook { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppErrorKind::Validation { .. } => StatusCode::BAD_REQUEST,
            AppErrorKind::External(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let Some((gateway_status, detail)) = self.gateway_status() {
            body["gateway_status"] = json!(gateway_status);
            body["gateway_detail"] = json!(detail);
        }

        (status, Json(body)).into_response()
    }
}
