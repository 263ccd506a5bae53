//! `reqwest` implementation of [`HttpTransport`]

use crate::error::{AppError, AppResult};
use crate::payments::traits::HttpTransport;
use crate::payments::types::HttpResponse;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP transport backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vsp-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, url: &str, body: String) -> AppResult<HttpResponse> {
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("Gateway request to {} failed: {}", url, e);
                AppError::from(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read gateway response body: {}", e);
            AppError::from(e)
        })?;

        Ok(HttpResponse { status, body })
    }
}
