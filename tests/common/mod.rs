//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vsp_gateway::config::GatewayConfig;
use vsp_gateway::database::{InMemoryTransactionStore, TransactionStore};
use vsp_gateway::error::AppResult;
use vsp_gateway::payments::types::HttpResponse;
use vsp_gateway::payments::{
    BaseUrlResolver, ExtraData, FieldMap, HttpTransport, NotificationHandler, NotificationHooks,
    TransactionInitiator, TransactionRecord,
};

pub const VENDOR_TX_CODE: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90";
pub const REFERENCE_SIGNATURE: &str = "1FDCC392F6ECF162DF6A4379CAC802CF";
pub const DEFAULT_REDIRECT: &str = "https://shop.example/";
pub const SUCCESS_URL: &str = "https://shop.example/checkout/ok";
pub const FAILURE_URL: &str = "https://shop.example/checkout/failed";

pub const REGISTERED_BODY: &str = "VPSProtocol=2.23\r\n\
    Status=OK\r\n\
    StatusDetail=2014 : The Transaction was Registered Successfully.\r\n\
    VPSTxId={73A2E7A6-1F4E-4C3C-9D5B-8E1F2A3B4C5D}\r\n\
    SecurityKey=ZQ4KXC8R1N\r\n\
    NextURL=https://test.sagepay.com/gateway/service/cardselection?vpstxid={73A2E7A6-1F4E-4C3C-9D5B-8E1F2A3B4C5D}";

pub fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn gateway_config() -> GatewayConfig {
    let mut config = GatewayConfig::new("https://test.sagepay.com/gateway/service/vspserver-register.vsp");
    config.vendor = Some("testvendor".to_string());
    config.base_url = Some("https://shop.example".to_string());
    config.default_redirect_url = Some(DEFAULT_REDIRECT.to_string());
    config
        .defaults
        .insert("Currency".to_string(), "GBP".to_string());
    config
}

/// The stored transaction the reference notification was signed against
pub fn reference_record() -> TransactionRecord {
    TransactionRecord::new(
        VENDOR_TX_CODE,
        fields(&[
            ("VPSProtocol", "2.23"),
            ("TxType", "PAYMENT"),
            ("Vendor", "testvendor"),
            ("VendorTxCode", VENDOR_TX_CODE),
            ("Amount", "12.50"),
            ("Currency", "GBP"),
        ]),
        fields(&[
            ("VPSProtocol", "2.23"),
            ("Status", "OK"),
            ("VPSTxId", "{73A2E7A6-1F4E-4C3C-9D5B-8E1F2A3B4C5D}"),
            ("SecurityKey", "ZQ4KXC8R1N"),
        ]),
        ExtraData::with_redirects(SUCCESS_URL, FAILURE_URL),
    )
}

/// A successful notification carrying `REFERENCE_SIGNATURE`
pub fn reference_notification() -> FieldMap {
    fields(&[
        ("VPSProtocol", "2.23"),
        ("TxType", "PAYMENT"),
        ("VendorTxCode", VENDOR_TX_CODE),
        ("VPSTxId", "{73A2E7A6-1F4E-4C3C-9D5B-8E1F2A3B4C5D}"),
        ("Status", "OK"),
        ("StatusDetail", "0000 : The Authorisation was Successful."),
        ("TxAuthNo", "7349"),
        ("AVSCV2", "ALL MATCH"),
        ("AddressResult", "MATCHED"),
        ("PostCodeResult", "MATCHED"),
        ("CV2Result", "MATCHED"),
        ("GiftAid", "0"),
        ("3DSecureStatus", "OK"),
        ("CAVV", "AAABARR5kwAAAAAAAAAAAAAAAAA="),
        ("CardType", "VISA"),
        ("Last4Digits", "0006"),
        ("VPSSignature", REFERENCE_SIGNATURE),
    ])
}

pub async fn seeded_store() -> InMemoryTransactionStore {
    let store = InMemoryTransactionStore::new();
    store
        .create(&reference_record())
        .await
        .expect("seed record");
    store
}

/// Transport that records each request and replies with a fixed response
pub struct MockTransport {
    response: HttpResponse,
    pub requests: Mutex<Vec<(String, FieldMap)>>,
}

impl MockTransport {
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: HttpResponse {
                status,
                body: body.to_string(),
            },
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> Option<FieldMap> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|(_, fields)| fields.clone())
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post(&self, url: &str, body: String) -> AppResult<HttpResponse> {
        let decoded: FieldMap = serde_urlencoded::from_str(&body).expect("form body");
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), decoded));
        Ok(self.response.clone())
    }
}

/// Hooks that count calls and can be slowed down to widen race windows
#[derive(Default)]
pub struct RecordingHooks {
    pub successes: AtomicUsize,
    pub failures: AtomicUsize,
    pub delay: Option<Duration>,
}

impl RecordingHooks {
    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationHooks for RecordingHooks {
    async fn on_success(&self, _record: &TransactionRecord) -> AppResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.successes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_failure(&self, _record: &TransactionRecord) -> AppResult<()> {
        self.failures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn notification_handler(
    store: &InMemoryTransactionStore,
    hooks: Arc<RecordingHooks>,
) -> NotificationHandler {
    NotificationHandler::new(Arc::new(store.clone()), hooks, DEFAULT_REDIRECT)
}

pub fn initiator(
    store: &InMemoryTransactionStore,
    transport: Arc<MockTransport>,
) -> TransactionInitiator {
    let config = gateway_config();
    let resolver = BaseUrlResolver::new(config.base_url.clone());
    TransactionInitiator::new(
        config,
        transport,
        Arc::new(store.clone()),
        Arc::new(resolver),
    )
}
