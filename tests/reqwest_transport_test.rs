//! `ReqwestTransport` against a local mock gateway

mod common;

use common::*;
use mockito::{Matcher, Server};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use vsp_gateway::database::InMemoryTransactionStore;
use vsp_gateway::payments::{
    BaseUrlResolver, ExtraData, HttpTransport, ReqwestTransport, TransactionInitiator,
    TransactionRequest,
};

#[tokio::test]
async fn test_post_sends_form_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/register")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::UrlEncoded("Amount".into(), "12.50".into()))
        .with_status(200)
        .with_body("Status=OK\r\nNextURL=https://gateway.example/pay")
        .create_async()
        .await;

    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    let response = transport
        .post(
            &format!("{}/register", server.url()),
            "Amount=12.50&Currency=GBP".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.body, "Status=OK\r\nNextURL=https://gateway.example/pay");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_status_is_returned_not_raised() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/register")
        .with_status(500)
        .with_body("Internal error")
        .create_async()
        .await;

    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    let response = transport
        .post(&format!("{}/register", server.url()), String::new())
        .await
        .unwrap();

    assert_eq!(response.status, 500);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_unreachable_gateway_is_transport_error() {
    let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
    let err = transport
        .post("http://127.0.0.1:1/register", String::new())
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_initiator_over_http() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/gateway/service/vspserver-register.vsp")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Vendor".into(), "testvendor".into()),
            Matcher::UrlEncoded("TxType".into(), "PAYMENT".into()),
            Matcher::UrlEncoded(
                "NotificationURL".into(),
                "https://shop.example/vsp/notification".into(),
            ),
        ]))
        .with_status(200)
        .with_body(REGISTERED_BODY)
        .create_async()
        .await;

    let mut config = gateway_config();
    config.url = format!("{}/gateway/service/vspserver-register.vsp", server.url());
    let store = InMemoryTransactionStore::new();
    let initiator = TransactionInitiator::new(
        config.clone(),
        Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
        Arc::new(store.clone()),
        Arc::new(BaseUrlResolver::new(config.base_url.clone())),
    );

    let next_url = initiator
        .start_transaction(
            TransactionRequest::new(dec!(12.50), "/vsp/notification"),
            ExtraData::default(),
            None,
        )
        .await
        .unwrap();

    assert!(next_url.starts_with("https://test.sagepay.com/"));
    assert_eq!(store.len().await, 1);
    mock.assert_async().await;
}
