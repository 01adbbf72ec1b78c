use anyhow::Result;
use push_relay::{
    clients::onesignal::{OneSignalClient, PushMessage},
    error::AppError,
};
use serde_json::{Map, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

use crate::helpers::{gateway_bodies, gateway_url, test_config};

fn message(recipient_id: &str) -> PushMessage<'_> {
    PushMessage {
        recipient_id,
        title: "New message",
        body: "hi",
        data: Map::new(),
        collapse_id: Some("messages_m1".to_string()),
        idempotency_key: None,
    }
}

/// Test: A 2xx reply with targeting errors and no id counts as a failure
#[tokio::test]
async fn test_targeting_errors_are_failures() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "",
            "errors": ["All included players are not subscribed"],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OneSignalClient::new(&test_config(&gateway_url(&server), true, None))?;
    let outcome = client.send(message("u1")).await;

    assert!(!outcome.ok, "Targeting errors should fail the recipient");
    assert_eq!(outcome.status, Some(200));
    assert_eq!(
        outcome.errors,
        Some(json!(["All included players are not subscribed"]))
    );

    Ok(())
}

/// Test: Errors alongside a notification id still count as delivered
#[tokio::test]
async fn test_errors_with_id_are_success() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "notif-9",
            "errors": { "invalid_aliases": { "external_id": ["ghost"] } },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OneSignalClient::new(&test_config(&gateway_url(&server), true, None))?;
    let outcome = client.send(message("u1")).await;

    assert!(outcome.ok);
    assert_eq!(outcome.id.as_deref(), Some("notif-9"));

    Ok(())
}

/// Test: Requests use key auth and the push wire format
#[tokio::test]
async fn test_request_wire_format() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications"))
        .and(header("authorization", "Key test-api-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "n1" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OneSignalClient::new(&test_config(&gateway_url(&server), true, None))?;
    let outcome = client.send(message("u1")).await;
    assert!(outcome.ok);

    let bodies = gateway_bodies(&server).await?;
    assert_eq!(
        bodies[0],
        json!({
            "app_id": "test-app-id",
            "target_channel": "push",
            "include_aliases": { "external_id": ["u1"] },
            "headings": { "en": "New message" },
            "contents": { "en": "hi" },
            "data": {},
            "collapse_id": "messages_m1",
        })
    );

    Ok(())
}

/// Test: Transport failures become outcomes without a status
#[tokio::test]
async fn test_unreachable_gateway_is_a_failure_outcome() -> Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://{}/notifications", listener.local_addr()?);
    drop(listener);

    let client = OneSignalClient::new(&test_config(&url, true, None))?;
    let outcome = client.send(message("u1")).await;

    assert!(!outcome.ok);
    assert_eq!(outcome.status, None);
    assert!(outcome.errors.is_some_and(|e| e.is_string()));

    Ok(())
}

/// Test: The client refuses to build without credentials
#[test]
fn test_missing_credentials_are_a_configuration_error() {
    let config = test_config("http://127.0.0.1:9/notifications", false, None);

    match OneSignalClient::new(&config) {
        Err(AppError::MissingConfiguration(missing)) => {
            assert_eq!(missing, "ONESIGNAL_APP_ID, ONESIGNAL_API_KEY");
        }
        Err(other) => panic!("Expected a configuration error, got {}", other),
        Ok(_) => panic!("Client should not build without credentials"),
    }
}
