use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use push_relay::{
    api::{AppState, build_router},
    clients::{onesignal::OneSignalClient, realtime::ChangeFeed},
    config::Config,
    models::event::ChangeEvent,
    relay::Relay,
};
use serde_json::{Map, Value};
use tower::ServiceExt;
use wiremock::{MockServer, Request as RecordedRequest};

pub const APP_ID: &str = "test-app-id";
pub const API_KEY: &str = "test-api-key";

pub fn gateway_url(server: &MockServer) -> String {
    format!("{}/notifications", server.uri())
}

/// Config wired to a mock gateway, with optional credentials and webhook secret.
pub fn test_config(gateway_url: &str, with_credentials: bool, secret: Option<&str>) -> Config {
    let mut vars = vec![
        ("ONESIGNAL_API_URL".to_string(), gateway_url.to_string()),
        ("PUSH_TIMEOUT_SECONDS".to_string(), "5".to_string()),
    ];

    if with_credentials {
        vars.push(("ONESIGNAL_APP_ID".to_string(), APP_ID.to_string()));
        vars.push(("ONESIGNAL_API_KEY".to_string(), API_KEY.to_string()));
    }

    if let Some(secret) = secret {
        vars.push(("WEBHOOK_SECRET".to_string(), secret.to_string()));
    }

    Config::from_vars(vars).expect("test config should deserialize")
}

pub fn test_relay(server: &MockServer) -> Relay {
    let config = test_config(&gateway_url(server), true, None);
    Relay::new(OneSignalClient::new(&config).expect("credentials are configured"))
}

pub fn test_app(config: Config) -> Router {
    let state = AppState::new(config, Arc::new(ChangeFeed::disabled()));
    build_router(Arc::new(state))
}

pub fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        other => panic!("record must be a JSON object, got {}", other),
    }
}

pub fn insert_event(table: &str, value: Value) -> ChangeEvent {
    ChangeEvent::insert(table, record(value))
}

pub async fn post(
    app: Router,
    uri: &str,
    body: impl Into<String>,
    headers: &[(&str, &str)],
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");

    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let response = app.oneshot(builder.body(Body::from(body.into()))?).await?;
    read_json(response).await
}

pub async fn get(app: Router, uri: &str) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method("GET").uri(uri).body(Body::empty())?;
    let response = app.oneshot(request).await?;
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json = serde_json::from_slice(&bytes)
        .map_err(|e| anyhow!("Response body is not JSON ({}): {:?}", e, bytes))?;
    Ok((status, json))
}

/// Bodies of every request the mock gateway received.
pub async fn gateway_bodies(server: &MockServer) -> Result<Vec<Value>> {
    let requests: Vec<RecordedRequest> = server
        .received_requests()
        .await
        .ok_or_else(|| anyhow!("Request recording is disabled"))?;

    requests
        .iter()
        .map(|r| serde_json::from_slice(&r.body).map_err(Into::into))
        .collect()
}

pub fn external_ids(body: &Value) -> Vec<String> {
    body["include_aliases"]["external_id"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
