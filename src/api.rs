use std::{any::Any, sync::Arc};

use anyhow::{Error, Result, anyhow};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
    clients::{
        health::HealthChecker,
        onesignal::{OneSignalClient, PushMessage},
        realtime::ChangeFeed,
    },
    config::Config,
    error::AppError,
    models::{
        event::parse_delivery,
        health::HealthStatus,
        request::SendNotificationRequest,
        response::{SendResponse, WebhookSummary},
    },
    relay::Relay,
    utils::secrets_match,
};

pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

pub struct AppState {
    config: Config,
    relay: Result<Relay, String>,
    change_feed: Arc<ChangeFeed>,
    health_checker: HealthChecker,
}

impl AppState {
    pub fn new(config: Config, change_feed: Arc<ChangeFeed>) -> Self {
        let relay = OneSignalClient::new(&config)
            .map(Relay::new)
            .map_err(|e| match e {
                AppError::MissingConfiguration(missing) => missing,
                other => other.to_string(),
            });

        if let Err(missing) = &relay {
            warn!(missing = %missing, "Push gateway unavailable, push requests will be rejected");
        }

        Self {
            health_checker: HealthChecker::new(config.clone()),
            config,
            relay,
            change_feed,
        }
    }

    pub fn relay(&self) -> Result<&Relay, AppError> {
        self.relay
            .as_ref()
            .map_err(|missing| AppError::MissingConfiguration(missing.clone()))
    }

    pub fn change_feed(&self) -> &Arc<ChangeFeed> {
        &self.change_feed
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/webhooks/change-events", post(change_event_webhook))
        .route("/api/supabase-webhook", post(change_event_webhook))
        .route("/api/notifications/send", post(send_notification))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

pub async fn run_api_server(config: Config) -> Result<(), Error> {
    let change_feed = Arc::new(ChangeFeed::new(config.realtime_settings()));
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&change_feed)));

    match state.relay() {
        Ok(relay) if change_feed.is_enabled() => {
            change_feed.start(relay.clone())?;
        }
        Ok(_) => info!("Change feed disabled, relaying webhooks only"),
        Err(_) if change_feed.is_enabled() => {
            warn!("Change feed configured but push gateway is not, listener not started");
        }
        Err(_) => {}
    }

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;

    info!(address = %addr, "Push relay server started");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn change_event_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookSummary>, AppError> {
    authorize(&state.config, &headers)?;
    let relay = state.relay()?;
    let events = parse_delivery(&body)?;

    let request_id = Uuid::new_v4();
    let summary = relay
        .route_batch(&events)
        .instrument(info_span!("change_event_webhook", %request_id))
        .await;

    info!(
        request_id = %request_id,
        events = events.len(),
        attempted = summary.attempted,
        sent = summary.sent,
        failed = summary.failed,
        skipped = summary.skipped,
        "Webhook delivery handled"
    );

    Ok(Json(summary))
}

async fn send_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    authorize(&state.config, &headers)?;
    let relay = state.relay()?;
    let notification = SendNotificationRequest::parse(&body)?;

    let result = relay
        .gateway()
        .send(PushMessage {
            recipient_id: &notification.user_id,
            title: &notification.title,
            body: &notification.body,
            data: notification.data,
            collapse_id: None,
            idempotency_key: None,
        })
        .await;

    let status = if result.ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    Ok((
        status,
        Json(SendResponse {
            ok: result.ok,
            result,
        }),
    )
        .into_response())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all(&state.change_feed);

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Accepts `Authorization: Bearer <secret>` or the `x-webhook-token` header.
/// Open when no secret is configured.
fn authorize(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = config.webhook_secret() else {
        return Ok(());
    };

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let token = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    let bearer_ok = bearer.is_some_and(|v| secrets_match(v, secret));
    let token_ok = token.is_some_and(|v| secrets_match(v, secret));

    if bearer_ok || token_ok {
        Ok(())
    } else {
        warn!("Rejected request with missing or invalid webhook secret");
        Err(AppError::Unauthorized)
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());

    AppError::Internal(anyhow!("Unexpected error: {}", detail)).into_response()
}
