use std::{collections::BTreeMap, time::Duration};

use anyhow::anyhow;
use reqwest::{Client, header};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::AppError,
    models::{
        intent::NotificationIntent,
        onesignal::{IncludeAliases, OneSignalRequest, OneSignalResponse},
        outcome::RecipientOutcome,
    },
};

/// A single push addressed to one external user id.
#[derive(Debug, Clone)]
pub struct PushMessage<'a> {
    pub recipient_id: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub data: Map<String, Value>,
    pub collapse_id: Option<String>,
    pub idempotency_key: Option<uuid::Uuid>,
}

#[derive(Clone)]
pub struct OneSignalClient {
    http_client: Client,
    api_url: String,
    app_id: String,
    api_key: String,
    locale: String,
}

impl OneSignalClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let credentials = config
            .gateway_credentials()
            .map_err(AppError::MissingConfiguration)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.push_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to create HTTP client: {}", e)))?;

        info!(api_url = %config.onesignal_api_url, "OneSignal client initialized");

        Ok(Self {
            http_client,
            api_url: config.onesignal_api_url.clone(),
            app_id: credentials.app_id,
            api_key: credentials.api_key,
            locale: config.push_locale.clone(),
        })
    }

    pub async fn deliver(
        &self,
        recipient_id: &str,
        intent: &NotificationIntent,
    ) -> RecipientOutcome {
        let message = PushMessage {
            recipient_id,
            title: &intent.title,
            body: &intent.body,
            data: intent.metadata.clone(),
            collapse_id: Some(intent.collapse_key.clone()),
            idempotency_key: Some(intent.recipient_idempotency_key(recipient_id)),
        };

        self.send(message).await
    }

    /// Issues exactly one request to the gateway. Every failure mode ends up
    /// in the returned outcome.
    pub async fn send(&self, message: PushMessage<'_>) -> RecipientOutcome {
        let recipient_id = message.recipient_id.to_string();

        debug!(
            recipient_id = %recipient_id,
            collapse_id = ?message.collapse_id,
            "Sending OneSignal push notification"
        );

        let request = self.build_request(message);

        let response = match self
            .http_client
            .post(&self.api_url)
            .header(header::AUTHORIZATION, format!("Key {}", self.api_key))
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(recipient_id = %recipient_id, error = %e, "OneSignal request failed");
                return RecipientOutcome::failed(recipient_id, None, Value::String(e.to_string()));
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let raw: Value = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text));
        let parsed: OneSignalResponse = serde_json::from_value(raw.clone()).unwrap_or_default();

        if !status.is_success() || parsed.has_targeting_errors() {
            warn!(
                recipient_id = %recipient_id,
                status = status.as_u16(),
                errors = %raw,
                "OneSignal rejected push notification"
            );
            let errors = parsed.errors.clone().unwrap_or(raw);
            return RecipientOutcome::failed(recipient_id, Some(status.as_u16()), errors);
        }

        info!(
            recipient_id = %recipient_id,
            notification_id = ?parsed.notification_id(),
            "OneSignal push notification sent successfully"
        );

        RecipientOutcome::sent(
            recipient_id,
            status.as_u16(),
            parsed.notification_id().map(str::to_string),
        )
    }

    fn build_request(&self, message: PushMessage<'_>) -> OneSignalRequest {
        OneSignalRequest {
            app_id: self.app_id.clone(),
            target_channel: "push",
            include_aliases: IncludeAliases {
                external_id: vec![message.recipient_id.to_string()],
            },
            headings: BTreeMap::from([(self.locale.clone(), message.title.to_string())]),
            contents: BTreeMap::from([(self.locale.clone(), message.body.to_string())]),
            data: message.data,
            collapse_id: message.collapse_id,
            idempotency_key: message.idempotency_key,
        }
    }
}
