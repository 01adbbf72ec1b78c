use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    clients::onesignal::OneSignalClient,
    models::{
        event::ChangeEvent,
        intent::{NotificationIntent, collapse_key, idempotency_key},
        outcome::{RouteResult, SkipReason},
        response::WebhookSummary,
        table::KnownTable,
    },
    utils::scalar_to_string,
};

/// Turns change events into push notifications. Holds no state besides the
/// gateway client, so it is cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct Relay {
    gateway: OneSignalClient,
}

impl Relay {
    pub fn new(gateway: OneSignalClient) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &OneSignalClient {
        &self.gateway
    }

    pub async fn route_event(&self, event: &ChangeEvent) -> RouteResult {
        let intent = match build_intent(event, Utc::now()) {
            Ok(intent) => intent,
            Err(reason) => {
                debug!(
                    table = %event.table,
                    event_type = ?event.event_type,
                    reason = %reason,
                    "Change event skipped"
                );
                return RouteResult::skipped(&event.table, reason);
            }
        };

        let sends = intent
            .recipient_ids
            .iter()
            .map(|recipient_id| self.gateway.deliver(recipient_id, &intent));
        let results = join_all(sends).await;

        info!(
            table = intent.table.as_str(),
            collapse_key = %intent.collapse_key,
            attempted = results.len(),
            sent = results.iter().filter(|r| r.ok).count(),
            "Change event relayed"
        );

        RouteResult::Dispatched {
            table: intent.table.as_str().to_string(),
            collapse_key: intent.collapse_key,
            idempotency_key: intent.idempotency_key,
            results,
        }
    }

    /// Routes every event of one delivery concurrently, keeping input order in
    /// the summary.
    pub async fn route_batch(&self, events: &[ChangeEvent]) -> WebhookSummary {
        let results = join_all(events.iter().map(|event| self.route_event(event))).await;
        WebhookSummary::from_results(results)
    }
}

/// Derives the notification for an event without touching the network.
///
/// `received_at` stands in for the commit timestamp when the sender did not
/// provide one.
pub fn build_intent(
    event: &ChangeEvent,
    received_at: DateTime<Utc>,
) -> Result<NotificationIntent, SkipReason> {
    if !event.is_insert() {
        return Err(SkipReason::NotInsert);
    }

    let table = KnownTable::from_name(&event.table).ok_or(SkipReason::UnknownTable)?;

    let recipient_ids = extract_recipients(&event.record, table.recipient_keys());
    if recipient_ids.is_empty() {
        return Err(SkipReason::NoRecipients);
    }

    let content = table.compose(&event.record);

    let row_id = event.row_id();
    let timestamp = event
        .commit_timestamp
        .as_deref()
        .map(str::trim)
        .filter(|ts| !ts.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| received_at.timestamp_millis().to_string());

    Ok(NotificationIntent {
        table,
        recipient_ids,
        title: content.title,
        body: content.body,
        metadata: content.metadata,
        collapse_key: collapse_key(table, row_id.as_deref()),
        idempotency_key: idempotency_key(table, row_id.as_deref(), &timestamp),
    })
}

/// Collects every usable id found under `candidate_keys`. A column may hold a
/// single id or an array of ids.
pub fn extract_recipients(
    record: &Map<String, Value>,
    candidate_keys: &[&str],
) -> BTreeSet<String> {
    let mut recipients = BTreeSet::new();

    for key in candidate_keys {
        match record.get(*key) {
            Some(Value::Array(items)) => {
                recipients.extend(items.iter().filter_map(scalar_to_string));
            }
            Some(value) => recipients.extend(scalar_to_string(value)),
            None => {}
        }
    }

    recipients
}
