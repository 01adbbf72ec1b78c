use std::collections::BTreeSet;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::table::KnownTable;

/// What should be pushed for one change event. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationIntent {
    pub table: KnownTable,
    pub recipient_ids: BTreeSet<String>,
    pub title: String,
    pub body: String,
    pub metadata: Map<String, Value>,
    pub collapse_key: String,
    pub idempotency_key: String,
}

impl NotificationIntent {
    /// Gateway idempotency key for the request addressed to `recipient_id`.
    ///
    /// Each recipient gets its own request, so the event key alone would make
    /// the gateway drop every request after the first. The UUID is derived
    /// deterministically so a redelivered event maps to the same keys.
    pub fn recipient_idempotency_key(&self, recipient_id: &str) -> Uuid {
        let name = format!("{}:{}", self.idempotency_key, recipient_id);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }
}

pub fn collapse_key(table: KnownTable, row_id: Option<&str>) -> String {
    format!("{}_{}", table.as_str(), row_id.unwrap_or("new"))
}

pub fn idempotency_key(table: KnownTable, row_id: Option<&str>, timestamp: &str) -> String {
    format!("{}:{}:{}", table.as_str(), row_id.unwrap_or("new"), timestamp)
}
