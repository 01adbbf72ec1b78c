use std::fmt::{Display, Formatter, Result};

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotInsert,
    UnknownTable,
    NoRecipients,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            SkipReason::NotInsert => write!(f, "Only INSERT events are relayed"),
            SkipReason::UnknownTable => write!(f, "Table is not routed to push notifications"),
            SkipReason::NoRecipients => write!(f, "No target user id in allowed columns"),
        }
    }
}

/// Delivery outcome for a single recipient of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    pub recipient_id: String,
    pub ok: bool,
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl RecipientOutcome {
    pub fn sent(recipient_id: String, status: u16, id: Option<String>) -> Self {
        Self {
            recipient_id,
            ok: true,
            status: Some(status),
            id,
            errors: None,
        }
    }

    pub fn failed(recipient_id: String, status: Option<u16>, errors: Value) -> Self {
        Self {
            recipient_id,
            ok: false,
            status,
            id: None,
            errors: Some(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RouteResult {
    Skipped {
        table: String,
        reason: SkipReason,
        message: String,
    },
    Dispatched {
        table: String,
        collapse_key: String,
        idempotency_key: String,
        results: Vec<RecipientOutcome>,
    },
}

impl RouteResult {
    pub fn skipped(table: &str, reason: SkipReason) -> Self {
        RouteResult::Skipped {
            table: table.to_string(),
            reason,
            message: reason.to_string(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RouteResult::Skipped { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            RouteResult::Skipped { reason, .. } => Some(*reason),
            RouteResult::Dispatched { .. } => None,
        }
    }

    pub fn outcomes(&self) -> Option<&[RecipientOutcome]> {
        match self {
            RouteResult::Skipped { .. } => None,
            RouteResult::Dispatched { results, .. } => Some(results),
        }
    }
}
