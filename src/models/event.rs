use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{error::AppError, utils::scalar_to_string};

pub const INSERT: &str = "INSERT";

/// A single row change as delivered by a database webhook or the realtime feed.
///
/// Both delivery paths use the same field names, with a few aliases accepted
/// for the variants some webhook senders emit (`eventType`, `new`, `old`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type", alias = "eventType", default)]
    pub event_type: Option<String>,

    pub table: String,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default, alias = "new", deserialize_with = "null_as_empty")]
    pub record: Map<String, Value>,

    #[serde(default, alias = "old")]
    pub old_record: Option<Value>,

    #[serde(default, alias = "commitTimestamp")]
    pub commit_timestamp: Option<String>,
}

impl ChangeEvent {
    pub fn insert(table: &str, record: Map<String, Value>) -> Self {
        Self {
            event_type: Some(INSERT.to_string()),
            table: table.to_string(),
            schema: Some("public".to_string()),
            record,
            old_record: None,
            commit_timestamp: None,
        }
    }

    pub fn with_commit_timestamp(mut self, commit_timestamp: &str) -> Self {
        self.commit_timestamp = Some(commit_timestamp.to_string());
        self
    }

    pub fn is_insert(&self) -> bool {
        self.event_type.as_deref() == Some(INSERT)
    }

    pub fn row_id(&self) -> Option<String> {
        self.record.get("id").and_then(scalar_to_string)
    }
}

/// Parses a webhook body holding either one event object or an array of them.
pub fn parse_delivery(body: &[u8]) -> Result<Vec<ChangeEvent>, AppError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| AppError::InvalidJson)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => {
            return Err(AppError::InvalidPayload(
                "Invalid event payload: expected an object or an array of objects".to_string(),
            ));
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<ChangeEvent>(item)
                .map_err(|e| AppError::InvalidPayload(format!("Invalid event payload: {}", e)))
        })
        .collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
