use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::models::{event::ChangeEvent, table::KnownTable};

/// Phoenix channel frame, as spoken by the realtime websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,

    #[serde(default)]
    pub payload: Value,

    #[serde(rename = "ref", default)]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    Joined,
    JoinRejected(Value),
    Change(Box<ChangeEvent>),
    Closed,
    Other,
}

impl PhoenixMessage {
    pub fn join(topic: &str, schema: &str, access_token: &str, reference: u64) -> Self {
        let changes: Vec<Value> = KnownTable::ALL
            .iter()
            .map(|table| json!({ "event": "INSERT", "schema": schema, "table": table.as_str() }))
            .collect();

        Self {
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": changes,
                },
                "access_token": access_token,
            }),
            reference: Some(reference.to_string()),
            join_ref: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: None,
        }
    }

    pub fn classify(self, topic: &str, join_ref: &str) -> FeedFrame {
        if self.topic != topic {
            return FeedFrame::Other;
        }

        match self.event.as_str() {
            "phx_reply" if self.reference.as_deref() == Some(join_ref) => {
                if self.payload.get("status").and_then(Value::as_str) == Some("ok") {
                    FeedFrame::Joined
                } else {
                    FeedFrame::JoinRejected(self.payload)
                }
            }
            "postgres_changes" => match self.payload.get("data").cloned() {
                Some(data) => serde_json::from_value::<ChangeEvent>(data)
                    .map(|event| FeedFrame::Change(Box::new(event)))
                    .unwrap_or(FeedFrame::Other),
                None => FeedFrame::Other,
            },
            "phx_close" | "phx_error" => FeedFrame::Closed,
            _ => FeedFrame::Other,
        }
    }
}
