use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct OneSignalRequest {
    pub app_id: String,
    pub target_channel: &'static str,
    pub include_aliases: IncludeAliases,
    pub headings: BTreeMap<String, String>,
    pub contents: BTreeMap<String, String>,
    pub data: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncludeAliases {
    pub external_id: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OneSignalResponse {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub errors: Option<Value>,
}

impl OneSignalResponse {
    pub fn notification_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// A 2xx reply can still carry targeting errors, e.g. when none of the
    /// aliases is subscribed. Without an id the push went nowhere.
    pub fn has_targeting_errors(&self) -> bool {
        let has_errors = match &self.errors {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(fields)) => !fields.is_empty(),
            Some(_) => true,
        };

        has_errors && self.notification_id().is_none()
    }
}
