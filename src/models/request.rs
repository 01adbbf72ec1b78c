use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(rename = "userId", alias = "user_id", default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Validated manual push.
#[derive(Debug, Clone)]
pub struct ManualNotification {
    pub title: String,
    pub body: String,
    pub user_id: String,
    pub data: Map<String, Value>,
}

impl SendNotificationRequest {
    pub fn parse(body: &[u8]) -> Result<ManualNotification, AppError> {
        let request: Self = serde_json::from_slice::<Value>(body)
            .map_err(|_| AppError::InvalidJson)
            .and_then(|value| {
                serde_json::from_value(value)
                    .map_err(|_| AppError::InvalidPayload("Invalid input".to_string()))
            })?;

        request.validate()
    }

    fn validate(self) -> Result<ManualNotification, AppError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        match (present(self.title), present(self.body), present(self.user_id)) {
            (Some(title), Some(body), Some(user_id)) => Ok(ManualNotification {
                title,
                body,
                user_id: user_id.trim().to_string(),
                data: self.data.unwrap_or_default(),
            }),
            _ => Err(AppError::InvalidPayload("Invalid input".to_string())),
        }
    }
}
