use serde_json::{Map, Value};

use crate::utils::{first_text, scalar_to_string};

/// Tables whose inserts are turned into push notifications. Anything else is
/// ignored by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownTable {
    Messages,
    WorkoutAssignments,
    MealAssignments,
    MealPlanAssignments,
}

/// Title, body and client payload derived from a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub title: String,
    pub body: String,
    pub metadata: Map<String, Value>,
}

impl KnownTable {
    pub const ALL: [KnownTable; 4] = [
        KnownTable::Messages,
        KnownTable::WorkoutAssignments,
        KnownTable::MealAssignments,
        KnownTable::MealPlanAssignments,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KnownTable::Messages => "messages",
            KnownTable::WorkoutAssignments => "workout_assignments",
            KnownTable::MealAssignments => "meal_assignments",
            KnownTable::MealPlanAssignments => "meal_plan_assignments",
        }
    }

    /// Columns that may hold the id of the user to notify.
    pub fn recipient_keys(&self) -> &'static [&'static str] {
        match self {
            KnownTable::Messages => &["receiver_id", "user_id", "client_id"],
            KnownTable::WorkoutAssignments => &["user_id", "client_id"],
            KnownTable::MealAssignments | KnownTable::MealPlanAssignments => {
                &["client_id", "user_id"]
            }
        }
    }

    /// Value of `data.type` seen by the client app.
    pub fn notification_type(&self) -> &'static str {
        match self {
            KnownTable::Messages => "chat_message",
            KnownTable::WorkoutAssignments => "workout_assignment",
            KnownTable::MealAssignments => "meal_assignment",
            KnownTable::MealPlanAssignments => "meal_plan_assignment",
        }
    }

    fn metadata_keys(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            KnownTable::Messages => &[("chat_id", "chat_id"), ("sender_id", "sender_id")],
            KnownTable::WorkoutAssignments => &[
                ("workout_plan_id", "workout_plan_id"),
                ("assigned_at", "assigned_at"),
            ],
            KnownTable::MealAssignments => {
                &[("meal_id", "meal_id"), ("assigned_at", "assigned_at")]
            }
            KnownTable::MealPlanAssignments => &[
                ("meal_plan_id", "meal_plan_id"),
                ("assigned_at", "assigned_at"),
            ],
        }
    }

    pub fn compose(&self, record: &Map<String, Value>) -> Content {
        let (title, body) = match self {
            KnownTable::Messages => (
                first_text(record, &["sender_name", "sender"])
                    .unwrap_or_else(|| "New message".to_string()),
                first_text(record, &["content", "text", "message"])
                    .unwrap_or_else(|| "You have a new message".to_string()),
            ),
            KnownTable::WorkoutAssignments => (
                "New workout assigned".to_string(),
                first_text(record, &["title", "workout_name"])
                    .unwrap_or_else(|| "A new workout was assigned to you.".to_string()),
            ),
            KnownTable::MealAssignments => (
                "New meal assigned".to_string(),
                first_text(record, &["title", "meal_name"])
                    .unwrap_or_else(|| "A new meal was assigned to you.".to_string()),
            ),
            KnownTable::MealPlanAssignments => (
                "New meal plan".to_string(),
                first_text(record, &["title"])
                    .unwrap_or_else(|| "You have a new meal plan.".to_string()),
            ),
        };

        let row_id = record
            .get("id")
            .and_then(scalar_to_string)
            .map(Value::String)
            .unwrap_or(Value::Null);

        let mut metadata = Map::new();
        metadata.insert("type".to_string(), Value::from(self.notification_type()));
        metadata.insert("table".to_string(), Value::from(self.as_str()));
        if *self == KnownTable::Messages {
            metadata.insert("message_id".to_string(), row_id.clone());
        }
        metadata.insert("id".to_string(), row_id);

        for (name, column) in self.metadata_keys() {
            let value = record.get(*column).cloned().unwrap_or(Value::Null);
            metadata.insert(name.to_string(), value);
        }

        Content {
            title,
            body,
            metadata,
        }
    }
}
