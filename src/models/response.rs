use serde::Serialize;

use crate::models::outcome::{RecipientOutcome, RouteResult};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: String) -> Self {
        Self { ok: false, error }
    }
}

/// Aggregated result of one webhook delivery, which may carry several events.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookSummary {
    pub ok: bool,
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub events: Vec<RouteResult>,
}

impl WebhookSummary {
    pub fn from_results(events: Vec<RouteResult>) -> Self {
        let mut attempted = 0;
        let mut sent = 0;
        let mut skipped = 0;

        for event in &events {
            match event.outcomes() {
                Some(outcomes) => {
                    attempted += outcomes.len();
                    sent += outcomes.iter().filter(|o| o.ok).count();
                }
                None => skipped += 1,
            }
        }

        let failed = attempted - sent;

        Self {
            ok: failed == 0,
            attempted,
            sent,
            failed,
            skipped,
            events,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    pub ok: bool,
    pub result: RecipientOutcome,
}
