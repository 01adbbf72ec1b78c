use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::realtime::{ChangeFeed, FeedState},
    config::Config,
    models::health::{HealthCheckResponse, HealthStatus, ServiceHealth},
};

pub struct HealthChecker {
    config: Config,
}

impl HealthChecker {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn check_all(&self, change_feed: &ChangeFeed) -> HealthCheckResponse {
        let mut checks = BTreeMap::new();

        checks.insert("push_gateway".to_string(), self.check_gateway());
        checks.insert("change_feed".to_string(), self.check_change_feed(change_feed));

        HealthCheckResponse {
            status: determine_overall_status(&checks),
            timestamp: Utc::now(),
            checks,
        }
    }

    fn check_gateway(&self) -> ServiceHealth {
        match self.config.gateway_credentials() {
            Ok(_) => ServiceHealth::healthy(),
            Err(missing) => {
                warn!(missing = %missing, "Push gateway is not configured");
                ServiceHealth::unhealthy(format!("Missing configuration: {}", missing))
            }
        }
    }

    fn check_change_feed(&self, change_feed: &ChangeFeed) -> ServiceHealth {
        let state = change_feed.state();
        debug!(feed_state = ?state, "Change feed state checked");

        let health = match state {
            FeedState::Disabled | FeedState::Connected => ServiceHealth::healthy(),
            FeedState::Idle => ServiceHealth::degraded("Change feed not started".to_string()),
            FeedState::Connecting => {
                ServiceHealth::degraded("Change feed is not subscribed".to_string())
            }
        };

        health.with_state(state.as_str().to_string())
    }
}

fn determine_overall_status(checks: &BTreeMap<String, ServiceHealth>) -> HealthStatus {
    if checks
        .values()
        .any(|health| health.status == HealthStatus::Unhealthy)
    {
        HealthStatus::Unhealthy
    } else if checks
        .values()
        .any(|health| health.status == HealthStatus::Degraded)
    {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}
