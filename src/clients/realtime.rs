use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::{Error, Result, anyhow};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::{
    config::RealtimeSettings,
    models::realtime::{FeedFrame, PhoenixMessage},
    relay::Relay,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disabled,
    Idle,
    Connecting,
    Connected,
}

impl FeedState {
    pub fn as_str(&self) -> &str {
        match self {
            FeedState::Disabled => "disabled",
            FeedState::Idle => "idle",
            FeedState::Connecting => "connecting",
            FeedState::Connected => "connected",
        }
    }
}

/// Process-wide subscription to database inserts on the routed tables.
///
/// Created once during startup and shared through the application state.
/// `start` spawns the listener on its first call only.
pub struct ChangeFeed {
    settings: Option<RealtimeSettings>,
    started: AtomicBool,
    connected: Arc<AtomicBool>,
}

impl ChangeFeed {
    pub fn new(settings: Option<RealtimeSettings>) -> Self {
        Self {
            settings,
            started: AtomicBool::new(false),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    pub fn state(&self) -> FeedState {
        if self.settings.is_none() {
            FeedState::Disabled
        } else if !self.started.load(Ordering::SeqCst) {
            FeedState::Idle
        } else if self.connected.load(Ordering::SeqCst) {
            FeedState::Connected
        } else {
            FeedState::Connecting
        }
    }

    /// Returns `Ok(true)` when this call spawned the listener and `Ok(false)`
    /// when it was already running.
    pub fn start(&self, relay: Relay) -> Result<bool, Error> {
        let settings = self
            .settings
            .clone()
            .ok_or_else(|| anyhow!("Change feed is not configured"))?;

        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Change feed already started");
            return Ok(false);
        }

        let connected = Arc::clone(&self.connected);
        tokio::spawn(run(settings, relay, connected));

        info!("Change feed listener spawned");
        Ok(true)
    }
}

pub fn socket_url(settings: &RealtimeSettings) -> String {
    let base = settings.supabase_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };

    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        base, settings.api_key
    )
}

pub fn topic(settings: &RealtimeSettings) -> String {
    format!("realtime:{}", settings.channel)
}

async fn run(settings: RealtimeSettings, relay: Relay, connected: Arc<AtomicBool>) {
    loop {
        match session(&settings, &relay, &connected).await {
            Ok(()) => info!("Change feed connection closed"),
            Err(e) => error!(error = %e, "Change feed connection failed"),
        }

        connected.store(false, Ordering::SeqCst);

        debug!(
            delay_seconds = settings.reconnect_seconds,
            "Reconnecting change feed"
        );
        sleep(Duration::from_secs(settings.reconnect_seconds)).await;
    }
}

async fn session(
    settings: &RealtimeSettings,
    relay: &Relay,
    connected: &AtomicBool,
) -> Result<(), Error> {
    let (socket, _) = connect_async(socket_url(settings)).await?;
    let (mut sink, mut stream) = socket.split();

    let topic = topic(settings);
    let mut reference: u64 = 1;
    let join_ref = reference.to_string();

    let join = PhoenixMessage::join(&topic, &settings.schema, &settings.api_key, reference);
    sink.send(Message::Text(serde_json::to_string(&join)?.into()))
        .await?;

    info!(topic = %topic, schema = %settings.schema, "Joining change feed channel");

    let mut heartbeat = interval(Duration::from_secs(settings.heartbeat_seconds));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                reference += 1;
                let frame = PhoenixMessage::heartbeat(reference);
                sink.send(Message::Text(serde_json::to_string(&frame)?.into())).await?;
            }
            frame = stream.next() => {
                let text = match frame {
                    None | Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(_)) => continue,
                };

                let message = match serde_json::from_str::<PhoenixMessage>(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "Unreadable change feed frame");
                        continue;
                    }
                };

                match message.classify(&topic, &join_ref) {
                    FeedFrame::Joined => {
                        connected.store(true, Ordering::SeqCst);
                        info!(topic = %topic, "Change feed subscribed");
                    }
                    FeedFrame::JoinRejected(payload) => {
                        return Err(anyhow!("Change feed join rejected: {}", payload));
                    }
                    FeedFrame::Change(event) => {
                        let relay = relay.clone();
                        tokio::spawn(async move {
                            let result = relay.route_event(&event).await;
                            debug!(
                                table = %event.table,
                                result = ?result,
                                "Change feed event handled"
                            );
                        });
                    }
                    FeedFrame::Closed => return Ok(()),
                    FeedFrame::Other => {}
                }
            }
        }
    }
}
