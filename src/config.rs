use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub onesignal_app_id: Option<String>,
    pub onesignal_api_key: Option<String>,
    #[serde(default = "default_onesignal_api_url")]
    pub onesignal_api_url: String,
    #[serde(default = "default_push_locale")]
    pub push_locale: String,
    #[serde(default = "default_push_timeout_seconds")]
    pub push_timeout_seconds: u64,

    pub webhook_secret: Option<String>,

    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    #[serde(default = "default_realtime_schema")]
    pub realtime_schema: String,
    #[serde(default = "default_realtime_channel")]
    pub realtime_channel: String,
    #[serde(default = "default_realtime_heartbeat_seconds")]
    pub realtime_heartbeat_seconds: u64,
    #[serde(default = "default_realtime_reconnect_seconds")]
    pub realtime_reconnect_seconds: u64,

    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_log_json")]
    pub log_json: bool,
}

/// OneSignal credentials, present only when both values are configured.
#[derive(Clone, Debug)]
pub struct GatewayCredentials {
    pub app_id: String,
    pub api_key: String,
}

#[derive(Clone, Debug)]
pub struct RealtimeSettings {
    pub supabase_url: String,
    pub api_key: String,
    pub schema: String,
    pub channel: String,
    pub heartbeat_seconds: u64,
    pub reconnect_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    /// Builds a config from explicit `(NAME, value)` pairs, ignoring the process
    /// environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::from_iter::<_, Self>(vars.into_iter().map(|(k, v)| (k.into(), v.into())))
            .map_err(|e| anyhow!("Invalid configuration: {}", e))
    }

    pub fn gateway_credentials(&self) -> Result<GatewayCredentials, String> {
        let app_id = non_blank(&self.onesignal_app_id);
        let api_key = non_blank(&self.onesignal_api_key);

        match (app_id, api_key) {
            (Some(app_id), Some(api_key)) => Ok(GatewayCredentials {
                app_id: app_id.to_string(),
                api_key: api_key.to_string(),
            }),
            (None, None) => Err("ONESIGNAL_APP_ID, ONESIGNAL_API_KEY".to_string()),
            (None, Some(_)) => Err("ONESIGNAL_APP_ID".to_string()),
            (Some(_), None) => Err("ONESIGNAL_API_KEY".to_string()),
        }
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        non_blank(&self.webhook_secret)
    }

    pub fn realtime_settings(&self) -> Option<RealtimeSettings> {
        let supabase_url = non_blank(&self.supabase_url)?;
        let api_key = non_blank(&self.supabase_service_role_key)?;

        Some(RealtimeSettings {
            supabase_url: supabase_url.to_string(),
            api_key: api_key.to_string(),
            schema: self.realtime_schema.clone(),
            channel: self.realtime_channel.clone(),
            heartbeat_seconds: self.realtime_heartbeat_seconds.max(1),
            reconnect_seconds: self.realtime_reconnect_seconds.max(1),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn default_onesignal_api_url() -> String {
    "https://api.onesignal.com/notifications".to_string()
}

fn default_push_locale() -> String {
    "en".to_string()
}

fn default_push_timeout_seconds() -> u64 {
    10
}

fn default_realtime_schema() -> String {
    "public".to_string()
}

fn default_realtime_channel() -> String {
    "realtime-push".to_string()
}

fn default_realtime_heartbeat_seconds() -> u64 {
    25
}

fn default_realtime_reconnect_seconds() -> u64 {
    5
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_log_json() -> bool {
    true
}
