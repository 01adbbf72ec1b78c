use anyhow::{Error, Result, anyhow};
use push_relay::{api::run_api_server, config::Config, utils::init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;

    init_tracing(config.log_json);

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install TLS crypto provider"))?;

    info!("Configuration loaded. Relay is ready to start.");

    run_api_server(config).await
}
