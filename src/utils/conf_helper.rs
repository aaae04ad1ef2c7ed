use anyhow::Context;
use std::sync::OnceLock;
use tokio::fs;
use tokio::net::TcpListener;
use tracing::info;

use crate::models::server_model::ServerConfig;

static CONFIG_CACHE: OnceLock<ServerConfig> = OnceLock::new();

const DEFAULT_CONFIG_PATH: &str = "droplet.json";

pub fn config_path() -> String {
    std::env::var("DROPLET_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub async fn init_config_and_bind() -> anyhow::Result<TcpListener> {
    let file_path = config_path();

    let data = fs::read_to_string(&file_path)
        .await
        .with_context(|| format!("reading config {}", file_path))?;

    let mut config: ServerConfig =
        serde_json::from_str(&data).with_context(|| format!("parsing config {}", file_path))?;

    let bind_addr = format!("{}:{}", config.connection.ip, config.connection.port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    let actual_port = listener.local_addr().context("reading bound address")?.port();

    // Port 0 asks the OS for one; report the real port from here on
    config.connection.port = actual_port;

    CONFIG_CACHE
        .set(config)
        .map_err(|_| anyhow::anyhow!("config already initialized"))?;

    info!("Config initialized with port: {}", actual_port);

    Ok(listener)
}

pub fn get_cached_config() -> &'static ServerConfig {
    CONFIG_CACHE.get().expect("Config not initialized")
}
