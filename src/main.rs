//! Redis Log Forwarder Binary
//!
//! Standalone bootstrap for a single target: forwards one length-delimited
//! log stream to a Redis list until interrupted. Daemon integration calls the
//! library's [`Registry`] directly instead.

use clap::Parser;
use redis_log_forwarder::{Registry, Result, TargetInfo};
use std::collections::HashMap;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "redis-log-forwarder", version, about)]
struct Cli {
    /// Path to the stream of length-delimited log records (e.g. a FIFO)
    stream_path: String,

    /// Single Redis endpoint, host:port
    #[arg(long, env = "REDIS_ADDRESS")]
    redis_address: Option<String>,

    /// Comma-separated Sentinel addresses (high-availability mode)
    #[arg(long, env = "REDIS_SENTINELS")]
    redis_sentinels: Option<String>,

    /// Sentinel master group name
    #[arg(long, env = "REDIS_MASTER_NAME")]
    redis_master_name: Option<String>,

    #[arg(long, env = "REDIS_PASSWORD")]
    redis_password: Option<String>,

    /// Database index
    #[arg(long, env = "REDIS_DATABASE")]
    redis_database: Option<String>,

    /// Destination list key
    #[arg(long, env = "REDIS_LIST")]
    redis_list: String,

    /// Tag template, e.g. "{{.Name}}"
    #[arg(long)]
    tag: Option<String>,

    /// Container id recorded in every forwarded line
    #[arg(long, default_value = "standalone")]
    container_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    info!("Starting Redis log forwarder v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let stream_path = cli.stream_path.clone();
    let info = target_info(cli);

    let registry = Registry::new();
    if let Err(e) = registry.start(&stream_path, info).await {
        error!("Failed to start forwarding: {}", e);
        std::process::exit(1);
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(redis_log_forwarder::ForwarderError::Io)?;

    info!("Shutting down forwarder");
    registry.stop(&stream_path)?;
    Ok(())
}

/// Assemble the per-target info the daemon would normally supply.
fn target_info(cli: Cli) -> TargetInfo {
    let mut config = HashMap::new();
    config.insert("redis-list".to_string(), cli.redis_list);
    if let Some(address) = cli.redis_address {
        config.insert("redis-address".to_string(), address);
    }
    if let Some(sentinels) = cli.redis_sentinels {
        config.insert("redis-sentinels".to_string(), sentinels);
    }
    if let Some(master_name) = cli.redis_master_name {
        config.insert("redis-master-name".to_string(), master_name);
    }
    if let Some(password) = cli.redis_password {
        config.insert("redis-password".to_string(), password);
    }
    if let Some(database) = cli.redis_database {
        config.insert("redis-database".to_string(), database);
    }
    if let Some(tag) = cli.tag {
        config.insert("tag".to_string(), tag);
    }

    TargetInfo {
        container_id: cli.container_id,
        hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
        config,
        ..Default::default()
    }
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
