//! SSDB - Source Servers Discord Board
//!
//! Queries a configured list of Source engine game servers and keeps a
//! single Discord message up to date with their status.

mod common;
mod config;
mod discord;
mod monitor;
mod protocol;

use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter};

use config::{env::get_config_path, load_and_validate};
use discord::{DiscordSink, MessageStore, Publisher, Renderer};
use monitor::{Monitor, ServerPoller};
use protocol::QueryClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging. RUST_LOG wins; otherwise the level comes from the config.
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).is_ok();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("SSDB v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let settings = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    if !from_env {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&settings.log_level)) {
            warn!("Failed to apply logging.level: {}", e);
        }
    }

    info!("Configuration loaded successfully");
    info!("  Channel: {}", settings.channel_id);
    info!("  Servers: {}", settings.servers.len());
    info!(
        "  Interval: {}s, timeout: {}ms",
        settings.poll.interval.as_secs(),
        settings.poll.server_timeout.as_millis()
    );

    // ============================================================
    // Discord
    // ============================================================
    let sink = DiscordSink::connect(&settings.token, settings.channel_id)
        .await
        .map_err(|e| {
            error!("Discord token or channel is not usable: {}", e);
            e
        })?;

    let store = MessageStore::new(settings.publish.state_file.clone());
    match store.path() {
        Some(path) => info!("  State file: {}", path.display()),
        None => info!("  State file: disabled"),
    }
    let publisher = Publisher::new(sink, settings.channel_id, store, settings.publish.clone());

    // ============================================================
    // Monitor
    // ============================================================
    let poller = ServerPoller::new(
        QueryClient::new(settings.poll.query_players),
        settings.servers.clone(),
        &settings.poll,
    );
    let renderer = Renderer::new(settings.display.clone());
    let monitor = Monitor::new(poller, renderer, publisher, settings.poll.interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut monitor_task = tokio::spawn(monitor.run(shutdown_rx));

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping monitor...");
            true
        }
        result = &mut monitor_task => {
            if let Err(e) = result {
                error!("Monitor task panicked: {}", e);
            }
            false
        }
    };

    if shutdown {
        if shutdown_tx.send(true).is_err() {
            warn!("Monitor already exited");
        }
        match tokio::time::timeout(Duration::from_secs(5), monitor_task).await {
            Ok(Ok(())) => info!("Monitor stopped cleanly"),
            Ok(Err(e)) => warn!("Monitor task panicked: {}", e),
            Err(_) => warn!("Monitor did not stop in time"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
