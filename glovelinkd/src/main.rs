//! Glovelink Daemon - Telemetry client for the gesture glove
//!
//! Connects to the glove's HTTP origin and keeps a live view of its
//! telemetry stream:
//! - WebSocket push channel with automatic reconnection
//! - HTTP polling fallback when the channel stays down
//! - Rolling aggregates (sample count, prediction rate, gesture history)
//!
//! Usage: glovelinkd [origin]   (defaults to http://127.0.0.1:8080)

use std::sync::Arc;

use tracing::info;

mod config;
mod manager;
mod sink;

use config::{ClientConfig, DEFAULT_ORIGIN};
use manager::ConnectionManager;
use sink::LogSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let origin = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
    let config = ClientConfig::from_origin(&origin)?;
    info!(
        channel = %config.channel_url,
        poll = %config.poll_url,
        "glovelink daemon starting"
    );

    let mut manager = ConnectionManager::new(config, Arc::new(LogSink));

    // Run until Ctrl-C; the manager reconnects forever on its own.
    tokio::select! {
        _ = manager.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    manager.shutdown();
    Ok(())
}
