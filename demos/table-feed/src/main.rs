//! Runs one table feed against a live gateway.
//!
//! Configuration comes from the environment:
//!
//! - `FELTWIRE_ENDPOINT` — gateway WebSocket URL (required)
//! - `FELTWIRE_TOKEN` — login token (required)
//! - `FELTWIRE_SESSION_KEY` — key the gateway expects tokens sealed with (required)
//! - `FELTWIRE_TABLE_ID` — table to watch (required)
//! - `FELTWIRE_SINK` — sink WebSocket URL for snapshot pushes (required)
//! - `RUST_LOG` — log filter, defaults to `info`
//!
//! ```sh
//! FELTWIRE_ENDPOINT=wss://gateway.example.com/ws \
//! FELTWIRE_TOKEN=... FELTWIRE_SESSION_KEY=... \
//! FELTWIRE_TABLE_ID=30001 FELTWIRE_SINK=ws://127.0.0.1:9000 \
//! cargo run -p table-feed
//! ```

use std::env;
use std::error::Error;

use feltwire::prelude::*;
use tracing_subscriber::EnvFilter;

fn required(name: &str) -> Result<String, Box<dyn Error>> {
    env::var(name).map_err(|_| format!("{name} must be set").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let table_id: i64 = required("FELTWIRE_TABLE_ID")?.parse()?;
    let profile = VendorProfile {
        endpoint: required("FELTWIRE_ENDPOINT")?,
        token: required("FELTWIRE_TOKEN")?,
        session_key: required("FELTWIRE_SESSION_KEY")?,
        table_id,
        ..VendorProfile::default()
    };

    let client = TableFeedClient::connect(FeedConfig::new(profile, required("FELTWIRE_SINK")?))?;
    client.enter_table(table_id, "").await?;
    tracing::info!(table_id, "feed running, ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    client.shutdown().await;
    Ok(())
}
