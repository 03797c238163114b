//! Real-time auction delivery server.
//!
//! Accepts WebSocket subscribers, fans out bid updates per auction room, and
//! unicasts personal notifications to identified users.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gavel-server
//! cargo run --bin gavel-server -- --host 0.0.0.0 --port 3000
//! ```

use std::time::Duration;

use clap::Parser;

use gavel_server::{ServerConfig, run_server};
use gavel_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "gavel-server")]
#[command(about = "Real-time auction delivery server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Heartbeat timeout in seconds before a silent connection is evicted
    #[arg(long, default_value = "60")]
    heartbeat_timeout_secs: u64,

    /// Period in seconds between liveness sweeps
    #[arg(long, default_value = "30")]
    sweep_period_secs: u64,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        heartbeat_timeout: Duration::from_secs(args.heartbeat_timeout_secs),
        sweep_period: Duration::from_secs(args.sweep_period_secs),
    };

    if let Err(e) = run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
