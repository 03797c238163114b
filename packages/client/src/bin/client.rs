//! Terminal watcher for live auctions.
//!
//! Connects to a Gavel delivery server, subscribes to an auction room, and
//! shows bid updates and personal notifications as they arrive.
//! Automatically reconnects with exponential backoff and re-joins the last
//! watched auction.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gavel-client -- --listing 42
//! cargo run --bin gavel-client -- --user-id 7 --listing 42
//! ```

use clap::Parser;

use gavel_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "gavel-client")]
#[command(about = "Terminal watcher for live auctions", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// User identifier for personal notifications (optional; viewers may
    /// stay anonymous)
    #[arg(long)]
    user_id: Option<u64>,

    /// Auction listing to watch from the start
    #[arg(short = 'l', long)]
    listing: Option<u64>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = gavel_client::run_client(args.url, args.user_id, args.listing).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
