//! Real-time delivery server for live auctions.
//!
//! Fans auction-scoped events (bids, end-of-auction, closing-minute mode)
//! out to every subscriber of a room, and unicasts personal alerts to a
//! user's live sessions. Bid validation, persistence, and identity
//! resolution live in other services; this crate only moves already
//! validated facts to subscribers.

mod handler;
pub mod heartbeat;
pub mod hub;
pub mod registry;
mod runner;
mod signal;
pub mod state;

pub use runner::{ServerConfig, build_router, run_server};
