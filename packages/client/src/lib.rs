//! Terminal client for the Gavel real-time auction delivery system.
//!
//! Owns one outbound connection at a time, reconnects with exponential
//! backoff, replays its desired subscription and identity after every
//! reconnect, and merges incremental bid updates into a local cache without
//! refetching.

pub mod backoff;
pub mod cache;
pub mod dispatch;
pub mod error;
pub mod formatter;
pub mod manager;
pub mod prompt;
mod runner;
pub mod session;
pub mod ui;

pub use runner::run_client;
