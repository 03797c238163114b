//! Shared types for the Gavel real-time auction delivery system.
//!
//! This crate holds everything the server and client agree on: the wire
//! protocol envelopes, the heartbeat timing contract, and the clock and
//! logging utilities both binaries use.

pub mod heartbeat;
pub mod logger;
pub mod protocol;
pub mod time;
