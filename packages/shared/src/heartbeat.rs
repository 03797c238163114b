//! Heartbeat timing contract between server and client.
//!
//! The server evicts any connection whose last `ping` is older than
//! [`SERVER_HEARTBEAT_TIMEOUT`]. The client therefore pings at half that
//! interval, so a single delayed or lost ping never causes a false eviction.
//! The server's `pong` reply does not reset the client's ping timer; the two
//! clocks are independent, so a slow acknowledgment never stalls the next
//! ping.

use std::time::Duration;

/// How long the server tolerates silence before evicting a connection.
pub const SERVER_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the server sweeps the registry for dead connections.
pub const HEARTBEAT_SWEEP_PERIOD: Duration = Duration::from_secs(30);

/// How often the client sends `ping`. Must stay strictly shorter than the
/// server timeout; half is the documented ratio.
pub const CLIENT_PING_INTERVAL: Duration = Duration::from_secs(30);
