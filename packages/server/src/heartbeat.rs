//! Periodic liveness sweep.
//!
//! One task for the whole process, independent of per-connection tasks. It
//! only ever evicts; it never creates rooms or touches subscriptions beyond
//! the removal implied by eviction.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use gavel_shared::time::Clock;

use crate::registry::ConnectionRegistry;

/// Spawn the heartbeat monitor. Every `period`, connections whose last
/// heartbeat is older than `timeout` are evicted (and thereby removed from
/// their room). The returned handle is aborted on server shutdown.
pub fn spawn_heartbeat_monitor(
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
    period: Duration,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; a sweep at startup is pointless.
        interval.tick().await;

        loop {
            interval.tick().await;
            let evicted = registry
                .sweep(clock.now_millis(), timeout.as_millis() as i64)
                .await;
            if !evicted.is_empty() {
                tracing::info!("Heartbeat sweep evicted {} connection(s)", evicted.len());
            }
        }
    })
}
