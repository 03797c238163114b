//! Connection lifecycle state machine.
//!
//! One manager instance owns one outbound connection attempt at a time. It is
//! constructor-injected wherever it is needed rather than living in a process
//! global. Desired subscription state survives disconnects, which is what
//! makes silent re-join on reconnect possible: the server forgets room
//! membership the moment a connection dies, so the client carries it.

use std::time::Duration;

use gavel_shared::protocol::{ListingId, UserId};

use crate::backoff::{STABLE_CONNECTION_PERIOD, delay_for_attempt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// The only connectivity state surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    Connected,
    /// Between reconnect attempts: cached state is shown, retries are
    /// underway, no action required.
    Degraded,
    Disconnected,
}

/// What the client wants to be true of its connection, independent of
/// whether one currently exists. Replayed verbatim after every reconnect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub user_id: Option<UserId>,
    pub listing_id: Option<ListingId>,
}

pub struct ClientConnectionManager {
    url: String,
    state: ConnectionState,
    desired: DesiredState,
    consecutive_failures: u32,
}

impl ClientConnectionManager {
    pub fn new(url: String) -> Self {
        Self {
            url,
            state: ConnectionState::Disconnected,
            desired: DesiredState::default(),
            consecutive_failures: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn desired(&self) -> DesiredState {
        self.desired
    }

    /// Record the identity to present to the server. Effective immediately
    /// when connected (the caller sends `identify_user`), and replayed on
    /// every reconnect either way.
    pub fn set_identity(&mut self, user_id: UserId) {
        self.desired.user_id = Some(user_id);
    }

    /// Record the auction to be subscribed to. While disconnected this only
    /// updates desired state; the next session joins it automatically.
    pub fn request_join(&mut self, listing_id: ListingId) {
        self.desired.listing_id = Some(listing_id);
    }

    pub fn request_leave(&mut self) {
        self.desired.listing_id = None;
    }

    pub fn mark_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    pub fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
    }

    /// Record the end of a connection attempt. `connected_for` is how long
    /// the session stayed established, or `None` if the handshake never
    /// completed. A session that outlived the grace period resets the
    /// failure count, so the next delay starts from the minimum again.
    pub fn on_disconnected(&mut self, connected_for: Option<Duration>) {
        self.state = ConnectionState::Disconnected;
        if connected_for.is_some_and(|d| d >= STABLE_CONNECTION_PERIOD) {
            self.consecutive_failures = 0;
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Delay to wait before the next reconnect attempt.
    pub fn reconnect_delay(&self) -> Duration {
        delay_for_attempt(self.consecutive_failures)
    }

    pub fn quality(&self) -> ConnectionQuality {
        match self.state {
            ConnectionState::Connected => ConnectionQuality::Connected,
            _ if self.consecutive_failures > 0 => ConnectionQuality::Degraded,
            _ => ConnectionQuality::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::{RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY};

    fn manager() -> ClientConnectionManager {
        ClientConnectionManager::new("ws://127.0.0.1:8080/ws".to_string())
    }

    #[test]
    fn test_starts_disconnected_with_empty_desired_state() {
        // given / when:
        let manager = manager();

        // then:
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.desired(), DesiredState::default());
        assert_eq!(manager.quality(), ConnectionQuality::Disconnected);
    }

    #[test]
    fn test_requests_while_disconnected_are_queued_as_desired_state() {
        // given:
        let mut manager = manager();

        // when: join and identify are issued with no connection at all
        manager.set_identity(7);
        manager.request_join(42);

        // then: they are not dropped; the next session replays them
        assert_eq!(
            manager.desired(),
            DesiredState {
                user_id: Some(7),
                listing_id: Some(42),
            }
        );
    }

    #[test]
    fn test_request_leave_clears_the_subscription_only() {
        // given:
        let mut manager = manager();
        manager.set_identity(7);
        manager.request_join(42);

        // when:
        manager.request_leave();

        // then:
        assert_eq!(manager.desired().listing_id, None);
        assert_eq!(manager.desired().user_id, Some(7));
    }

    #[test]
    fn test_backoff_grows_across_consecutive_failures() {
        // given:
        let mut manager = manager();

        // when / then: each failed attempt waits at least as long as the last
        let mut previous = Duration::ZERO;
        for _ in 0..10 {
            manager.mark_connecting();
            manager.on_disconnected(None);
            let delay = manager.reconnect_delay();
            assert!(delay >= previous);
            assert!(delay <= RECONNECT_MAX_DELAY);
            previous = delay;
        }
        assert_eq!(previous, RECONNECT_MAX_DELAY);
    }

    #[test]
    fn test_stable_session_resets_backoff_to_minimum() {
        // given: a pile of failures driving the delay to the cap
        let mut manager = manager();
        for _ in 0..10 {
            manager.on_disconnected(None);
        }
        assert_eq!(manager.reconnect_delay(), RECONNECT_MAX_DELAY);

        // when: a session survives past the grace period, then drops
        manager.mark_connecting();
        manager.mark_connected();
        manager.on_disconnected(Some(STABLE_CONNECTION_PERIOD));

        // then: the next delay is back at the minimum
        assert_eq!(manager.reconnect_delay(), RECONNECT_BASE_DELAY);
    }

    #[test]
    fn test_short_session_does_not_reset_backoff() {
        // given:
        let mut manager = manager();
        manager.on_disconnected(None);
        manager.on_disconnected(None);
        let before = manager.reconnect_delay();

        // when: a session connects but dies inside the grace period
        manager.mark_connected();
        manager.on_disconnected(Some(Duration::from_secs(1)));

        // then: the delay keeps growing
        assert!(manager.reconnect_delay() > before);
    }

    #[test]
    fn test_quality_reflects_the_state_machine() {
        // given:
        let mut manager = manager();

        // when / then:
        manager.mark_connecting();
        manager.mark_connected();
        assert_eq!(manager.quality(), ConnectionQuality::Connected);

        manager.on_disconnected(Some(Duration::from_secs(1)));
        assert_eq!(manager.quality(), ConnectionQuality::Degraded);
    }
}
