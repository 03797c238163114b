//! Routing of inbound server messages to local handlers.
//!
//! The dispatcher holds no state beyond the cache it merges into and the
//! display it writes to; routing is an exhaustive match over the tagged
//! message enum. Frames that fail to parse never reach it — the read loop
//! logs and drops them.

use gavel_shared::protocol::{NotificationPayload, ServerMessage, UserId};

use crate::cache::{AuctionCache, MergeOutcome};
use crate::formatter::MessageFormatter;

/// Where user-facing output goes. The terminal implementation lives in
/// [`crate::ui`]; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationDisplay {
    /// A personal alert addressed to this user.
    fn notification(&mut self, payload: &NotificationPayload);
    /// Any other formatted event line (bid updates, room confirmations,
    /// connectivity transitions).
    fn event(&mut self, line: String);
}

pub struct ClientMessageDispatcher<D: NotificationDisplay> {
    /// This client's own identity, for filtering targeted notifications.
    user_id: Option<UserId>,
    cache: AuctionCache,
    display: D,
}

impl<D: NotificationDisplay> ClientMessageDispatcher<D> {
    pub fn new(user_id: Option<UserId>, display: D) -> Self {
        Self {
            user_id,
            cache: AuctionCache::new(),
            display,
        }
    }

    /// Update the identity used for notification filtering, after a
    /// successful `identify_user`.
    pub fn set_identity(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    pub fn cache(&self) -> &AuctionCache {
        &self.cache
    }

    pub fn display(&mut self) -> &mut D {
        &mut self.display
    }

    /// Route one server message to its handler.
    pub fn dispatch(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Connected => {
                tracing::debug!("Channel open acknowledged");
            }
            ServerMessage::JoinedAuction { listing_id, data } => {
                self.display.event(MessageFormatter::format_joined(
                    listing_id,
                    data.participant_count,
                ));
            }
            ServerMessage::BidUpdate {
                listing_id, data, ..
            } => {
                let outcome = self.cache.merge_bid_update(
                    listing_id,
                    data.bid.amount,
                    data.bid_count,
                    data.seq,
                );
                if outcome == MergeOutcome::Applied {
                    let is_hot = self
                        .cache
                        .get(listing_id)
                        .is_some_and(|snapshot| snapshot.is_hot);
                    self.display.event(MessageFormatter::format_bid_update(
                        listing_id,
                        data.bid.amount,
                        data.bid_count,
                        is_hot,
                    ));
                }
            }
            ServerMessage::AuctionEnded {
                listing_id, data, ..
            } => {
                self.cache.merge_auction_end(listing_id, &data);
                self.display
                    .event(MessageFormatter::format_auction_ended(listing_id, &data));
            }
            ServerMessage::HotAuctionMode { listing_id, data } => {
                self.cache.set_hot(listing_id, data.is_hot);
                self.display
                    .event(MessageFormatter::format_hot_mode(listing_id, data.is_hot));
            }
            ServerMessage::Notification { data, timestamp } => {
                // Only alerts addressed to this client's own identity are
                // shown; anything else is noise from a shared channel.
                if self.user_id == Some(data.user_id) {
                    self.display
                        .event(MessageFormatter::format_notification(&data, timestamp));
                    self.display.notification(&data);
                } else {
                    tracing::debug!(
                        "Ignoring notification for user {:?} (we are {:?})",
                        data.user_id,
                        self.user_id
                    );
                }
            }
            ServerMessage::Pong => {
                // Liveness acknowledgment only; the ping timer is independent
                // of it by design.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_shared::protocol::{
        AuctionSummary, BidRecord, BidUpdateData, HotModeData, JoinedAuctionData,
    };
    use mockall::predicate::*;

    fn bid_update(listing_id: u64, amount: u64, bid_count: u32, seq: u64) -> ServerMessage {
        ServerMessage::BidUpdate {
            listing_id,
            data: BidUpdateData {
                bid: BidRecord {
                    id: seq,
                    amount,
                },
                bid_count,
                seq,
            },
            timestamp: 0,
        }
    }

    #[test]
    fn test_bid_update_is_merged_and_displayed() {
        // given:
        let mut display = MockNotificationDisplay::new();
        display.expect_event().times(1).return_const(());
        let mut dispatcher = ClientMessageDispatcher::new(None, display);

        // when:
        dispatcher.dispatch(bid_update(42, 150, 4, 1));

        // then:
        let snapshot = dispatcher.cache().get(42).unwrap();
        assert_eq!(snapshot.current_bid, 150);
        assert_eq!(snapshot.bid_count, 4);
    }

    #[test]
    fn test_stale_bid_update_is_not_displayed() {
        // given: seq 5 already applied
        let mut display = MockNotificationDisplay::new();
        display.expect_event().times(1).return_const(());
        let mut dispatcher = ClientMessageDispatcher::new(None, display);
        dispatcher.dispatch(bid_update(42, 150, 5, 5));

        // when: an older delta arrives after a reconnect
        dispatcher.dispatch(bid_update(42, 120, 4, 3));

        // then: cache unchanged, and the mock saw exactly one event line
        assert_eq!(dispatcher.cache().get(42).unwrap().current_bid, 150);
    }

    #[test]
    fn test_notification_for_this_user_is_shown() {
        // given:
        let payload = NotificationPayload {
            user_id: 7,
            kind: "outbid".to_string(),
            listing_id: Some(42),
            message: "You have been outbid".to_string(),
        };
        let mut display = MockNotificationDisplay::new();
        display.expect_event().times(1).return_const(());
        display
            .expect_notification()
            .with(eq(payload.clone()))
            .times(1)
            .return_const(());
        let mut dispatcher = ClientMessageDispatcher::new(Some(7), display);

        // when:
        dispatcher.dispatch(ServerMessage::Notification {
            data: payload,
            timestamp: 0,
        });

        // then: expectations on the mock
    }

    #[test]
    fn test_notification_for_another_user_is_filtered_out() {
        // given: we are user 7, the alert targets user 8
        let mut display = MockNotificationDisplay::new();
        display.expect_event().times(0);
        display.expect_notification().times(0);
        let mut dispatcher = ClientMessageDispatcher::new(Some(7), display);

        // when:
        dispatcher.dispatch(ServerMessage::Notification {
            data: NotificationPayload {
                user_id: 8,
                kind: "outbid".to_string(),
                listing_id: None,
                message: "not for us".to_string(),
            },
            timestamp: 0,
        });

        // then: expectations on the mock
    }

    #[test]
    fn test_unidentified_client_shows_no_notifications() {
        // given: no identity was ever set
        let mut display = MockNotificationDisplay::new();
        display.expect_notification().times(0);
        display.expect_event().times(0);
        let mut dispatcher = ClientMessageDispatcher::new(None, display);

        // when:
        dispatcher.dispatch(ServerMessage::Notification {
            data: NotificationPayload {
                user_id: 7,
                kind: "outbid".to_string(),
                listing_id: None,
                message: "anonymous session".to_string(),
            },
            timestamp: 0,
        });

        // then: expectations on the mock
    }

    #[test]
    fn test_hot_mode_then_bid_update_marks_the_line() {
        // given:
        let mut display = MockNotificationDisplay::new();
        display.expect_event().returning(|_| ());
        let mut dispatcher = ClientMessageDispatcher::new(None, display);
        dispatcher.dispatch(bid_update(42, 100, 1, 1));

        // when:
        dispatcher.dispatch(ServerMessage::HotAuctionMode {
            listing_id: 42,
            data: HotModeData { is_hot: true },
        });
        dispatcher.dispatch(bid_update(42, 120, 2, 2));

        // then:
        let snapshot = dispatcher.cache().get(42).unwrap();
        assert!(snapshot.is_hot);
        assert_eq!(snapshot.current_bid, 120);
    }

    #[test]
    fn test_auction_ended_updates_cache_terminally() {
        // given:
        let mut display = MockNotificationDisplay::new();
        display.expect_event().returning(|_| ());
        let mut dispatcher = ClientMessageDispatcher::new(None, display);
        dispatcher.dispatch(bid_update(42, 100, 1, 1));

        // when:
        dispatcher.dispatch(ServerMessage::AuctionEnded {
            listing_id: 42,
            data: AuctionSummary {
                final_amount: Some(100),
                bid_count: 1,
            },
            timestamp: 0,
        });

        // then:
        assert_eq!(
            dispatcher.cache().get(42).unwrap().status,
            crate::cache::AuctionStatus::Ended
        );
    }

    #[test]
    fn test_joined_confirmation_reaches_the_display() {
        // given:
        let mut display = MockNotificationDisplay::new();
        display
            .expect_event()
            .withf(|line: &String| line.contains("42") && line.contains("3"))
            .times(1)
            .return_const(());
        let mut dispatcher = ClientMessageDispatcher::new(None, display);

        // when:
        dispatcher.dispatch(ServerMessage::JoinedAuction {
            listing_id: 42,
            data: JoinedAuctionData {
                participant_count: 3,
            },
        });

        // then: expectations on the mock
    }
}
