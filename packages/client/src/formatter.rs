//! Event formatting for terminal display.

use chrono::{TimeZone, Utc};

use gavel_shared::protocol::{AuctionSummary, ListingId, NotificationPayload};

use crate::manager::ConnectionQuality;

/// Formatter for terminal event lines.
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a subscription confirmation with the current room size.
    pub fn format_joined(listing_id: ListingId, participant_count: usize) -> String {
        format!(
            "\n* Watching auction {} ({} watching)\n",
            listing_id, participant_count
        )
    }

    /// Format an applied bid update.
    pub fn format_bid_update(
        listing_id: ListingId,
        amount: u64,
        bid_count: u32,
        is_hot: bool,
    ) -> String {
        let hot_marker = if is_hot { " [closing]" } else { "" };
        format!(
            "\n> Auction {}: bid {} ({} bids){}\n",
            listing_id, amount, bid_count, hot_marker
        )
    }

    /// Format the terminal event for an auction.
    pub fn format_auction_ended(listing_id: ListingId, summary: &AuctionSummary) -> String {
        match summary.final_amount {
            Some(amount) => format!(
                "\n# Auction {} ended at {} ({} bids)\n",
                listing_id, amount, summary.bid_count
            ),
            None => format!(
                "\n# Auction {} ended ({} bids)\n",
                listing_id, summary.bid_count
            ),
        }
    }

    /// Format a hot-mode transition.
    pub fn format_hot_mode(listing_id: ListingId, is_hot: bool) -> String {
        if is_hot {
            format!("\n! Auction {} is in its closing minute\n", listing_id)
        } else {
            format!("\n! Auction {} left closing-minute mode\n", listing_id)
        }
    }

    /// Format a personal notification.
    pub fn format_notification(payload: &NotificationPayload, received_at: i64) -> String {
        let timestamp = Self::format_timestamp(received_at);
        match payload.listing_id {
            Some(listing_id) => format!(
                "\n@ [{}] {} (auction {}) at {}\n",
                payload.kind, payload.message, listing_id, timestamp
            ),
            None => format!(
                "\n@ [{}] {} at {}\n",
                payload.kind, payload.message, timestamp
            ),
        }
    }

    /// Format a connectivity-quality transition. This is the only
    /// connection-level state the user ever sees; raw protocol errors stay
    /// in the logs.
    pub fn format_connection_status(quality: ConnectionQuality) -> String {
        match quality {
            ConnectionQuality::Connected => "\n~ Connected\n".to_string(),
            ConnectionQuality::Degraded => {
                "\n~ Connection lost, retrying (showing last known state)\n".to_string()
            }
            ConnectionQuality::Disconnected => "\n~ Disconnected\n".to_string(),
        }
    }

    fn format_timestamp(millis: i64) -> String {
        match Utc.timestamp_millis_opt(millis).single() {
            Some(dt) => dt.format("%H:%M:%S").to_string(),
            None => millis.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bid_update_marks_hot_auctions() {
        // given / when:
        let plain = MessageFormatter::format_bid_update(42, 150, 4, false);
        let hot = MessageFormatter::format_bid_update(42, 150, 4, true);

        // then:
        assert!(plain.contains("Auction 42"));
        assert!(plain.contains("150"));
        assert!(!plain.contains("[closing]"));
        assert!(hot.contains("[closing]"));
    }

    #[test]
    fn test_format_auction_ended_without_final_amount() {
        // given / when:
        let line = MessageFormatter::format_auction_ended(
            7,
            &AuctionSummary {
                final_amount: None,
                bid_count: 0,
            },
        );

        // then:
        assert!(line.contains("Auction 7 ended"));
        assert!(line.contains("0 bids"));
    }

    #[test]
    fn test_format_notification_includes_kind_and_listing() {
        // given:
        let payload = NotificationPayload {
            user_id: 7,
            kind: "outbid".to_string(),
            listing_id: Some(42),
            message: "You have been outbid".to_string(),
        };

        // when:
        let line = MessageFormatter::format_notification(&payload, 1_700_000_000_000);

        // then:
        assert!(line.contains("[outbid]"));
        assert!(line.contains("auction 42"));
        assert!(line.contains("You have been outbid"));
    }
}
