//! Event fan-out: room broadcasts and user-targeted notifications.
//!
//! The hub is the in-process surface the bidding module and the auction
//! lifecycle scheduler call into. It never arbitrates bid ordering; upstream
//! serializes bids per listing before they reach [`AuctionPublisher::broadcast_bid_update`].

use std::sync::Arc;

use async_trait::async_trait;

use gavel_shared::protocol::{
    AuctionSummary, BidRecord, BidUpdateData, HotModeData, ListingId, NotificationPayload,
    ServerMessage, UserId,
};
use gavel_shared::time::Clock;

use crate::registry::{ConnectionId, ConnectionRegistry, OutboundSender};

/// Publishing seam for in-process collaborators. A cross-process pub/sub
/// backbone would implement this same trait.
#[async_trait]
pub trait AuctionPublisher: Send + Sync {
    /// Fan a validated, committed bid out to every subscriber of the listing.
    async fn broadcast_bid_update(&self, listing_id: ListingId, bid: BidRecord, bid_count: u32);

    /// Announce the terminal state of an auction to its subscribers.
    async fn broadcast_auction_end(&self, listing_id: ListingId, summary: AuctionSummary);

    /// Toggle closing-minute mode on a room and tell its subscribers.
    async fn set_hot_auction(&self, listing_id: ListingId, is_hot: bool);

    /// Unicast a personal alert to every live session of one user. Returns
    /// the number of sessions reached; zero live sessions is a silent no-op,
    /// durable delivery belongs to the notification store, not here.
    async fn notify_user(&self, user_id: UserId, payload: NotificationPayload) -> usize;
}

/// [`AuctionPublisher`] over the in-process connection registry.
pub struct AuctionHub {
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl AuctionHub {
    pub fn new(registry: Arc<ConnectionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// Write a serialized frame to each target; targets whose channel is gone
    /// are evicted through the registry rather than removed mid-iteration.
    async fn fan_out(&self, targets: Vec<(ConnectionId, OutboundSender)>, frame: &str) -> usize {
        let mut delivered = 0;
        let mut dead: Vec<ConnectionId> = Vec::new();

        for (id, sender) in targets {
            if sender.send(frame.to_string()).is_err() {
                tracing::warn!("Send to connection {} failed, scheduling eviction", id);
                dead.push(id);
            } else {
                delivered += 1;
            }
        }

        for id in dead {
            self.registry.unregister(id).await;
        }
        delivered
    }
}

#[async_trait]
impl AuctionPublisher for AuctionHub {
    async fn broadcast_bid_update(&self, listing_id: ListingId, bid: BidRecord, bid_count: u32) {
        // Nobody subscribed: nothing to do, not an error.
        let Some(members) = self.registry.room_snapshot(listing_id).await else {
            tracing::debug!("No room for auction {}, dropping bid update", listing_id);
            return;
        };

        let now = self.clock.now_millis();
        let seq = self.registry.next_bid_seq(listing_id, now).await;
        let msg = ServerMessage::BidUpdate {
            listing_id,
            data: BidUpdateData {
                bid,
                bid_count,
                seq,
            },
            timestamp: now,
        };
        let frame = serde_json::to_string(&msg).unwrap();

        let delivered = self.fan_out(members, &frame).await;
        tracing::info!(
            "Broadcast bid {} on auction {} to {} subscribers (seq {})",
            bid.id,
            listing_id,
            delivered,
            seq
        );
    }

    async fn broadcast_auction_end(&self, listing_id: ListingId, summary: AuctionSummary) {
        // The auction is over either way; the sequence counter goes with it.
        self.registry.clear_bid_seq(listing_id).await;

        let Some(members) = self.registry.room_snapshot(listing_id).await else {
            return;
        };

        let msg = ServerMessage::AuctionEnded {
            listing_id,
            data: summary,
            timestamp: self.clock.now_millis(),
        };
        let frame = serde_json::to_string(&msg).unwrap();

        let delivered = self.fan_out(members, &frame).await;
        tracing::info!(
            "Auction {} ended, notified {} subscribers",
            listing_id,
            delivered
        );
    }

    async fn set_hot_auction(&self, listing_id: ListingId, is_hot: bool) {
        if !self.registry.set_hot(listing_id, is_hot).await {
            return;
        }
        let Some(members) = self.registry.room_snapshot(listing_id).await else {
            return;
        };

        let msg = ServerMessage::HotAuctionMode {
            listing_id,
            data: HotModeData { is_hot },
        };
        let frame = serde_json::to_string(&msg).unwrap();

        self.fan_out(members, &frame).await;
        tracing::info!(
            "Auction {} hot mode {}",
            listing_id,
            if is_hot { "on" } else { "off" }
        );
    }

    async fn notify_user(&self, user_id: UserId, payload: NotificationPayload) -> usize {
        let sessions = self.registry.user_snapshot(user_id).await;
        if sessions.is_empty() {
            tracing::debug!("User {} has no live sessions, notification dropped", user_id);
            return 0;
        }

        let msg = ServerMessage::Notification {
            data: payload,
            timestamp: self.clock.now_millis(),
        };
        let frame = serde_json::to_string(&msg).unwrap();

        let delivered = self.fan_out(sessions, &frame).await;
        tracing::info!(
            "Notification delivered to {} session(s) of user {}",
            delivered,
            user_id
        );
        delivered
    }
}
