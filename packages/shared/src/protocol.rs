//! Wire protocol for the auction WebSocket channel.
//!
//! Every frame is a JSON envelope whose `type` field is the sole dispatch
//! key. Both directions are modeled as tagged unions so handling is an
//! exhaustive `match`; frames that fail to parse (missing or unknown `type`,
//! malformed payload) are logged and dropped by the receiving side, never
//! treated as fatal.

use serde::{Deserialize, Serialize};

/// Stable identifier of an auction listing, supplied by the listing service.
pub type ListingId = u64;

/// Stable identifier of a user, supplied by the auth collaborator.
pub type UserId = u64;

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Tag this connection with a user identifier for targeted notifications.
    /// Identity is only ever set this way, never inferred by the server.
    IdentifyUser { user_id: UserId },
    /// Subscribe to live updates for one auction. A connection subscribes to
    /// at most one auction; joining a new one implicitly leaves the prior.
    JoinAuction {
        listing_id: ListingId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },
    /// Unsubscribe from the current auction, if any.
    LeaveAuction,
    /// Liveness signal. Clients must send this at [`crate::heartbeat::CLIENT_PING_INTERVAL`]
    /// or faster to avoid eviction.
    Ping,
}

/// Messages the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges the channel is open.
    Connected,
    /// Confirms a subscription and reports the room size.
    JoinedAuction {
        listing_id: ListingId,
        data: JoinedAuctionData,
    },
    /// A validated bid was accepted for the subscribed auction.
    BidUpdate {
        listing_id: ListingId,
        data: BidUpdateData,
        timestamp: i64,
    },
    /// Terminal event for an auction room.
    AuctionEnded {
        listing_id: ListingId,
        data: AuctionSummary,
        timestamp: i64,
    },
    /// Closing-minute mode toggle for UI emphasis.
    HotAuctionMode {
        listing_id: ListingId,
        data: HotModeData,
    },
    /// Personal alert addressed to one user. Clients filter by their own
    /// identity before displaying.
    Notification {
        data: NotificationPayload,
        timestamp: i64,
    },
    /// Heartbeat acknowledgment. Clients do not reset their ping timer on it.
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedAuctionData {
    pub participant_count: usize,
}

/// A committed bid as reported by the bidding module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRecord {
    pub id: u64,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidUpdateData {
    pub bid: BidRecord,
    /// Running bid count after this bid.
    pub bid_count: u32,
    /// Per-listing monotonic sequence number. Deltas arriving with a `seq`
    /// not greater than the last merged one are stale and must be ignored.
    pub seq: u64,
}

/// Winner-agnostic summary carried by `auction_ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<u64>,
    pub bid_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotModeData {
    pub is_hot: bool,
}

/// Payload produced by the (out-of-scope) notification generator, addressed
/// to a single user across all of their live sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub user_id: UserId,
    /// Machine-readable category, e.g. `"outbid"`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<ListingId>,
    pub message: String,
}
