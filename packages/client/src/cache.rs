//! Optimistic local cache of auction state.
//!
//! Deltas are merged field-by-field onto the structure the UI already reads,
//! so an update is visually indistinguishable from a fresh fetch: no refetch,
//! no flicker, and cached fields a delta does not mention stay untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gavel_shared::protocol::{AuctionSummary, ListingId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Live,
    Ended,
}

/// Last known full state of one listing, plus whatever other fields the
/// listing API populated; those ride along untouched by merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSnapshot {
    pub current_bid: u64,
    pub bid_count: u32,
    pub status: AuctionStatus,
    pub is_hot: bool,
    /// Sequence of the last merged bid delta, for staleness detection.
    pub last_seq: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ListingSnapshot {
    pub fn new(current_bid: u64, bid_count: u32) -> Self {
        Self {
            current_bid,
            bid_count,
            status: AuctionStatus::Live,
            is_hot: false,
            last_seq: 0,
            extra: serde_json::Map::new(),
        }
    }
}

/// Outcome of attempting a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The delta was newer than the cached state and was applied in place.
    Applied,
    /// The delta was stale (out-of-order arrival, e.g. across a reconnect)
    /// and was ignored.
    Stale,
}

/// Client-local cache of auction listings.
#[derive(Debug, Default)]
pub struct AuctionCache {
    entries: HashMap<ListingId, ListingSnapshot>,
}

impl AuctionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, listing_id: ListingId) -> Option<&ListingSnapshot> {
        self.entries.get(&listing_id)
    }

    /// Seed the cache with a full snapshot, e.g. from the listings API.
    pub fn insert(&mut self, listing_id: ListingId, snapshot: ListingSnapshot) {
        self.entries.insert(listing_id, snapshot);
    }

    /// Merge a bid delta. Only the bid amount, count, and sequence change;
    /// every other cached field is left as-is. A delta whose `seq` is not
    /// greater than the last merged one is stale and ignored.
    pub fn merge_bid_update(
        &mut self,
        listing_id: ListingId,
        amount: u64,
        bid_count: u32,
        seq: u64,
    ) -> MergeOutcome {
        match self.entries.get_mut(&listing_id) {
            Some(snapshot) => {
                if seq <= snapshot.last_seq {
                    tracing::debug!(
                        "Stale bid delta for listing {} (seq {} <= {})",
                        listing_id,
                        seq,
                        snapshot.last_seq
                    );
                    return MergeOutcome::Stale;
                }
                snapshot.current_bid = amount;
                snapshot.bid_count = bid_count;
                snapshot.last_seq = seq;
                MergeOutcome::Applied
            }
            None => {
                let mut snapshot = ListingSnapshot::new(amount, bid_count);
                snapshot.last_seq = seq;
                self.entries.insert(listing_id, snapshot);
                MergeOutcome::Applied
            }
        }
    }

    /// Mark a listing ended. Hot mode is cleared; a final amount in the
    /// summary is merged, everything else stays.
    pub fn merge_auction_end(&mut self, listing_id: ListingId, summary: &AuctionSummary) {
        let snapshot = self
            .entries
            .entry(listing_id)
            .or_insert_with(|| ListingSnapshot::new(summary.final_amount.unwrap_or(0), 0));
        snapshot.status = AuctionStatus::Ended;
        snapshot.is_hot = false;
        snapshot.bid_count = summary.bid_count;
        if let Some(final_amount) = summary.final_amount {
            snapshot.current_bid = final_amount;
        }
    }

    /// Flip the closing-minute flag on a cached listing, if present.
    pub fn set_hot(&mut self, listing_id: ListingId, is_hot: bool) {
        if let Some(snapshot) = self.entries.get_mut(&listing_id) {
            snapshot.is_hot = is_hot;
        }
    }
}
