use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Real-time notification payloads, tagged the way subscribers see them.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AuctionEvent {
    /// An accepted bid raised the highest value.
    BidUpdate {
        auction_id: i64,
        new_highest_bid: Decimal,
        bidder_id: i64,
        bidder_name: String,
        time_left: i64,
        time_left_formatted: String,
        total_bids: i64,
        timestamp: DateTime<Utc>,
    },
    /// Auction-level snapshot emitted alongside every accepted bid.
    AuctionUpdate {
        auction_id: i64,
        name: String,
        current_highest_bid: Decimal,
        time_left: i64,
        time_left_formatted: String,
        total_bids: i64,
        is_expired: bool,
    },
    /// A new auction opened for bidding.
    NewAuction {
        auction_id: i64,
        name: String,
        description: String,
        starting_price: Decimal,
        auction_end_time: DateTime<Utc>,
        time_left: i64,
        time_left_formatted: String,
    },
    /// The auction transitioned Active -> Expired. Emitted exactly once.
    AuctionExpired { auction_id: i64 },
}

impl AuctionEvent {
    /// Topic key; all events for one auction share a key, which keeps
    /// per-auction delivery ordered.
    pub fn auction_id(&self) -> i64 {
        match self {
            AuctionEvent::BidUpdate { auction_id, .. }
            | AuctionEvent::AuctionUpdate { auction_id, .. }
            | AuctionEvent::NewAuction { auction_id, .. }
            | AuctionEvent::AuctionExpired { auction_id } => *auction_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_wire_tags() {
        let event = AuctionEvent::AuctionExpired { auction_id: 7 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "auctionExpired");
        assert_eq!(value["auctionId"], 7);
    }

    #[test]
    fn bid_update_uses_camel_case_fields() {
        let event = AuctionEvent::BidUpdate {
            auction_id: 1,
            new_highest_bid: Decimal::from(150),
            bidder_id: 4,
            bidder_name: "User4 Smith4".to_string(),
            time_left: 90,
            time_left_formatted: "1m 30s".to_string(),
            total_bids: 2,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "bidUpdate");
        assert_eq!(value["newHighestBid"], serde_json::json!("150"));
        assert_eq!(value["bidderName"], "User4 Smith4");
        assert_eq!(value["totalBids"], 2);
    }
}
