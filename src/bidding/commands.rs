//! Bid arbitration: decides whether a submitted bid becomes the new
//! highest. The stored conditional update is the only serialization
//! point; no in-process lock is held across the store round-trip, so
//! arbitration stays correct with several service instances running.

// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::lifecycle;
use crate::auction::model::{self, Auction, Bid};
use crate::database::DatabaseManager;
use crate::error::AuctionError;
use crate::message_broker::Broadcaster;
use crate::store;
use crate::users::{self, User};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Command

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidCommand {
    #[serde(default)]
    pub auction_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
}

/// Accepted bid, as returned to the submitter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidReceipt {
    #[serde(flatten)]
    pub bid: Bid,
    pub bidder_name: String,
}

/// Result of the transactional part of a submission.
enum TxOutcome {
    Accepted {
        bid: Bid,
        bidder: User,
        auction: Auction,
        total_bids: i64,
    },
    /// The auction's end time passed but the row was still active; the
    /// caller runs the shared transition and reports `Expired`.
    LazilyExpired,
}

// endregion: --- Command

// region:    --- Arbitration

/// Submit a bid. Exactly one outcome: the receipt, or one of
/// `Validation` / `LimitExceeded` / `NotFound` / `Expired` / `Conflict`.
/// Lost races are never retried here; the caller may resubmit.
pub async fn place_bid(
    db: &DatabaseManager,
    broadcaster: &dyn Broadcaster,
    max_bid_amount: Decimal,
    cmd: PlaceBidCommand,
) -> Result<BidReceipt, AuctionError> {
    // Cheap rejections before touching shared state.
    if cmd.amount <= Decimal::ZERO {
        return Err(AuctionError::Validation(
            "amount must be positive".to_string(),
        ));
    }
    if cmd.amount > max_bid_amount {
        return Err(AuctionError::LimitExceeded(max_bid_amount));
    }

    let auction_id = cmd.auction_id;
    let user_id = cmd.user_id;
    let amount = cmd.amount;

    let outcome = db
        .transaction(|tx| {
            Box::pin(async move {
                let auction = store::find_by_id(&mut **tx, auction_id)
                    .await?
                    .ok_or_else(|| {
                        AuctionError::NotFound(format!("Auction with ID {} not found", auction_id))
                    })?;

                if !auction.is_active {
                    return Err(AuctionError::Expired);
                }

                let now = Utc::now();
                if model::is_expired(auction.auction_end_time, now) {
                    return Ok(TxOutcome::LazilyExpired);
                }

                let bidder = users::get_user_by_id(&mut **tx, user_id)
                    .await?
                    .ok_or_else(|| {
                        AuctionError::NotFound(format!("User with ID {} not found", user_id))
                    })?;

                // Strictly greater than the value to beat, equal loses.
                let current_highest = auction.highest_value();
                if amount <= current_highest {
                    return Err(AuctionError::Conflict { current_highest });
                }

                let updated = store::conditional_update_highest_bid(
                    &mut **tx,
                    auction_id,
                    amount,
                    current_highest,
                    now,
                )
                .await?;
                if updated == 0 {
                    // Lost the race. Report what actually won, not the
                    // value this submission raced against.
                    return Err(lost_race_error(tx, auction_id).await?);
                }

                let bid = store::insert_bid(&mut **tx, auction_id, user_id, amount)
                    .await
                    .map_err(map_bid_insert_error)?;
                let total_bids = store::count_bids(&mut **tx, auction_id).await?;

                Ok(TxOutcome::Accepted {
                    bid,
                    bidder,
                    auction,
                    total_bids,
                })
            })
        })
        .await?;

    match outcome {
        TxOutcome::LazilyExpired => {
            lifecycle::expire_auction(db, broadcaster, auction_id).await?;
            Err(AuctionError::Expired)
        }
        TxOutcome::Accepted {
            bid,
            bidder,
            auction,
            total_bids,
        } => {
            info!(
                "{:<12} --> bid {} accepted on auction {}: {}",
                "Bidding", bid.id, auction_id, amount
            );
            publish_accept_events(broadcaster, &bid, &bidder, &auction, total_bids).await;
            Ok(BidReceipt {
                bidder_name: bidder.first_name.clone(),
                bid,
            })
        }
    }
}

/// Turn a zero-row conditional update into the right rejection, using
/// the now-current row state.
async fn lost_race_error(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    auction_id: i64,
) -> Result<AuctionError, AuctionError> {
    let fresh = store::find_by_id(&mut **tx, auction_id)
        .await?
        .ok_or_else(|| {
            AuctionError::NotFound(format!("Auction with ID {} not found", auction_id))
        })?;
    if !fresh.is_active || model::is_expired(fresh.auction_end_time, Utc::now()) {
        return Ok(AuctionError::Expired);
    }
    Ok(AuctionError::Conflict {
        current_highest: fresh.highest_value(),
    })
}

fn map_bid_insert_error(e: sqlx::Error) -> AuctionError {
    if e.as_database_error()
        .is_some_and(|d| d.is_unique_violation())
    {
        return AuctionError::Validation(
            "An identical bid by this user already exists for this auction".to_string(),
        );
    }
    AuctionError::Storage(e)
}

/// Post-commit notifications. The bid is durable either way; delivery
/// failures are logged and dropped.
async fn publish_accept_events(
    broadcaster: &dyn Broadcaster,
    bid: &Bid,
    bidder: &User,
    auction: &Auction,
    total_bids: i64,
) {
    let now = Utc::now();
    let time_left = model::time_left(auction.auction_end_time, now);
    let time_left_formatted = model::format_time_left(time_left);

    let bid_update = AuctionEvent::BidUpdate {
        auction_id: auction.id,
        new_highest_bid: bid.amount,
        bidder_id: bidder.id,
        bidder_name: bidder.first_name.clone(),
        time_left,
        time_left_formatted: time_left_formatted.clone(),
        total_bids,
        timestamp: bid.created_at,
    };
    let auction_update = AuctionEvent::AuctionUpdate {
        auction_id: auction.id,
        name: auction.name.clone(),
        current_highest_bid: bid.amount,
        time_left,
        time_left_formatted,
        total_bids,
        is_expired: model::is_expired(auction.auction_end_time, now),
    };

    for event in [bid_update, auction_update] {
        if let Err(e) = broadcaster.publish(&event).await {
            warn!(
                "{:<12} --> failed to publish event for auction {}: {}",
                "Bidding", auction.id, e
            );
        }
    }
}

// endregion: --- Arbitration

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::message_broker::Broadcaster;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingBroadcaster {
        events: Mutex<Vec<AuctionEvent>>,
    }

    #[async_trait]
    impl Broadcaster for RecordingBroadcaster {
        async fn publish(&self, event: &AuctionEvent) -> Result<(), String> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn bidder() -> User {
        User {
            id: 4,
            username: "user4".to_string(),
            email: "user4@example.com".to_string(),
            first_name: "User4".to_string(),
            last_name: "Smith4".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn open_auction() -> Auction {
        Auction {
            id: 1,
            name: "Vintage camera".to_string(),
            description: "A 1960s rangefinder".to_string(),
            starting_price: Decimal::from(100),
            current_highest_bid: None,
            auction_end_time: Utc::now() + chrono::Duration::hours(1),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn accepted_bid_publishes_bid_and_auction_updates_in_order() {
        let broadcaster = RecordingBroadcaster {
            events: Mutex::new(Vec::new()),
        };
        let auction = open_auction();
        let bid = Bid {
            id: 10,
            auction_id: auction.id,
            user_id: 4,
            amount: Decimal::from(150),
            created_at: Utc::now(),
        };

        publish_accept_events(&broadcaster, &bid, &bidder(), &auction, 1).await;

        let events = broadcaster.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            AuctionEvent::BidUpdate {
                auction_id: 1,
                total_bids: 1,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            AuctionEvent::AuctionUpdate {
                auction_id: 1,
                is_expired: false,
                ..
            }
        ));
    }

    #[test]
    fn non_constraint_insert_errors_pass_through_as_storage() {
        let err = map_bid_insert_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AuctionError::Storage(_)));
    }
}
// endregion: --- Tests
