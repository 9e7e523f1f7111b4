//! Auction creation and the one-way Active -> Expired transition.
//!
//! Every expiration trigger (scheduler sweep, bid path, read path) goes
//! through [`expire_auction`], which is idempotent and only notifies on
//! the call that actually performed the transition.

// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::model::{self, Auction};
use crate::config::MAX_AUCTION_DAYS;
use crate::database::DatabaseManager;
use crate::error::AuctionError;
use crate::message_broker::Broadcaster;
use crate::store;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuctionCommand {
    pub name: String,
    pub description: String,
    pub starting_price: Decimal,
    pub auction_end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

/// Creation response carrying the time-derived fields as of `now`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAuction {
    #[serde(flatten)]
    pub auction: Auction,
    pub time_left: i64,
    pub time_left_formatted: String,
}

// endregion: --- Commands

// region:    --- Create

/// Resolve the effective end time from exactly one of an explicit end
/// time or a duration, and enforce the timing rules.
pub fn resolve_end_time(
    now: DateTime<Utc>,
    auction_end_time: Option<DateTime<Utc>>,
    duration_minutes: Option<i64>,
) -> Result<DateTime<Utc>, AuctionError> {
    let end_time = match (auction_end_time, duration_minutes) {
        (Some(_), Some(_)) | (None, None) => {
            return Err(AuctionError::Validation(
                "Either auctionEndTime or durationMinutes must be provided".to_string(),
            ))
        }
        (Some(end), None) => end,
        (None, Some(minutes)) => {
            if minutes < 1 {
                return Err(AuctionError::Validation(
                    "durationMinutes must be at least 1".to_string(),
                ));
            }
            now + Duration::minutes(minutes)
        }
    };

    if end_time <= now {
        return Err(AuctionError::Validation(
            "Auction end time must be in the future".to_string(),
        ));
    }
    if end_time - now > Duration::days(MAX_AUCTION_DAYS) {
        return Err(AuctionError::Validation(format!(
            "Auction end time cannot be more than {} days from now",
            MAX_AUCTION_DAYS
        )));
    }
    Ok(end_time)
}

pub async fn create_auction(
    db: &DatabaseManager,
    broadcaster: &dyn Broadcaster,
    cmd: CreateAuctionCommand,
) -> Result<CreatedAuction, AuctionError> {
    if cmd.name.trim().is_empty() {
        return Err(AuctionError::Validation("name must not be empty".to_string()));
    }
    if cmd.description.trim().is_empty() {
        return Err(AuctionError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    if cmd.starting_price <= Decimal::ZERO {
        return Err(AuctionError::Validation(
            "startingPrice must be positive".to_string(),
        ));
    }

    let now = Utc::now();
    let end_time = resolve_end_time(now, cmd.auction_end_time, cmd.duration_minutes)?;

    let auction = store::insert_auction(
        db.pool(),
        cmd.name.trim(),
        cmd.description.trim(),
        cmd.starting_price,
        end_time,
    )
    .await?;

    info!(
        "{:<12} --> auction {} created, ends at {}",
        "Lifecycle", auction.id, auction.auction_end_time
    );

    let time_left = model::time_left(auction.auction_end_time, now);
    let event = AuctionEvent::NewAuction {
        auction_id: auction.id,
        name: auction.name.clone(),
        description: auction.description.clone(),
        starting_price: auction.starting_price,
        auction_end_time: auction.auction_end_time,
        time_left,
        time_left_formatted: model::format_time_left(time_left),
    };
    // Best effort: the auction is durable either way.
    if let Err(e) = broadcaster.publish(&event).await {
        warn!(
            "{:<12} --> failed to publish NewAuction for {}: {}",
            "Lifecycle", auction.id, e
        );
    }

    Ok(CreatedAuction {
        time_left,
        time_left_formatted: model::format_time_left(time_left),
        auction,
    })
}

// endregion: --- Create

// region:    --- Expire

/// Apply Active -> Expired. Returns whether this call transitioned the
/// auction; a repeat call is a no-op and emits nothing.
pub async fn expire_auction(
    db: &DatabaseManager,
    broadcaster: &dyn Broadcaster,
    auction_id: i64,
) -> Result<bool, AuctionError> {
    let transitioned = store::mark_inactive(db.pool(), auction_id).await?;
    if !transitioned {
        return Ok(false);
    }

    info!("{:<12} --> auction {} expired", "Lifecycle", auction_id);
    let event = AuctionEvent::AuctionExpired { auction_id };
    if let Err(e) = broadcaster.publish(&event).await {
        warn!(
            "{:<12} --> failed to publish AuctionExpired for {}: {}",
            "Lifecycle", auction_id, e
        );
    }
    Ok(true)
}

// endregion: --- Expire

// endregion: --- Tests
