//! Persistence surface consumed by the arbitration engine, the lifecycle
//! controller and the scheduler. Write-side SQL lives here; read-side
//! projections have their own statements under `query`.

// region:    --- Imports
use crate::auction::model::{Auction, Bid};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;

// endregion: --- Imports

// region:    --- SQL

const FIND_BY_ID: &str = r#"
    SELECT id, name, description, starting_price, current_highest_bid,
           auction_end_time, is_active, created_at
    FROM auctions
    WHERE id = $1
"#;

const FIND_DUE_ACTIVE: &str =
    "SELECT id FROM auctions WHERE is_active AND auction_end_time <= $1";

/// The single serialization point for bid arbitration. The row only
/// changes while the auction is still open and the stored highest value
/// is still the one the engine raced against; a lost race updates zero
/// rows, even when the new amount would beat the committed rival.
const CONDITIONAL_UPDATE_HIGHEST_BID: &str = r#"
    UPDATE auctions
    SET current_highest_bid = $2
    WHERE id = $1
      AND is_active
      AND auction_end_time > $4
      AND COALESCE(current_highest_bid, starting_price) = $3
      AND COALESCE(current_highest_bid, starting_price) < $2
"#;

const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, user_id, amount)
    VALUES ($1, $2, $3)
    RETURNING id, auction_id, user_id, amount, created_at
"#;

const COUNT_BIDS: &str = "SELECT COUNT(*) FROM bids WHERE auction_id = $1";

const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions (name, description, starting_price, auction_end_time)
    VALUES ($1, $2, $3, $4)
    RETURNING id, name, description, starting_price, current_highest_bid,
              auction_end_time, is_active, created_at
"#;

const MARK_INACTIVE: &str =
    "UPDATE auctions SET is_active = FALSE WHERE id = $1 AND is_active";

// endregion: --- SQL

// region:    --- Operations

pub async fn find_by_id(
    executor: impl PgExecutor<'_>,
    auction_id: i64,
) -> Result<Option<Auction>, sqlx::Error> {
    sqlx::query_as::<_, Auction>(FIND_BY_ID)
        .bind(auction_id)
        .fetch_optional(executor)
        .await
}

/// Ids of auctions still marked active whose end time has passed.
pub async fn find_due_active(
    executor: impl PgExecutor<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(FIND_DUE_ACTIVE)
        .bind(now)
        .fetch_all(executor)
        .await
}

/// Compare-and-set on the highest-bid slot. `expected_below` is the
/// value the caller read and intends to beat. Returns the number of rows
/// updated: 1 when this submission won the slot, 0 when it lost the race
/// or the auction closed underneath it.
pub async fn conditional_update_highest_bid(
    executor: impl PgExecutor<'_>,
    auction_id: i64,
    new_value: Decimal,
    expected_below: Decimal,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(CONDITIONAL_UPDATE_HIGHEST_BID)
        .bind(auction_id)
        .bind(new_value)
        .bind(expected_below)
        .bind(now)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_bid(
    executor: impl PgExecutor<'_>,
    auction_id: i64,
    user_id: i64,
    amount: Decimal,
) -> Result<Bid, sqlx::Error> {
    sqlx::query_as::<_, Bid>(INSERT_BID)
        .bind(auction_id)
        .bind(user_id)
        .bind(amount)
        .fetch_one(executor)
        .await
}

pub async fn count_bids(
    executor: impl PgExecutor<'_>,
    auction_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(COUNT_BIDS)
        .bind(auction_id)
        .fetch_one(executor)
        .await
}

pub async fn insert_auction(
    executor: impl PgExecutor<'_>,
    name: &str,
    description: &str,
    starting_price: Decimal,
    auction_end_time: DateTime<Utc>,
) -> Result<Auction, sqlx::Error> {
    sqlx::query_as::<_, Auction>(INSERT_AUCTION)
        .bind(name)
        .bind(description)
        .bind(starting_price)
        .bind(auction_end_time)
        .fetch_one(executor)
        .await
}

/// Flip Active -> Expired. Conditional on `is_active`, so a second call
/// is a no-op; returns whether this call performed the transition.
pub async fn mark_inactive(
    executor: impl PgExecutor<'_>,
    auction_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(MARK_INACTIVE)
        .bind(auction_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() == 1)
}

// endregion: --- Operations
