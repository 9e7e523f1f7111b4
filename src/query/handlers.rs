//! Read-only projections over the store. No independent state: time-left
//! and expiry flags are derived from the clock at response-construction
//! time, never stored.

// region:    --- Imports
use crate::auction::lifecycle;
use crate::auction::model::{self, Auction};
use crate::database::DatabaseManager;
use crate::error::AuctionError;
use crate::message_broker::Broadcaster;
use crate::query::queries;
use crate::store;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

// endregion: --- Imports

// region:    --- View Types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighestBidder {
    pub id: i64,
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAuctionView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub starting_price: Decimal,
    pub current_highest_bid: Option<Decimal>,
    pub time_left: i64,
    pub time_left_formatted: String,
    pub is_expired: bool,
    pub total_bids: i64,
    pub highest_bidder: Option<HighestBidder>,
    pub auction_end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAuctionsPage {
    pub data: Vec<ActiveAuctionView>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub bidder_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction: Auction,
    pub time_left: i64,
    pub time_left_formatted: String,
    pub is_expired: bool,
    pub total_bids: i64,
    pub bids: Vec<BidView>,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum AuctionStatus {
    Sold,
    NoBids,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionResultView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub starting_price: Decimal,
    pub final_price: Decimal,
    pub status: AuctionStatus,
    pub winner: Option<HighestBidder>,
    pub total_bids: i64,
    pub auction_end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_auctions: i64,
    pub active_auctions: i64,
    pub completed_auctions: i64,
    pub total_bids: i64,
}

// endregion: --- View Types

// region:    --- Row Types

#[derive(Debug, FromRow)]
struct ActiveAuctionRow {
    id: i64,
    name: String,
    description: String,
    starting_price: Decimal,
    current_highest_bid: Option<Decimal>,
    auction_end_time: DateTime<Utc>,
    total_bids: i64,
    highest_bidder_id: Option<i64>,
    highest_bidder_name: Option<String>,
    highest_bidder_amount: Option<Decimal>,
    total: i64,
}

#[derive(Debug, FromRow)]
struct BidHistoryRow {
    id: i64,
    auction_id: i64,
    user_id: i64,
    amount: Decimal,
    created_at: DateTime<Utc>,
    bidder_name: String,
}

#[derive(Debug, FromRow)]
struct AuctionResultRow {
    id: i64,
    name: String,
    description: String,
    starting_price: Decimal,
    current_highest_bid: Option<Decimal>,
    auction_end_time: DateTime<Utc>,
    total_bids: i64,
    winner_id: Option<i64>,
    winner_name: Option<String>,
    winner_amount: Option<Decimal>,
}

#[derive(Debug, FromRow)]
struct DashboardRow {
    total_auctions: i64,
    active_auctions: i64,
    completed_auctions: i64,
    total_bids: i64,
}

// endregion: --- Row Types

// region:    --- Shaping

fn shape_active_auction(row: ActiveAuctionRow, now: DateTime<Utc>) -> ActiveAuctionView {
    let time_left = model::time_left(row.auction_end_time, now);
    let highest_bidder = match (
        row.highest_bidder_id,
        row.highest_bidder_name,
        row.highest_bidder_amount,
    ) {
        (Some(id), Some(name), Some(amount)) => Some(HighestBidder { id, name, amount }),
        _ => None,
    };
    ActiveAuctionView {
        id: row.id,
        name: row.name,
        description: row.description,
        starting_price: row.starting_price,
        current_highest_bid: row.current_highest_bid,
        time_left,
        time_left_formatted: model::format_time_left(time_left),
        is_expired: model::is_expired(row.auction_end_time, now),
        total_bids: row.total_bids,
        highest_bidder,
        auction_end_time: row.auction_end_time,
    }
}

fn shape_auction_result(row: AuctionResultRow) -> AuctionResultView {
    let (status, winner) = match row.current_highest_bid {
        Some(_) => {
            let winner = match (row.winner_id, row.winner_name, row.winner_amount) {
                (Some(id), Some(name), Some(amount)) => Some(HighestBidder { id, name, amount }),
                _ => None,
            };
            (AuctionStatus::Sold, winner)
        }
        None => (AuctionStatus::NoBids, None),
    };
    AuctionResultView {
        id: row.id,
        name: row.name,
        description: row.description,
        starting_price: row.starting_price,
        final_price: row.current_highest_bid.unwrap_or(row.starting_price),
        status,
        winner,
        total_bids: row.total_bids,
        auction_end_time: row.auction_end_time,
    }
}

// endregion: --- Shaping

// region:    --- Projections

/// Paginated active auctions, newest first. One statement, one snapshot.
/// Rows whose end time has just passed are served as-is with
/// `isExpired: true`; the sweep, not the list read, drives the
/// transition, so the stale window is bounded by the sweep interval.
pub async fn get_active_auctions(
    db: &DatabaseManager,
    page: i64,
    limit: i64,
) -> Result<ActiveAuctionsPage, AuctionError> {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    let rows = sqlx::query_as::<_, ActiveAuctionRow>(queries::GET_ACTIVE_AUCTIONS)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(db.pool())
        .await?;

    let now = Utc::now();
    // The windowed total only comes back with rows; a page past the end
    // still has to report the true active count.
    let total = match rows.first() {
        Some(row) => row.total,
        None => {
            sqlx::query_scalar::<_, i64>(queries::COUNT_ACTIVE_AUCTIONS)
                .fetch_one(db.pool())
                .await?
        }
    };
    let data = rows
        .into_iter()
        .map(|row| shape_active_auction(row, now))
        .collect();
    Ok(ActiveAuctionsPage { data, total })
}

/// One auction with its full bid history, read under REPEATABLE READ so
/// the highest bid and the history agree on a single point in time.
/// Observing a stale-active auction lazily drives the expiration
/// transition after the read.
pub async fn get_auction_detail(
    db: &DatabaseManager,
    broadcaster: &dyn Broadcaster,
    auction_id: i64,
) -> Result<AuctionDetail, AuctionError> {
    let (auction, bids) = db
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query(queries::SET_REPEATABLE_READ)
                    .execute(&mut **tx)
                    .await?;
                let auction = store::find_by_id(&mut **tx, auction_id)
                    .await?
                    .ok_or_else(|| {
                        AuctionError::NotFound(format!(
                            "Auction with ID {} not found",
                            auction_id
                        ))
                    })?;
                let bids = sqlx::query_as::<_, BidHistoryRow>(queries::GET_BID_HISTORY)
                    .bind(auction_id)
                    .fetch_all(&mut **tx)
                    .await?;
                Ok::<_, AuctionError>((auction, bids))
            })
        })
        .await?;

    let now = Utc::now();
    if auction.is_active && model::is_expired(auction.auction_end_time, now) {
        lifecycle::expire_auction(db, broadcaster, auction.id).await?;
    }

    let time_left = model::time_left(auction.auction_end_time, now);
    Ok(AuctionDetail {
        time_left,
        time_left_formatted: model::format_time_left(time_left),
        is_expired: model::is_expired(auction.auction_end_time, now),
        total_bids: bids.len() as i64,
        bids: bids
            .into_iter()
            .map(|row| BidView {
                id: row.id,
                auction_id: row.auction_id,
                user_id: row.user_id,
                amount: row.amount,
                bidder_name: row.bidder_name,
                created_at: row.created_at,
            })
            .collect(),
        auction,
    })
}

/// Bid history for one auction, newest first.
pub async fn get_auction_bids(
    db: &DatabaseManager,
    auction_id: i64,
) -> Result<Vec<BidView>, AuctionError> {
    let auction = store::find_by_id(db.pool(), auction_id).await?;
    if auction.is_none() {
        return Err(AuctionError::NotFound(format!(
            "Auction with ID {} not found",
            auction_id
        )));
    }

    let rows = sqlx::query_as::<_, BidHistoryRow>(queries::GET_BID_HISTORY)
        .bind(auction_id)
        .fetch_all(db.pool())
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| BidView {
            id: row.id,
            auction_id: row.auction_id,
            user_id: row.user_id,
            amount: row.amount,
            bidder_name: row.bidder_name,
            created_at: row.created_at,
        })
        .collect())
}

/// Completed auctions with final price and winner.
pub async fn get_auction_results(
    db: &DatabaseManager,
) -> Result<Vec<AuctionResultView>, AuctionError> {
    let rows = sqlx::query_as::<_, AuctionResultRow>(queries::GET_AUCTION_RESULTS)
        .fetch_all(db.pool())
        .await?;
    Ok(rows.into_iter().map(shape_auction_result).collect())
}

pub async fn get_dashboard_stats(db: &DatabaseManager) -> Result<DashboardStats, AuctionError> {
    let row = sqlx::query_as::<_, DashboardRow>(queries::GET_DASHBOARD_STATS)
        .fetch_one(db.pool())
        .await?;
    Ok(DashboardStats {
        total_auctions: row.total_auctions,
        active_auctions: row.active_auctions,
        completed_auctions: row.completed_auctions,
        total_bids: row.total_bids,
    })
}

// endregion: --- Projections

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn result_row(highest: Option<Decimal>, winner: Option<(i64, &str, Decimal)>) -> AuctionResultRow {
        AuctionResultRow {
            id: 1,
            name: "Vintage camera".to_string(),
            description: "A 1960s rangefinder".to_string(),
            starting_price: Decimal::from(100),
            current_highest_bid: highest,
            auction_end_time: Utc::now() - Duration::hours(1),
            total_bids: if winner.is_some() { 2 } else { 0 },
            winner_id: winner.map(|(id, _, _)| id),
            winner_name: winner.map(|(_, name, _)| name.to_string()),
            winner_amount: winner.map(|(_, _, amount)| amount),
        }
    }

    #[test]
    fn sold_result_carries_winner_and_final_price() {
        let view = shape_auction_result(result_row(
            Some(Decimal::from(200)),
            Some((4, "User4 Smith4", Decimal::from(200))),
        ));
        assert_eq!(view.status, AuctionStatus::Sold);
        assert_eq!(view.final_price, Decimal::from(200));
        assert_eq!(view.total_bids, 2);
        let winner = view.winner.unwrap();
        assert_eq!(winner.id, 4);
        assert_eq!(winner.amount, Decimal::from(200));
    }

    #[test]
    fn no_bids_result_falls_back_to_starting_price() {
        let view = shape_auction_result(result_row(None, None));
        assert_eq!(view.status, AuctionStatus::NoBids);
        assert_eq!(view.final_price, Decimal::from(100));
        assert!(view.winner.is_none());
    }

    #[test]
    fn active_view_derives_time_fields_from_passed_clock() {
        let now = Utc::now();
        let row = ActiveAuctionRow {
            id: 1,
            name: "Vintage camera".to_string(),
            description: "A 1960s rangefinder".to_string(),
            starting_price: Decimal::from(100),
            current_highest_bid: Some(Decimal::from(150)),
            auction_end_time: now + Duration::seconds(330),
            total_bids: 1,
            highest_bidder_id: Some(4),
            highest_bidder_name: Some("User4 Smith4".to_string()),
            highest_bidder_amount: Some(Decimal::from(150)),
            total: 1,
        };
        let view = shape_active_auction(row, now);
        assert_eq!(view.time_left, 330);
        assert_eq!(view.time_left_formatted, "5m 30s");
        assert!(!view.is_expired);
        assert_eq!(view.highest_bidder.unwrap().name, "User4 Smith4");
    }

    #[test]
    fn status_serializes_as_wire_strings() {
        assert_eq!(serde_json::to_value(AuctionStatus::Sold).unwrap(), "Sold");
        assert_eq!(serde_json::to_value(AuctionStatus::NoBids).unwrap(), "NoBids");
    }
}
// endregion: --- Tests
