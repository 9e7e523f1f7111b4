//! End-to-end tests against a real Postgres instance (and, for the HTTP
//! smoke test, a running service). Run with:
//!
//!   DATABASE_URL=postgres://... cargo test -- --ignored

// region:    --- Imports
use async_trait::async_trait;
use bidding_system::auction::events::AuctionEvent;
use bidding_system::auction::lifecycle::{self, CreateAuctionCommand};
use bidding_system::bidding::commands::{place_bid, PlaceBidCommand};
use bidding_system::database::DatabaseManager;
use bidding_system::error::AuctionError;
use bidding_system::message_broker::Broadcaster;
use bidding_system::query::handlers::{get_active_auctions, get_auction_results, AuctionStatus};
use bidding_system::scheduler::AuctionScheduler;
use bidding_system::users;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::{Arc, Mutex};

// endregion: --- Imports

// region:    --- Test Harness

/// Captures published events instead of talking to Kafka.
#[derive(Default)]
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

impl RecordingBroadcaster {
    fn expired_count(&self, auction_id: i64) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, AuctionEvent::AuctionExpired { auction_id: id } if *id == auction_id))
            .count()
    }
}

async fn setup() -> (Arc<DatabaseManager>, Arc<RecordingBroadcaster>) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Arc::new(DatabaseManager::new(&database_url).await.unwrap());
    db.initialize_database().await.unwrap();
    users::seed_users(db.pool()).await.unwrap();
    (db, Arc::new(RecordingBroadcaster::default()))
}

fn cap() -> Decimal {
    Decimal::from(1_000_000)
}

async fn create_test_auction(
    db: &DatabaseManager,
    broadcaster: &dyn Broadcaster,
    starting_price: i64,
) -> i64 {
    let created = lifecycle::create_auction(
        db,
        broadcaster,
        CreateAuctionCommand {
            name: "Integration test auction".to_string(),
            description: "Created by the integration test suite".to_string(),
            starting_price: Decimal::from(starting_price),
            auction_end_time: None,
            duration_minutes: Some(60),
        },
    )
    .await
    .unwrap();
    created.auction.id
}

/// Force the stored end time into the past without touching `is_active`,
/// so lazy-detection and scheduler paths can be exercised.
async fn backdate_end_time(db: &DatabaseManager, auction_id: i64) {
    sqlx::query("UPDATE auctions SET auction_end_time = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(auction_id)
        .execute(db.pool())
        .await
        .unwrap();
}

fn bid(auction_id: i64, user_id: i64, amount: i64) -> PlaceBidCommand {
    PlaceBidCommand {
        auction_id,
        user_id,
        amount: Decimal::from(amount),
    }
}

// endregion: --- Test Harness

// region:    --- Arbitration

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn bids_must_strictly_increase() {
    let (db, broadcaster) = setup().await;
    let auction_id = create_test_auction(&db, broadcaster.as_ref(), 100).await;

    // 150 beats the starting price of 100.
    let receipt = place_bid(&db, broadcaster.as_ref(), cap(), bid(auction_id, 1, 150))
        .await
        .unwrap();
    assert_eq!(receipt.bid.amount, Decimal::from(150));

    // 120 loses, and the rejection cites the value it actually lost to.
    let err = place_bid(&db, broadcaster.as_ref(), cap(), bid(auction_id, 2, 120))
        .await
        .unwrap_err();
    match err {
        AuctionError::Conflict { current_highest } => {
            assert_eq!(current_highest, Decimal::from(150))
        }
        other => panic!("expected Conflict, got {:?}", other),
    }

    // Equal is not greater.
    let err = place_bid(&db, broadcaster.as_ref(), cap(), bid(auction_id, 3, 150))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Conflict { .. }));

    // 200 wins.
    place_bid(&db, broadcaster.as_ref(), cap(), bid(auction_id, 4, 200))
        .await
        .unwrap();

    backdate_end_time(&db, auction_id).await;
    assert!(lifecycle::expire_auction(&db, broadcaster.as_ref(), auction_id)
        .await
        .unwrap());

    let results = get_auction_results(&db).await.unwrap();
    let result = results.iter().find(|r| r.id == auction_id).unwrap();
    assert_eq!(result.final_price, Decimal::from(200));
    assert_eq!(result.total_bids, 2);
    assert_eq!(result.status, AuctionStatus::Sold);
    assert_eq!(result.winner.as_ref().unwrap().id, 4);
}

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn concurrent_submissions_accept_exactly_one() {
    let (db, broadcaster) = setup().await;
    let auction_id = create_test_auction(&db, broadcaster.as_ref(), 100).await;

    let (a, b) = tokio::join!(
        place_bid(&db, broadcaster.as_ref(), cap(), bid(auction_id, 5, 150)),
        place_bid(&db, broadcaster.as_ref(), cap(), bid(auction_id, 6, 140)),
    );

    let accepted: Vec<Decimal> = [&a, &b]
        .iter()
        .filter_map(|r| r.as_ref().ok().map(|receipt| receipt.bid.amount))
        .collect();
    assert_eq!(accepted.len(), 1, "exactly one submission must win");

    let loser = [a, b].into_iter().find(|r| r.is_err()).unwrap();
    match loser.unwrap_err() {
        AuctionError::Conflict { current_highest } => {
            // The loser is told the committed value, whichever it was.
            assert_eq!(current_highest, accepted[0]);
        }
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn bid_against_ended_auction_expires_it_lazily() {
    let (db, broadcaster) = setup().await;
    let auction_id = create_test_auction(&db, broadcaster.as_ref(), 100).await;
    backdate_end_time(&db, auction_id).await;

    let err = place_bid(&db, broadcaster.as_ref(), cap(), bid(auction_id, 7, 150))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Expired));

    // The lazy detection drove the stored transition.
    let is_active =
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM auctions WHERE id = $1")
            .bind(auction_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert!(!is_active);
    assert_eq!(broadcaster.expired_count(auction_id), 1);
}

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn bid_above_cap_is_rejected_before_touching_state() {
    let (db, broadcaster) = setup().await;
    let auction_id = create_test_auction(&db, broadcaster.as_ref(), 100).await;

    let err = place_bid(
        &db,
        broadcaster.as_ref(),
        cap(),
        bid(auction_id, 8, 2_000_000),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuctionError::LimitExceeded(_)));
}

// endregion: --- Arbitration

// region:    --- Lifecycle

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn expiration_is_idempotent_and_notifies_once() {
    let (db, broadcaster) = setup().await;
    let auction_id = create_test_auction(&db, broadcaster.as_ref(), 100).await;
    backdate_end_time(&db, auction_id).await;

    assert!(lifecycle::expire_auction(&db, broadcaster.as_ref(), auction_id)
        .await
        .unwrap());
    // Second trigger: safe no-op, no duplicate notification.
    assert!(!lifecycle::expire_auction(&db, broadcaster.as_ref(), auction_id)
        .await
        .unwrap());
    assert_eq!(broadcaster.expired_count(auction_id), 1);
}

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn auction_without_bids_reports_no_bids_result() {
    let (db, broadcaster) = setup().await;
    let auction_id = create_test_auction(&db, broadcaster.as_ref(), 100).await;
    backdate_end_time(&db, auction_id).await;
    lifecycle::expire_auction(&db, broadcaster.as_ref(), auction_id)
        .await
        .unwrap();

    let results = get_auction_results(&db).await.unwrap();
    let result = results.iter().find(|r| r.id == auction_id).unwrap();
    assert_eq!(result.status, AuctionStatus::NoBids);
    assert_eq!(result.final_price, Decimal::from(100));
    assert!(result.winner.is_none());
}

// endregion: --- Lifecycle

// region:    --- Scheduler

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn sweep_expires_every_due_auction_once() {
    let (db, broadcaster) = setup().await;
    let first = create_test_auction(&db, broadcaster.as_ref(), 100).await;
    let second = create_test_auction(&db, broadcaster.as_ref(), 100).await;
    backdate_end_time(&db, first).await;
    backdate_end_time(&db, second).await;

    let scheduler = AuctionScheduler::new(Arc::clone(&db), broadcaster.clone(), 1);
    // Same pass the first tick of the loop runs at startup.
    scheduler.run_once().await.unwrap();

    for auction_id in [first, second] {
        let is_active =
            sqlx::query_scalar::<_, bool>("SELECT is_active FROM auctions WHERE id = $1")
                .bind(auction_id)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert!(!is_active, "auction {} still active after the sweep", auction_id);
        assert_eq!(broadcaster.expired_count(auction_id), 1);
    }

    // Nothing left due; a second pass must not notify again.
    scheduler.run_once().await.unwrap();
    assert_eq!(broadcaster.expired_count(first), 1);
    assert_eq!(broadcaster.expired_count(second), 1);
}

// endregion: --- Scheduler

// region:    --- Query Views

#[tokio::test]
#[ignore = "requires a Postgres instance"]
async fn out_of_range_page_still_reports_the_active_total() {
    let (db, broadcaster) = setup().await;
    create_test_auction(&db, broadcaster.as_ref(), 100).await;

    let far_page = get_active_auctions(&db, 100_000, 10).await.unwrap();
    assert!(far_page.data.is_empty());
    assert!(far_page.total >= 1, "empty page must still carry the count");
}

// endregion: --- Query Views

// region:    --- HTTP Smoke

#[tokio::test]
#[ignore = "requires the service running on localhost:3000"]
async fn http_create_and_bid_round_trip() {
    let client = reqwest::Client::new();

    let health = client
        .get("http://localhost:3000/health")
        .send()
        .await
        .expect("Failed to reach service");
    assert!(health.status().is_success());

    let auction: serde_json::Value = client
        .post("http://localhost:3000/auctions")
        .json(&json!({
            "name": "HTTP smoke test auction",
            "description": "Created over HTTP",
            "startingPrice": 100,
            "durationMinutes": 5
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let auction_id = auction["id"].as_i64().unwrap();
    assert_eq!(auction["isActive"], true);

    let response = client
        .post(format!("http://localhost:3000/auctions/{}/bids", auction_id))
        .json(&json!({ "userId": 1, "amount": 150 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    // A second, lower bid conflicts.
    let response = client
        .post(format!("http://localhost:3000/auctions/{}/bids", auction_id))
        .json(&json!({ "userId": 2, "amount": 120 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}

// endregion: --- HTTP Smoke
