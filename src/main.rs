// region:    --- Imports
use axum::routing::{get, post};
use axum::Router;
use bidding_system::config::Config;
use bidding_system::database::DatabaseManager;
use bidding_system::handlers::{self, AppState};
use bidding_system::message_broker::{KafkaBroadcaster, KafkaManager, EVENTS_TOPIC};
use bidding_system::scheduler::AuctionScheduler;
use bidding_system::users;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Arc::new(Config::from_env());

    let db = Arc::new(DatabaseManager::new(&config.database_url).await?);
    if let Err(e) = db.initialize_database().await {
        error!("{:<12} --> database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database initialized", "Main");

    users::seed_users(db.pool()).await?;

    let kafka_manager = KafkaManager::new(&config.kafka_brokers)?;
    kafka_manager.create_topic(EVENTS_TOPIC, 5, 1).await?;
    let broadcaster = Arc::new(KafkaBroadcaster::new(kafka_manager.get_producer()));
    info!("{:<12} --> kafka initialized", "Main");

    // Durable expiration: a store-backed sweep, reconciled on the first tick.
    let scheduler = AuctionScheduler::new(
        Arc::clone(&db),
        broadcaster.clone(),
        config.sweep_interval_secs,
    );
    scheduler.start();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        db,
        broadcaster,
        config: Arc::clone(&config),
    };

    let routes_all = Router::new()
        .route(
            "/auctions",
            post(handlers::handle_create_auction).get(handlers::handle_get_auctions),
        )
        .route("/auctions/results", get(handlers::handle_get_auction_results))
        .route(
            "/auctions/dashboard/stats",
            get(handlers::handle_get_dashboard_stats),
        )
        .route("/auctions/:id", get(handlers::handle_get_auction))
        .route(
            "/auctions/:id/bids",
            post(handlers::handle_place_bid).get(handlers::handle_get_auction_bids),
        )
        .route("/users", get(handlers::handle_get_users))
        .route("/users/:id", get(handlers::handle_get_user))
        .route("/health", get(handlers::handle_health))
        .route("/", get(handlers::handle_info))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
