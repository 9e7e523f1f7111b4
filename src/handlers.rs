// region:    --- Imports
use crate::auction::lifecycle::{self, CreateAuctionCommand};
use crate::bidding::commands::{self, PlaceBidCommand};
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::error::AuctionError;
use crate::message_broker::Broadcaster;
use crate::query;
use crate::users;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- State

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub config: Arc<Config>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

// endregion: --- State

// region:    --- Command Handlers

pub async fn handle_create_auction(
    State(state): State<AppState>,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> create auction: {:?}", "Command", cmd.name);
    let created = lifecycle::create_auction(&state.db, state.broadcaster.as_ref(), cmd).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn handle_place_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    Json(mut cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    cmd.auction_id = auction_id;
    info!(
        "{:<12} --> place bid: auction={} user={} amount={}",
        "Command", cmd.auction_id, cmd.user_id, cmd.amount
    );
    let receipt = commands::place_bid(
        &state.db,
        state.broadcaster.as_ref(),
        state.config.max_bid_amount,
        cmd,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

pub async fn handle_get_auctions(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AuctionError> {
    let page = query::handlers::get_active_auctions(&state.db, pagination.page, pagination.limit)
        .await?;
    Ok(Json(page))
}

pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let detail =
        query::handlers::get_auction_detail(&state.db, state.broadcaster.as_ref(), auction_id)
            .await?;
    Ok(Json(detail))
}

pub async fn handle_get_auction_bids(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let bids = query::handlers::get_auction_bids(&state.db, auction_id).await?;
    Ok(Json(bids))
}

pub async fn handle_get_auction_results(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuctionError> {
    let results = query::handlers::get_auction_results(&state.db).await?;
    Ok(Json(results))
}

pub async fn handle_get_dashboard_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuctionError> {
    let stats = query::handlers::get_dashboard_stats(&state.db).await?;
    Ok(Json(stats))
}

pub async fn handle_get_users(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuctionError> {
    let all = users::get_all_users(state.db.pool()).await?;
    Ok(Json(all))
}

pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let user = users::get_user_by_id(state.db.pool(), user_id)
        .await?
        .ok_or_else(|| AuctionError::NotFound(format!("User with ID {} not found", user_id)))?;
    Ok(Json(user))
}

pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "bidding-system-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn handle_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Real-Time Bidding System API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "auctions": "/auctions",
            "users": "/users",
        },
    }))
}

// endregion: --- Query Handlers
