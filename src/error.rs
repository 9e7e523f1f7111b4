// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

// endregion: --- Imports

// region:    --- AuctionError

/// Central error type for the bidding system.
#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Bid not strictly above the current highest value. Carries the
    /// up-to-date highest value, so a caller losing a race is told what
    /// it actually lost to. Retryable.
    #[error("Bid must be higher than current highest value (${current_highest})")]
    Conflict { current_highest: Decimal },

    /// Auction already closed. Terminal.
    #[error("Auction has already ended")]
    Expired,

    #[error("Bid amount must be less than {0}")]
    LimitExceeded(Decimal),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Broker error: {0}")]
    Broker(String),
}

impl AuctionError {
    fn code(&self) -> &'static str {
        match self {
            AuctionError::Validation(_) => "VALIDATION",
            AuctionError::NotFound(_) => "NOT_FOUND",
            AuctionError::Conflict { .. } => "BID_TOO_LOW",
            AuctionError::Expired => "AUCTION_ENDED",
            AuctionError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            AuctionError::Storage(_) | AuctionError::Broker(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuctionError::Validation(_) => StatusCode::BAD_REQUEST,
            AuctionError::NotFound(_) => StatusCode::NOT_FOUND,
            AuctionError::Conflict { .. } => StatusCode::CONFLICT,
            AuctionError::Expired => StatusCode::GONE,
            AuctionError::LimitExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuctionError::Storage(_) | AuctionError::Broker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Storage details stay in the logs, not on the wire.
        let message = match &self {
            AuctionError::Storage(e) => {
                tracing::error!("{:<12} --> storage error: {:?}", "Error", e);
                "Internal server error".to_string()
            }
            AuctionError::Broker(e) => {
                tracing::error!("{:<12} --> broker error: {}", "Error", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": self.code(),
            "message": message,
        });
        if let AuctionError::Conflict { current_highest } = &self {
            body["currentHighestBid"] = json!(current_highest);
        }

        (status, Json(body)).into_response()
    }
}

// endregion: --- AuctionError

// endregion: --- Tests
