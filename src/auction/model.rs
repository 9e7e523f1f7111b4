// region:    --- Imports
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Rows

/// Auction row. `current_highest_bid` stays NULL until the first accepted bid.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub starting_price: Decimal,
    pub current_highest_bid: Option<Decimal>,
    pub auction_end_time: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// The value a new bid has to beat.
    pub fn highest_value(&self) -> Decimal {
        self.current_highest_bid.unwrap_or(self.starting_price)
    }
}

/// Accepted bid row. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Rows

// region:    --- Time Derivation

/// Seconds remaining until `end_time`, clamped at zero.
pub fn time_left(end_time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (end_time - now).num_seconds().max(0)
}

pub fn is_expired(end_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= end_time
}

/// Human-readable remaining time: "2h 5m 30s", "5m 30s", "30s" or "Expired".
pub fn format_time_left(seconds: i64) -> String {
    if seconds <= 0 {
        return "Expired".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let remaining = seconds % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, remaining)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, remaining)
    } else {
        format!("{}s", remaining)
    }
}

// endregion: --- Time Derivation

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auction_at(end: DateTime<Utc>) -> Auction {
        Auction {
            id: 1,
            name: "Vintage camera".to_string(),
            description: "A 1960s rangefinder".to_string(),
            starting_price: Decimal::from(100),
            current_highest_bid: None,
            auction_end_time: end,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn highest_value_falls_back_to_starting_price() {
        let mut auction = auction_at(Utc::now());
        assert_eq!(auction.highest_value(), Decimal::from(100));
        auction.current_highest_bid = Some(Decimal::from(150));
        assert_eq!(auction.highest_value(), Decimal::from(150));
    }

    #[test]
    fn time_left_is_clamped_at_zero() {
        let now = Utc::now();
        assert_eq!(time_left(now - Duration::seconds(30), now), 0);
        assert_eq!(time_left(now + Duration::seconds(90), now), 90);
    }

    #[test]
    fn is_expired_at_the_exact_end_instant() {
        let now = Utc::now();
        assert!(is_expired(now, now));
        assert!(is_expired(now - Duration::seconds(1), now));
        assert!(!is_expired(now + Duration::seconds(1), now));
    }

    #[test]
    fn format_time_left_picks_the_right_granularity() {
        assert_eq!(format_time_left(0), "Expired");
        assert_eq!(format_time_left(-5), "Expired");
        assert_eq!(format_time_left(42), "42s");
        assert_eq!(format_time_left(330), "5m 30s");
        assert_eq!(format_time_left(7530), "2h 5m 30s");
    }
}
// endregion: --- Tests
