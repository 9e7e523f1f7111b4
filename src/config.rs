// region:    --- Imports
use rust_decimal::Decimal;
use std::str::FromStr;

// endregion: --- Imports

/// Hard ceiling on how far in the future an auction may close.
pub const MAX_AUCTION_DAYS: i64 = 20;

// region:    --- Config

/// Runtime configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub kafka_brokers: String,
    pub max_bid_amount: Decimal,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let kafka_brokers =
            std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string());
        let max_bid_amount = std::env::var("MAX_BID_AMOUNT")
            .ok()
            .and_then(|v| Decimal::from_str(&v).ok())
            .unwrap_or_else(default_max_bid_amount);
        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Self {
            database_url,
            bind_addr,
            kafka_brokers,
            max_bid_amount,
            sweep_interval_secs,
        }
    }
}

fn default_max_bid_amount() -> Decimal {
    Decimal::from(1_000_000)
}

// endregion: --- Config

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bid_cap_is_one_million() {
        assert_eq!(default_max_bid_amount(), Decimal::from(1_000_000));
    }
}
// endregion: --- Tests
