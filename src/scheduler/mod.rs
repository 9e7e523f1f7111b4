//! Expiration scheduler: a periodic sweep over due end times, backed by
//! the store rather than in-process timers, so every active auction is
//! expired within one sweep interval of its end time even across a
//! process restart. The first tick runs immediately, which doubles as
//! the startup reconciliation pass.

// region:    --- Imports
use crate::auction::lifecycle;
use crate::database::DatabaseManager;
use crate::message_broker::Broadcaster;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Auction Scheduler

pub struct AuctionScheduler {
    db: Arc<DatabaseManager>,
    broadcaster: Arc<dyn Broadcaster>,
    sweep_interval: Duration,
}

impl AuctionScheduler {
    pub fn new(
        db: Arc<DatabaseManager>,
        broadcaster: Arc<dyn Broadcaster>,
        sweep_interval_secs: u64,
    ) -> Self {
        Self {
            db,
            broadcaster,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }

    /// Spawn the sweep loop. Never exits; a failed sweep is retried on
    /// the next tick.
    pub fn start(&self) {
        let db = Arc::clone(&self.db);
        let broadcaster = Arc::clone(&self.broadcaster);
        let sweep_interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = Self::sweep(&db, broadcaster.as_ref()).await {
                    error!("{:<12} --> sweep failed: {:?}", "Scheduler", e);
                }
            }
        });
    }

    /// Run one sweep pass outside the spawned loop. This is what the
    /// first tick of [`start`](Self::start) executes at startup.
    pub async fn run_once(&self) -> Result<(), sqlx::Error> {
        Self::sweep(&self.db, self.broadcaster.as_ref()).await
    }

    /// Expire every active auction whose end time has passed. A failure
    /// on one auction is logged and left for the next sweep; the rest of
    /// the batch still runs.
    async fn sweep(
        db: &DatabaseManager,
        broadcaster: &dyn Broadcaster,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let due = crate::store::find_due_active(db.pool(), now).await?;
        if due.is_empty() {
            return Ok(());
        }

        debug!("{:<12} --> {} auction(s) due", "Scheduler", due.len());
        for auction_id in due {
            // A lazy-detection path may have beaten us here; the
            // transition is idempotent either way.
            if let Err(e) = lifecycle::expire_auction(db, broadcaster, auction_id).await {
                error!(
                    "{:<12} --> failed to expire auction {}: {:?}",
                    "Scheduler", auction_id, e
                );
            }
        }
        Ok(())
    }
}

// endregion: --- Auction Scheduler
