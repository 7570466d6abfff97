use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::dto::region_dto::Region;
use crate::services::dedup::DedupSweep;
use crate::services::leaderboard_sync::LeaderboardSync;
use crate::services::snapshot_store::SnapshotStore;

/// Below this many Global rows the cache counts as not yet populated.
pub const STARTUP_SYNC_THRESHOLD: i64 = 9_999;

/// Runs the leaderboard sync followed by the dedup sweep on a fixed
/// interval. The two never overlap within one instance.
pub struct JobScheduler {
    sync: Arc<LeaderboardSync>,
    dedup: Arc<DedupSweep>,
    store: SnapshotStore,
    interval: Duration,
    on_startup: bool,
}

impl JobScheduler {
    pub fn new(
        sync: Arc<LeaderboardSync>,
        dedup: Arc<DedupSweep>,
        store: SnapshotStore,
        interval: Duration,
        on_startup: bool,
    ) -> Self {
        Self {
            sync,
            dedup,
            store,
            interval,
            on_startup,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        if self.on_startup {
            self.startup_sync().await;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    async fn startup_sync(&self) {
        match self.store.count_leaderboard_region(Region::Global).await {
            Ok(count) if count < STARTUP_SYNC_THRESHOLD => {
                info!(count, "Leaderboard cache is sparse, syncing on startup");
                self.run_cycle().await;
            }
            Ok(count) => info!(count, "Leaderboard cache populated, skipping startup sync"),
            Err(e) => error!(error = %e, "Could not count leaderboard rows"),
        }
    }

    pub async fn run_cycle(&self) {
        match self.sync.run().await {
            Ok(report) => {
                let aborted = report.regions.iter().filter(|r| r.aborted).count();
                if aborted > 0 {
                    warn!(aborted, "Some regions did not finish syncing");
                }
            }
            Err(e) => {
                warn!(error = %e, "Skipping scheduled cycle");
                return;
            }
        }

        match self.dedup.run().await {
            Ok(report) => info!(
                ratings_kept = report.ratings_kept,
                character_ratings_kept = report.character_ratings_kept,
                "Scheduled dedup complete"
            ),
            Err(e) => error!(error = %e, "Scheduled dedup failed"),
        }
    }
}
