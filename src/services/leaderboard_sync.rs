use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::dto::job_dto::{RegionSyncReport, SyncReport};
use crate::dto::region_dto::Region;
use crate::error::{StrikrError, StrikrResult};
use crate::services::prometheus::PrometheusApi;
use crate::services::reconciliation::ReconciliationEngine;
use crate::services::snapshot_store::SnapshotStore;

pub const SYNC_JOB: &str = "leaderboard-sync";

/// Mirrors the upstream ranked leaderboards into the local cache table.
pub struct LeaderboardSync {
    store: SnapshotStore,
    upstream: Arc<dyn PrometheusApi>,
    engine: Arc<ReconciliationEngine>,
    regions: Vec<Region>,
    page_size: u32,
    with_history: bool,
    running: Mutex<()>,
}

impl LeaderboardSync {
    pub fn new(
        store: SnapshotStore,
        upstream: Arc<dyn PrometheusApi>,
        engine: Arc<ReconciliationEngine>,
        regions: Vec<Region>,
        page_size: u32,
        with_history: bool,
    ) -> Self {
        Self {
            store,
            upstream,
            engine,
            regions,
            page_size: page_size.max(1),
            with_history,
            running: Mutex::new(()),
        }
    }

    /// Syncs every configured region. Regions are independent and run
    /// concurrently; pages within a region are fetched in order. A second
    /// run while one is in flight is rejected.
    pub async fn run(&self) -> StrikrResult<SyncReport> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| StrikrError::JobAlreadyRunning(SYNC_JOB))?;

        info!(regions = self.regions.len(), with_history = self.with_history, "Starting leaderboard sync");

        let regions = join_all(self.regions.iter().map(|region| self.sync_region(*region))).await;
        let report = SyncReport { regions };

        info!(rows = report.rows_written(), "Leaderboard sync finished");
        Ok(report)
    }

    pub async fn sync_region(&self, region: Region) -> RegionSyncReport {
        let mut report = RegionSyncReport::new(region);

        match self.store.clear_leaderboard_region(region).await {
            Ok(cleared) => info!(%region, cleared, "Cleared leaderboard region"),
            Err(e) => {
                error!(%region, error = %e, "Failed to clear leaderboard region");
                report.aborted = true;
                return report;
            }
        }

        let mut offset: u32 = 0;
        loop {
            let page = match self
                .upstream
                .get_leaderboard_page(region, offset, self.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(%region, offset, error = %e, "Failed to fetch leaderboard page");
                    report.aborted = true;
                    break;
                }
            };
            report.pages += 1;

            let now = Utc::now();
            for player in &page.players {
                if let Err(e) = self.store.upsert_leaderboard_entry(region, player, now).await {
                    warn!(%region, player_id = %player.player_id, error = %e, "Failed to store leaderboard row");
                    report.row_failures += 1;
                    continue;
                }
                report.rows_written += 1;

                if self.with_history {
                    if let Err(e) = self
                        .engine
                        .ensure_player(&player.username, true, Some(region))
                        .await
                    {
                        warn!(%region, username = %player.username, error = %e, "Failed to snapshot player");
                        report.history_failures += 1;
                    }
                }
            }

            let next = i64::from(offset) + i64::from(self.page_size);
            if page.paging.total_items <= next || page.players.is_empty() {
                break;
            }
            offset += self.page_size;
        }

        info!(
            %region,
            pages = report.pages,
            rows = report.rows_written,
            failures = report.row_failures,
            "Synced leaderboard region"
        );
        report
    }
}
