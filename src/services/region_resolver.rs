use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::dto::prometheus_dto::LeaderboardPlayer;
use crate::dto::region_dto::Region;
use crate::services::prometheus::PrometheusApi;

/// Global entries ranked past this are treated as "looking for their
/// regional board" and skipped in favour of the next candidate region.
pub const GLOBAL_INTENT_CUTOFF: i64 = 100;

#[derive(Debug, Clone)]
pub struct ResolvedRegion {
    pub region: Region,
    pub entry: LeaderboardPlayer,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegionResolutionError {
    #[error("player {0} not found on any tracked leaderboard")]
    NotOnLeaderboard(String),
}

pub struct RegionResolver {
    upstream: Arc<dyn PrometheusApi>,
    per_region_timeout: Duration,
}

impl RegionResolver {
    pub fn new(upstream: Arc<dyn PrometheusApi>, per_region_timeout: Duration) -> Self {
        Self {
            upstream,
            per_region_timeout,
        }
    }

    /// Finds the leaderboard currently holding `player_id`.
    ///
    /// A non-Global hint restricts the search to that region. Otherwise
    /// regions are tried in [`Region::SEARCH_ORDER`] until one returns an
    /// entry. Upstream errors and timeouts for a region count as a miss.
    pub async fn locate_region(
        &self,
        player_id: &str,
        preferred: Option<Region>,
    ) -> Result<ResolvedRegion, RegionResolutionError> {
        let candidates: Vec<Region> = match preferred {
            Some(region) if !region.is_global() => vec![region],
            _ => Region::SEARCH_ORDER.to_vec(),
        };

        for region in candidates {
            debug!(player_id, %region, "Checking leaderboard region");

            let search = self.upstream.search_leaderboard(player_id, region, 0, 0);
            let page = match tokio::time::timeout(self.per_region_timeout, search).await {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => {
                    warn!(player_id, %region, error = %e, "Leaderboard search failed");
                    continue;
                }
                Err(_) => {
                    warn!(player_id, %region, "Leaderboard search timed out");
                    continue;
                }
            };

            let Some(entry) = page.players.into_iter().next() else {
                continue;
            };

            if region.is_global() && entry.rank > GLOBAL_INTENT_CUTOFF {
                debug!(player_id, rank = entry.rank, "Global rank past cutoff, trying regional boards");
                continue;
            }

            return Ok(ResolvedRegion { region, entry });
        }

        Err(RegionResolutionError::NotOnLeaderboard(player_id.to_string()))
    }
}
