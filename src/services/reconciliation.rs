use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dto::player_dto::{
    EnsureOutcome, NewCharacterRating, Player, PlayerProfile, PlayerRecord, StatLine,
    UNRANKED_RANK,
};
use crate::dto::prometheus_dto::{LeaderboardPlayer, PlayerStats, PlayerSummary, Role, RoleStat};
use crate::dto::region_dto::Region;
use crate::error::{StrikrError, StrikrResult};
use crate::services::prometheus::PrometheusApi;
use crate::services::region_resolver::RegionResolver;
use crate::services::snapshot_store::{SnapshotStore, SnapshotWrite};

/// Rating samples attached to an ensured record.
pub const RECORD_RATINGS: i64 = 7;
/// Latest per-character samples attached to an ensured record.
pub const RECORD_CHARACTER_RATINGS: i64 = 57;

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Decides, per player, whether a lookup is served from cache, touches the
/// latest sample forward, or writes today's rating sample.
pub struct ReconciliationEngine {
    store: SnapshotStore,
    upstream: Arc<dyn PrometheusApi>,
    resolver: RegionResolver,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ReconciliationEngine {
    pub fn new(store: SnapshotStore, upstream: Arc<dyn PrometheusApi>, resolver: RegionResolver) -> Self {
        Self {
            store,
            upstream,
            resolver,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub async fn ensure_player(
        &self,
        username: &str,
        refresh: bool,
        region_override: Option<Region>,
    ) -> StrikrResult<PlayerRecord> {
        self.ensure_player_at(username, refresh, region_override, Utc::now())
            .await
    }

    /// Same as [`ensure_player`](Self::ensure_player) with an explicit clock.
    pub async fn ensure_player_at(
        &self,
        username: &str,
        refresh: bool,
        region_override: Option<Region>,
        now: DateTime<Utc>,
    ) -> StrikrResult<PlayerRecord> {
        let key = normalize_username(username);
        if key.is_empty() {
            return Err(StrikrError::InvalidInput("username must not be empty".to_string()));
        }

        if !refresh {
            if let Some(cached) = self.store.find_player_by_username(&key).await? {
                info!(username = %key, "Returning cached player");
                return self.record(cached, EnsureOutcome::ReturnedCached).await;
            }
        }

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.reconcile(&key, refresh, region_override, now).await
        };

        drop(lock);
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);

        result
    }

    async fn reconcile(
        &self,
        key: &str,
        refresh: bool,
        region_override: Option<Region>,
        now: DateTime<Utc>,
    ) -> StrikrResult<PlayerRecord> {
        // Re-read under the lock: a concurrent call may have just created it.
        let cached = self.store.find_player_by_username(key).await?;
        if let (false, Some(cached)) = (refresh, &cached) {
            info!(username = %key, "Returning cached player");
            return self.record(cached.clone(), EnsureOutcome::ReturnedCached).await;
        }

        let summary = self
            .upstream
            .find_player_by_username(key)
            .await?
            .ok_or_else(|| StrikrError::PlayerNotFound(key.to_string()))?;

        if let Some(cached) = &cached {
            if cached.id != summary.player_id {
                warn!(username = %key, cached = %cached.id, upstream = %summary.player_id, "Identity mismatch");
                return Err(StrikrError::IdentityMismatch {
                    username: key.to_string(),
                    cached: cached.id.clone(),
                    upstream: summary.player_id.clone(),
                });
            }
        }

        // A renamed player is still stored under their upstream id.
        let stored = match cached {
            Some(player) => Some(player),
            None => self.store.find_player(&summary.player_id).await?,
        };
        let username = normalize_username(&summary.username);

        let mastery = self.upstream.get_player_mastery(&summary.player_id).await?;

        if let Some(stored) = &stored {
            if mastery.current_level_xp == stored.current_xp {
                debug!(username = %key, xp = stored.current_xp, "XP unchanged since last snapshot");
                let player = self
                    .store
                    .touch_latest_snapshots(&stored.id, &username, now)
                    .await?;
                info!(username = %key, "Touched latest snapshot");
                return self.record(player, EnsureOutcome::Touched).await;
            }
        }

        let stored_region = stored
            .as_ref()
            .and_then(|p| Region::from_str(&p.region).ok());
        let hint = region_override.or(stored_region);

        let resolved = match self.resolver.locate_region(&summary.player_id, hint).await {
            Ok(resolved) => {
                debug!(username = %key, region = %resolved.region, rank = resolved.entry.rank, "Resolved region");
                Some(resolved)
            }
            Err(e) => {
                debug!(username = %key, error = %e, "Region unresolved, using unranked defaults");
                None
            }
        };

        let stats = self.upstream.get_player_stats(&summary.player_id).await?;

        let region = resolved
            .as_ref()
            .map(|r| r.region)
            .or(hint)
            .unwrap_or(Region::Global);
        let entry = resolved.as_ref().map(|r| &r.entry);
        let line = stat_line(entry, &stats, summary.mastery_level);
        let characters = character_ratings(&stats);
        let profile = profile(&summary, username, region, mastery.current_level_xp);

        let latest = self.store.latest_rating(&summary.player_id).await?;
        let (mode, outcome) = match latest {
            Some(latest) if latest.created_at.date_naive() == now.date_naive() => (
                SnapshotWrite::UpdateInPlace { rating_id: latest.id },
                EnsureOutcome::SnapshotUpdated,
            ),
            _ => (SnapshotWrite::Create, EnsureOutcome::SnapshotCreated),
        };

        let player = self
            .store
            .write_snapshot(&profile, line, &characters, mode, now)
            .await?;

        info!(
            username = %key,
            region = %region,
            rank = line.rank,
            outcome = ?outcome,
            "Reconciled player snapshot"
        );

        self.record(player, outcome).await
    }

    async fn record(&self, player: Player, outcome: EnsureOutcome) -> StrikrResult<PlayerRecord> {
        let ratings = self.store.latest_ratings(&player.id, RECORD_RATINGS).await?;
        let character_ratings = self
            .store
            .latest_character_ratings(&player.id, RECORD_CHARACTER_RATINGS)
            .await?;

        Ok(PlayerRecord {
            player,
            outcome,
            ratings,
            character_ratings,
        })
    }
}

/// Stat line for today's sample. Each value comes from the leaderboard
/// entry when it carries one, then from the ranked-bucket totals, then
/// zero. Rank without an entry is always 10001.
pub fn stat_line(entry: Option<&LeaderboardPlayer>, stats: &PlayerStats, summary_mastery: i64) -> StatLine {
    let ranked = |from_entry: Option<i64>, pick: fn(&RoleStat) -> i64| {
        from_entry
            .or_else(|| stats.ranked_total(pick))
            .unwrap_or(0)
    };

    StatLine {
        rating: entry.and_then(|e| e.rating).unwrap_or(0),
        rank: entry.map_or(UNRANKED_RANK, |e| e.rank),
        wins: ranked(entry.and_then(|e| e.wins), |s| s.wins),
        losses: ranked(entry.and_then(|e| e.losses), |s| s.losses),
        games: ranked(entry.and_then(|e| e.games), |s| s.games),
        mastery_level: entry
            .and_then(|e| e.mastery_level)
            .filter(|level| *level > 0)
            .unwrap_or(summary_mastery),
    }
}

pub fn character_ratings(stats: &PlayerStats) -> Vec<NewCharacterRating> {
    stats
        .character_stats
        .iter()
        .flat_map(|cs| {
            [Role::Forward, Role::Goalie].map(|role| NewCharacterRating {
                character: cs.character_id.clone(),
                role,
                gamemode: cs.rating_name,
                stat: *cs.role_stats.get(role),
            })
        })
        .collect()
}

fn profile(summary: &PlayerSummary, username: String, region: Region, current_xp: i64) -> PlayerProfile {
    PlayerProfile {
        id: summary.player_id.clone(),
        username,
        region: region.as_str().to_string(),
        current_xp,
        logo_id: summary.logo_id.clone(),
        emoticon_id: summary.emoticon_id.clone(),
        title_id: summary.title_id.clone(),
        nameplate_id: summary.nameplate_id.clone(),
        social_url: summary.social_url.clone(),
        tags: summary.tags.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::prometheus_dto::{CharacterStat, PlayerStat, RatingName, RoleStats};

    fn ranked(wins: i64, losses: i64, games: i64) -> PlayerStats {
        PlayerStats {
            player_stats: vec![PlayerStat {
                rating_name: RatingName::RankedInitial,
                role_stats: RoleStats {
                    forward: RoleStat { wins, losses, games, ..Default::default() },
                    goalie: RoleStat { wins: 1, losses: 1, games: 2, ..Default::default() },
                },
            }],
            character_stats: vec![],
        }
    }

    #[test]
    fn unranked_player_without_ranked_bucket_gets_sentinels() {
        let line = stat_line(None, &PlayerStats::default(), 0);
        assert_eq!(line, StatLine::unranked());
    }

    #[test]
    fn unranked_player_falls_back_to_ranked_totals() {
        let line = stat_line(None, &ranked(10, 5, 15), 42);
        assert_eq!(line.rank, UNRANKED_RANK);
        assert_eq!(line.rating, 0);
        assert_eq!((line.wins, line.losses, line.games), (11, 6, 17));
        assert_eq!(line.mastery_level, 42);
    }

    #[test]
    fn leaderboard_entry_wins_over_stats() {
        let entry = LeaderboardPlayer {
            rank: 12,
            rating: Some(2100),
            wins: Some(80),
            losses: Some(20),
            games: Some(100),
            mastery_level: Some(0),
            ..Default::default()
        };
        let line = stat_line(Some(&entry), &ranked(1, 1, 2), 33);
        assert_eq!((line.rank, line.rating, line.wins, line.games), (12, 2100, 80, 100));
        assert_eq!(line.mastery_level, 33);
    }

    #[test]
    fn missing_entry_stats_fall_back_per_value() {
        let entry = LeaderboardPlayer {
            rank: 64,
            wins: Some(30),
            ..Default::default()
        };
        let line = stat_line(Some(&entry), &ranked(10, 5, 15), 18);
        assert_eq!(line.rank, 64);
        assert_eq!(line.rating, 0);
        assert_eq!(line.wins, 30);
        assert_eq!((line.losses, line.games), (6, 17));
        assert_eq!(line.mastery_level, 18);
    }

    #[test]
    fn missing_entry_stats_without_ranked_bucket_are_zero() {
        let entry = LeaderboardPlayer {
            rank: 64,
            ..Default::default()
        };
        let line = stat_line(Some(&entry), &PlayerStats::default(), 0);
        assert_eq!(line.rank, 64);
        assert_eq!((line.rating, line.wins, line.losses, line.games), (0, 0, 0, 0));
    }

    #[test]
    fn two_character_rows_per_character_stat() {
        let stats = PlayerStats {
            player_stats: vec![],
            character_stats: vec![
                CharacterStat {
                    character_id: "CD_Juliette".to_string(),
                    rating_name: RatingName::RankedInitial,
                    role_stats: RoleStats {
                        forward: RoleStat { wins: 3, ..Default::default() },
                        goalie: RoleStat { saves: 9, ..Default::default() },
                    },
                },
                CharacterStat {
                    character_id: "CD_Kai".to_string(),
                    rating_name: RatingName::NormalInitial,
                    role_stats: RoleStats::default(),
                },
            ],
        };

        let rows = character_ratings(&stats);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].role, Role::Forward);
        assert_eq!(rows[0].stat.wins, 3);
        assert_eq!(rows[1].role, Role::Goalie);
        assert_eq!(rows[1].stat.saves, 9);
        assert_eq!(rows[3].gamemode, RatingName::NormalInitial);
    }

    #[test]
    fn usernames_normalize_to_trimmed_lowercase() {
        assert_eq!(normalize_username("  PlayerOne "), "playerone");
    }
}
