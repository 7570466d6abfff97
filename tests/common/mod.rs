//! Shared fixtures: an in-memory store and a recording fake of the ranked API.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;

use strikr_backend::config::DatabaseConfig;
use strikr_backend::db;
use strikr_backend::dto::prometheus_dto::{
    CharacterStat, LeaderboardPage, LeaderboardPlayer, Paging, PlayerMastery, PlayerStat,
    PlayerStats, PlayerSummary, RatingName, RoleStat, RoleStats,
};
use strikr_backend::dto::region_dto::Region;
use strikr_backend::error::UpstreamError;
use strikr_backend::services::prometheus::PrometheusApi;
use strikr_backend::services::reconciliation::ReconciliationEngine;
use strikr_backend::services::region_resolver::RegionResolver;
use strikr_backend::services::snapshot_store::SnapshotStore;

pub const RESOLVER_TIMEOUT: Duration = Duration::from_millis(200);

pub async fn test_store() -> SnapshotStore {
    let pool = db::create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("in-memory pool");
    db::run_migrations(&pool).await.expect("migrations");
    SnapshotStore::new(pool)
}

pub fn engine(store: &SnapshotStore, fake: &Arc<FakePrometheus>) -> ReconciliationEngine {
    let upstream: Arc<dyn PrometheusApi> = fake.clone();
    let resolver = RegionResolver::new(upstream.clone(), RESOLVER_TIMEOUT);
    ReconciliationEngine::new(store.clone(), upstream, resolver)
}

pub fn summary(player_id: &str, username: &str) -> PlayerSummary {
    PlayerSummary {
        player_id: player_id.to_string(),
        username: username.to_string(),
        logo_id: Some("logo-1".to_string()),
        emoticon_id: Some("emote-1".to_string()),
        title_id: None,
        nameplate_id: None,
        social_url: None,
        tags: vec!["EU".to_string()],
        mastery_level: 20,
    }
}

pub fn entry(player_id: &str, username: &str, rank: i64) -> LeaderboardPlayer {
    LeaderboardPlayer {
        player_id: player_id.to_string(),
        username: username.to_string(),
        rank,
        rating: Some(3000 - rank),
        wins: Some(50),
        losses: Some(20),
        games: Some(70),
        mastery_level: Some(31),
        top_role: Some("Forward".to_string()),
        ..Default::default()
    }
}

/// Stats with two characters in the ranked bucket and no overall ranked line.
pub fn character_stats() -> PlayerStats {
    let role = |wins| RoleStats {
        forward: RoleStat { wins, games: wins * 2, ..Default::default() },
        goalie: RoleStat { saves: wins, games: wins, ..Default::default() },
    };
    PlayerStats {
        player_stats: vec![PlayerStat {
            rating_name: RatingName::NormalInitial,
            role_stats: role(3),
        }],
        character_stats: vec![
            CharacterStat {
                character_id: "CD_Juliette".to_string(),
                rating_name: RatingName::RankedInitial,
                role_stats: role(4),
            },
            CharacterStat {
                character_id: "CD_Asher".to_string(),
                rating_name: RatingName::RankedInitial,
                role_stats: role(1),
            },
        ],
    }
}

#[derive(Default)]
pub struct FakePrometheus {
    pub players: Mutex<HashMap<String, PlayerSummary>>,
    pub mastery: Mutex<HashMap<String, PlayerMastery>>,
    pub stats: Mutex<HashMap<String, PlayerStats>>,
    pub boards: Mutex<HashMap<Region, Vec<LeaderboardPlayer>>>,
    pub failing_regions: Mutex<HashSet<Region>>,
    pub slow_regions: Mutex<HashSet<Region>>,
    pub searched: Mutex<Vec<Region>>,
    pub pages_requested: Mutex<Vec<(Region, u32)>>,
    pub username_lookups: Mutex<u32>,
}

impl FakePrometheus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a player with mastery XP and the default character stats.
    pub fn add_player(&self, player_id: &str, username: &str, xp: i64) {
        self.players
            .lock()
            .unwrap()
            .insert(username.to_lowercase(), summary(player_id, username));
        self.set_xp(player_id, xp);
        self.stats
            .lock()
            .unwrap()
            .insert(player_id.to_string(), character_stats());
    }

    /// Moves a player to a new username, keeping id, XP and stats.
    pub fn rename_player(&self, old: &str, new: &str) {
        let mut players = self.players.lock().unwrap();
        let mut summary = players.remove(&old.to_lowercase()).expect("known player");
        summary.username = new.to_string();
        players.insert(new.to_lowercase(), summary);
    }

    pub fn set_xp(&self, player_id: &str, xp: i64) {
        self.mastery.lock().unwrap().insert(
            player_id.to_string(),
            PlayerMastery {
                current_level: 20,
                current_level_xp: xp,
                xp_to_next_level: 1000,
                total_xp: 50_000 + xp,
            },
        );
    }

    pub fn set_board(&self, region: Region, players: Vec<LeaderboardPlayer>) {
        self.boards.lock().unwrap().insert(region, players);
    }

    pub fn fail_region(&self, region: Region) {
        self.failing_regions.lock().unwrap().insert(region);
    }

    pub fn slow_region(&self, region: Region) {
        self.slow_regions.lock().unwrap().insert(region);
    }

    pub fn searched(&self) -> Vec<Region> {
        self.searched.lock().unwrap().clone()
    }

    pub fn clear_searched(&self) {
        self.searched.lock().unwrap().clear();
    }

    pub fn username_lookups(&self) -> u32 {
        *self.username_lookups.lock().unwrap()
    }

    fn region_failure(&self, region: Region) -> Option<UpstreamError> {
        self.failing_regions
            .lock()
            .unwrap()
            .contains(&region)
            .then(|| UpstreamError::Status {
                status: 503,
                path: format!("leaderboard/{region}"),
            })
    }
}

#[async_trait]
impl PrometheusApi for FakePrometheus {
    async fn find_player_by_username(
        &self,
        username: &str,
    ) -> Result<Option<PlayerSummary>, UpstreamError> {
        *self.username_lookups.lock().unwrap() += 1;
        Ok(self.players.lock().unwrap().get(&username.to_lowercase()).cloned())
    }

    async fn get_player_mastery(&self, player_id: &str) -> Result<PlayerMastery, UpstreamError> {
        self.mastery
            .lock()
            .unwrap()
            .get(player_id)
            .cloned()
            .ok_or(UpstreamError::Status {
                status: 404,
                path: format!("v1/mastery/{player_id}/player"),
            })
    }

    async fn get_player_stats(&self, player_id: &str) -> Result<PlayerStats, UpstreamError> {
        Ok(self
            .stats
            .lock()
            .unwrap()
            .get(player_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_leaderboard(
        &self,
        player_id: &str,
        region: Region,
        _entries_before: u32,
        _entries_after: u32,
    ) -> Result<LeaderboardPage, UpstreamError> {
        self.searched.lock().unwrap().push(region);

        let slow = self.slow_regions.lock().unwrap().contains(&region);
        if slow {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if let Some(err) = self.region_failure(region) {
            return Err(err);
        }

        let players: Vec<LeaderboardPlayer> = self
            .boards
            .lock()
            .unwrap()
            .get(&region)
            .into_iter()
            .flatten()
            .filter(|p| p.player_id == player_id)
            .cloned()
            .collect();

        Ok(LeaderboardPage {
            paging: Paging {
                start_rank: 0,
                page_size: 0,
                total_items: players.len() as i64,
            },
            players,
        })
    }

    async fn get_leaderboard_page(
        &self,
        region: Region,
        start_rank: u32,
        page_size: u32,
    ) -> Result<LeaderboardPage, UpstreamError> {
        self.pages_requested.lock().unwrap().push((region, start_rank));
        if let Some(err) = self.region_failure(region) {
            return Err(err);
        }

        let board = self
            .boards
            .lock()
            .unwrap()
            .get(&region)
            .cloned()
            .unwrap_or_default();
        let players = board
            .iter()
            .skip(start_rank as usize)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(LeaderboardPage {
            players,
            paging: Paging {
                start_rank: i64::from(start_rank),
                page_size: i64::from(page_size),
                total_items: board.len() as i64,
            },
        })
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
