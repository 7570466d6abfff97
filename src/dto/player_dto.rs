use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::dto::prometheus_dto::{RatingName, Role, RoleStat};

/// Rank stored for players below the tracked leaderboard floor.
pub const UNRANKED_RANK: i64 = 10_001;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Player {
    pub id: String,
    pub username: String,
    pub region: String,
    pub current_xp: i64,
    pub logo_id: Option<String>,
    pub emoticon_id: Option<String>,
    pub title_id: Option<String>,
    pub nameplate_id: Option<String>,
    pub social_url: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct PlayerRating {
    pub id: i64,
    pub player_id: String,
    pub rating: i64,
    pub rank: i64,
    pub wins: i64,
    pub losses: i64,
    pub games: i64,
    pub mastery_level: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct PlayerCharacterRating {
    pub id: i64,
    pub player_id: String,
    pub character: String,
    pub role: String,
    pub gamemode: String,
    pub wins: i64,
    pub losses: i64,
    pub knockouts: i64,
    pub scores: i64,
    pub mvp: i64,
    pub saves: i64,
    pub assists: i64,
    pub games: i64,
    pub created_at: DateTime<Utc>,
}

/// Overall ranked standing captured by one rating sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatLine {
    pub rating: i64,
    pub rank: i64,
    pub wins: i64,
    pub losses: i64,
    pub games: i64,
    pub mastery_level: i64,
}

impl StatLine {
    pub fn unranked() -> Self {
        Self {
            rating: 0,
            rank: UNRANKED_RANK,
            wins: 0,
            losses: 0,
            games: 0,
            mastery_level: 0,
        }
    }
}

/// One per-character, per-role sample to be inserted.
#[derive(Debug, Clone)]
pub struct NewCharacterRating {
    pub character: String,
    pub role: Role,
    pub gamemode: RatingName,
    pub stat: RoleStat,
}

/// Identity and cosmetic fields written onto the `players` row.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub id: String,
    pub username: String,
    pub region: String,
    pub current_xp: i64,
    pub logo_id: Option<String>,
    pub emoticon_id: Option<String>,
    pub title_id: Option<String>,
    pub nameplate_id: Option<String>,
    pub social_url: Option<String>,
    pub tags: Vec<String>,
}

/// Which branch of the ensure procedure produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnsureOutcome {
    ReturnedCached,
    Touched,
    SnapshotCreated,
    SnapshotUpdated,
}

#[derive(Debug, Serialize, Clone)]
pub struct PlayerRecord {
    #[serde(flatten)]
    pub player: Player,
    pub outcome: EnsureOutcome,
    pub ratings: Vec<PlayerRating>,
    pub character_ratings: Vec<PlayerCharacterRating>,
}

#[derive(Debug, Deserialize)]
pub struct EnsurePlayerParams {
    #[serde(default)]
    pub refresh: bool,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListPlayersParams {
    pub region: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub take: Option<i64>,
}
