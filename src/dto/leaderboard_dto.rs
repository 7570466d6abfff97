use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub region: String,
    pub username: String,
    pub rank: i64,
    pub rating: i64,
    pub wins: i64,
    pub losses: i64,
    pub games: i64,
    pub mastery_level: i64,
    pub top_role: Option<String>,
    pub logo_id: Option<String>,
    pub emoticon_id: Option<String>,
    pub title_id: Option<String>,
    pub nameplate_id: Option<String>,
    pub social_url: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Sortable leaderboard columns exposed to the query layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LeaderboardFilter {
    #[default]
    Rank,
    Wins,
    Losses,
    Rating,
    MasteryLevel,
}

impl LeaderboardFilter {
    pub fn column(&self) -> &'static str {
        match self {
            LeaderboardFilter::Rank => "rank",
            LeaderboardFilter::Wins => "wins",
            LeaderboardFilter::Losses => "losses",
            LeaderboardFilter::Rating => "rating",
            LeaderboardFilter::MasteryLevel => "mastery_level",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    pub region: Option<String>,
    #[serde(default)]
    pub filter_by: LeaderboardFilter,
    #[serde(default)]
    pub order: SortOrder,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}
