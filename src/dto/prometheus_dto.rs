//! Wire types of the Prometheus/Odyssey ranked API.

use serde::{Deserialize, Serialize};

use crate::dto::player_dto::UNRANKED_RANK;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub player_id: String,
    pub username: String,
    #[serde(default)]
    pub logo_id: Option<String>,
    #[serde(default)]
    pub emoticon_id: Option<String>,
    #[serde(default)]
    pub title_id: Option<String>,
    #[serde(default)]
    pub nameplate_id: Option<String>,
    #[serde(default)]
    pub social_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mastery_level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default)]
    pub start_rank: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub total_items: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerQuery {
    #[serde(default)]
    pub matches: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMastery {
    pub current_level: i64,
    pub current_level_xp: i64,
    #[serde(default)]
    pub xp_to_next_level: i64,
    #[serde(default)]
    pub total_xp: i64,
}

/// Stat bucket a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingName {
    RankedInitial,
    NormalInitial,
    #[serde(other)]
    None,
}

impl RatingName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingName::RankedInitial => "RankedInitial",
            RatingName::NormalInitial => "NormalInitial",
            RatingName::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Forward,
    Goalie,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Forward => "Forward",
            Role::Goalie => "Goalie",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RoleStat {
    pub assists: i64,
    pub games: i64,
    pub knockouts: i64,
    pub losses: i64,
    pub mvp: i64,
    pub saves: i64,
    pub scores: i64,
    pub wins: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RoleStats {
    #[serde(rename = "Forward")]
    pub forward: RoleStat,
    #[serde(rename = "Goalie")]
    pub goalie: RoleStat,
}

impl RoleStats {
    pub fn get(&self, role: Role) -> &RoleStat {
        match role {
            Role::Forward => &self.forward,
            Role::Goalie => &self.goalie,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStat {
    pub rating_name: RatingName,
    #[serde(default)]
    pub role_stats: RoleStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterStat {
    pub character_id: String,
    pub rating_name: RatingName,
    #[serde(default)]
    pub role_stats: RoleStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    #[serde(default)]
    pub player_stats: Vec<PlayerStat>,
    #[serde(default)]
    pub character_stats: Vec<CharacterStat>,
}

impl PlayerStats {
    /// Sums `Forward + Goalie` of the ranked bucket for one stat line.
    /// `None` when the player has no ranked bucket at all.
    pub fn ranked_total(&self, pick: impl Fn(&RoleStat) -> i64) -> Option<i64> {
        let mut ranked = self
            .player_stats
            .iter()
            .filter(|stat| stat.rating_name == RatingName::RankedInitial)
            .peekable();
        ranked.peek()?;
        Some(ranked.map(|stat| pick(&stat.role_stats.forward) + pick(&stat.role_stats.goalie)).sum())
    }
}

/// One row of a ranked leaderboard page or search window. Stat columns
/// the upstream leaves out stay `None` so callers can fall back per value.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPlayer {
    pub player_id: String,
    pub username: String,
    #[serde(default = "unranked")]
    pub rank: i64,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub wins: Option<i64>,
    #[serde(default)]
    pub losses: Option<i64>,
    #[serde(default)]
    pub games: Option<i64>,
    #[serde(default)]
    pub mastery_level: Option<i64>,
    #[serde(default)]
    pub top_role: Option<String>,
    #[serde(default)]
    pub logo_id: Option<String>,
    #[serde(default)]
    pub emoticon_id: Option<String>,
    #[serde(default)]
    pub title_id: Option<String>,
    #[serde(default)]
    pub nameplate_id: Option<String>,
    #[serde(default)]
    pub social_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeaderboardPage {
    #[serde(default)]
    pub players: Vec<LeaderboardPlayer>,
    #[serde(default)]
    pub paging: Paging,
}

fn unranked() -> i64 {
    UNRANKED_RANK
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginToken {
    pub jwt: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(rating_name: RatingName, wins: i64, goalie_wins: i64) -> PlayerStat {
        PlayerStat {
            rating_name,
            role_stats: RoleStats {
                forward: RoleStat { wins, ..Default::default() },
                goalie: RoleStat { wins: goalie_wins, ..Default::default() },
            },
        }
    }

    #[test]
    fn ranked_total_sums_both_roles_of_ranked_bucket_only() {
        let stats = PlayerStats {
            player_stats: vec![
                stat(RatingName::NormalInitial, 100, 100),
                stat(RatingName::RankedInitial, 12, 3),
            ],
            character_stats: vec![],
        };
        assert_eq!(stats.ranked_total(|s| s.wins), Some(15));
    }

    #[test]
    fn ranked_total_is_absent_without_ranked_bucket() {
        let stats = PlayerStats {
            player_stats: vec![stat(RatingName::NormalInitial, 4, 4)],
            character_stats: vec![],
        };
        assert_eq!(stats.ranked_total(|s| s.wins), None);
    }

    #[test]
    fn leaderboard_row_keeps_missing_stat_columns_absent() {
        let row: LeaderboardPlayer = serde_json::from_str(
            r#"{"playerId":"p-1","username":"Pogo","rank":3,"rating":2500,"wins":0}"#,
        )
        .unwrap();
        assert_eq!(row.rating, Some(2500));
        assert_eq!(row.wins, Some(0));
        assert_eq!((row.losses, row.games, row.mastery_level), (None, None, None));
    }

    #[test]
    fn leaderboard_row_without_rank_is_unranked() {
        let row: LeaderboardPlayer =
            serde_json::from_str(r#"{"playerId":"p-1","username":"Pogo"}"#).unwrap();
        assert_eq!(row.rank, UNRANKED_RANK);
        assert_eq!(row.rating, None);
    }

    #[test]
    fn unknown_rating_bucket_deserializes_as_none() {
        let parsed: CharacterStat = serde_json::from_str(
            r#"{"characterId":"C1","ratingName":"CasualBrawl","roleStats":{"Forward":{"wins":2}}}"#,
        )
        .unwrap();
        assert_eq!(parsed.rating_name, RatingName::None);
        assert_eq!(parsed.role_stats.forward.wins, 2);
        assert_eq!(parsed.role_stats.goalie, RoleStat::default());
    }
}
