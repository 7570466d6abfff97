use chrono::{DateTime, Days, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::dto::leaderboard_dto::{LeaderboardEntry, LeaderboardFilter, SortOrder};
use crate::dto::player_dto::{
    NewCharacterRating, Player, PlayerCharacterRating, PlayerProfile, PlayerRating, StatLine,
};
use crate::dto::prometheus_dto::LeaderboardPlayer;
use crate::dto::region_dto::Region;

const PLAYER_COLUMNS: &str = "id, username, region, current_xp, logo_id, emoticon_id, title_id, \
     nameplate_id, social_url, tags, created_at, updated_at";

const RATING_COLUMNS: &str =
    "id, player_id, rating, rank, wins, losses, games, mastery_level, created_at";

const CHARACTER_RATING_COLUMNS: &str = "id, player_id, character, role, gamemode, wins, losses, \
     knockouts, scores, mvp, saves, assists, games, created_at";

const LEADERBOARD_COLUMNS: &str = "player_id, region, username, rank, rating, wins, losses, games, \
     mastery_level, top_role, logo_id, emoticon_id, title_id, nameplate_id, social_url, tags, \
     created_at";

/// How the day's rating sample is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotWrite {
    /// New rating row plus a full new character batch.
    Create,
    /// Overwrite this rating row and replace the day's character batch.
    UpdateInPlace { rating_id: i64 },
}

fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start.checked_add_days(Days::new(1)).unwrap_or(start);
    (start, end)
}

/// Relational store for players, their rating time-series and the
/// denormalized leaderboard cache.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /* Players */

    pub async fn find_player_by_username(&self, username: &str) -> Result<Option<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_player(&self, id: &str) -> Result<Option<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_players(
        &self,
        region: Option<Region>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Player>, sqlx::Error> {
        match region {
            Some(region) => {
                sqlx::query_as::<_, Player>(&format!(
                    "SELECT {PLAYER_COLUMNS} FROM players WHERE region = ? \
                     ORDER BY username LIMIT ? OFFSET ?"
                ))
                .bind(region.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Player>(&format!(
                    "SELECT {PLAYER_COLUMNS} FROM players ORDER BY username LIMIT ? OFFSET ?"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    /* Rating history */

    pub async fn latest_rating(&self, player_id: &str) -> Result<Option<PlayerRating>, sqlx::Error> {
        Ok(self.latest_ratings(player_id, 1).await?.into_iter().next())
    }

    /// Newest-first rating samples.
    pub async fn latest_ratings(&self, player_id: &str, take: i64) -> Result<Vec<PlayerRating>, sqlx::Error> {
        sqlx::query_as::<_, PlayerRating>(&format!(
            "SELECT {RATING_COLUMNS} FROM player_ratings WHERE player_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(player_id)
        .bind(take)
        .fetch_all(&self.pool)
        .await
    }

    /// Newest sample for each `(character, role, gamemode)` of a player.
    pub async fn latest_character_ratings(
        &self,
        player_id: &str,
        take: i64,
    ) -> Result<Vec<PlayerCharacterRating>, sqlx::Error> {
        sqlx::query_as::<_, PlayerCharacterRating>(&format!(
            "SELECT {CHARACTER_RATING_COLUMNS} FROM ( \
                SELECT *, ROW_NUMBER() OVER ( \
                    PARTITION BY character, role, gamemode \
                    ORDER BY created_at DESC, id DESC \
                ) AS rn \
                FROM player_character_ratings WHERE player_id = ? \
             ) WHERE rn = 1 \
             ORDER BY created_at DESC, character, role LIMIT ?"
        ))
        .bind(player_id)
        .bind(take)
        .fetch_all(&self.pool)
        .await
    }

    /// Moves the newest rating row and the newest character batch to `now`,
    /// bumps `players.updated_at` and records the current username.
    /// Returns the refreshed player.
    pub async fn touch_latest_snapshots(
        &self,
        player_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Player, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE player_ratings SET created_at = ? WHERE id = ( \
                SELECT id FROM player_ratings WHERE player_id = ? \
                ORDER BY created_at DESC, id DESC LIMIT 1 \
             )",
        )
        .bind(now)
        .bind(player_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE player_character_ratings SET created_at = ? \
             WHERE player_id = ? AND created_at = ( \
                SELECT MAX(created_at) FROM player_character_ratings WHERE player_id = ? \
             )",
        )
        .bind(now)
        .bind(player_id)
        .bind(player_id)
        .execute(&mut *tx)
        .await?;

        let player = sqlx::query_as::<_, Player>(&format!(
            "UPDATE players SET updated_at = ?, username = ? WHERE id = ? RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(now)
        .bind(username)
        .bind(player_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(player)
    }

    /// Writes one reconciliation result atomically: the player row is
    /// upserted, then the day's sample is created or overwritten.
    pub async fn write_snapshot(
        &self,
        profile: &PlayerProfile,
        stat_line: StatLine,
        characters: &[NewCharacterRating],
        mode: SnapshotWrite,
        now: DateTime<Utc>,
    ) -> Result<Player, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let player = upsert_player(&mut tx, profile, now).await?;

        match mode {
            SnapshotWrite::Create => {
                sqlx::query(
                    "INSERT INTO player_ratings \
                     (player_id, rating, rank, wins, losses, games, mastery_level, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&profile.id)
                .bind(stat_line.rating)
                .bind(stat_line.rank)
                .bind(stat_line.wins)
                .bind(stat_line.losses)
                .bind(stat_line.games)
                .bind(stat_line.mastery_level)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            SnapshotWrite::UpdateInPlace { rating_id } => {
                sqlx::query(
                    "UPDATE player_ratings SET rating = ?, rank = ?, wins = ?, losses = ?, \
                     games = ?, mastery_level = ?, created_at = ? WHERE id = ? AND player_id = ?",
                )
                .bind(stat_line.rating)
                .bind(stat_line.rank)
                .bind(stat_line.wins)
                .bind(stat_line.losses)
                .bind(stat_line.games)
                .bind(stat_line.mastery_level)
                .bind(now)
                .bind(rating_id)
                .bind(&profile.id)
                .execute(&mut *tx)
                .await?;

                let (day_start, day_end) = day_bounds(now);
                sqlx::query(
                    "DELETE FROM player_character_ratings \
                     WHERE player_id = ? AND created_at >= ? AND created_at < ?",
                )
                .bind(&profile.id)
                .bind(day_start)
                .bind(day_end)
                .execute(&mut *tx)
                .await?;
            }
        }

        for character in characters {
            insert_character_rating(&mut tx, &profile.id, character, now).await?;
        }

        tx.commit().await?;
        Ok(player)
    }

    /* Leaderboard cache */

    pub async fn clear_leaderboard_region(&self, region: Region) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM leaderboard WHERE region = ?")
            .bind(region.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn upsert_leaderboard_entry(
        &self,
        region: Region,
        player: &LeaderboardPlayer,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO leaderboard (
                player_id, region, username, rank, rating, wins, losses, games,
                mastery_level, top_role, logo_id, emoticon_id, title_id, nameplate_id,
                social_url, tags, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(player_id, region) DO UPDATE SET
                username = excluded.username,
                rank = excluded.rank,
                rating = excluded.rating,
                wins = excluded.wins,
                losses = excluded.losses,
                games = excluded.games,
                mastery_level = excluded.mastery_level,
                top_role = excluded.top_role,
                logo_id = excluded.logo_id,
                emoticon_id = excluded.emoticon_id,
                title_id = excluded.title_id,
                nameplate_id = excluded.nameplate_id,
                social_url = excluded.social_url,
                tags = excluded.tags,
                created_at = excluded.created_at
            "#,
        )
        .bind(&player.player_id)
        .bind(region.as_str())
        .bind(&player.username)
        .bind(player.rank)
        .bind(player.rating.unwrap_or(0))
        .bind(player.wins.unwrap_or(0))
        .bind(player.losses.unwrap_or(0))
        .bind(player.games.unwrap_or(0))
        .bind(player.mastery_level.unwrap_or(0))
        .bind(&player.top_role)
        .bind(&player.logo_id)
        .bind(&player.emoticon_id)
        .bind(&player.title_id)
        .bind(&player.nameplate_id)
        .bind(&player.social_url)
        .bind(Json(&player.tags))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn query_leaderboard(
        &self,
        region: Region,
        filter: LeaderboardFilter,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        // Column and direction come from closed enums, never from raw input.
        let sql = format!(
            "SELECT {LEADERBOARD_COLUMNS} FROM leaderboard WHERE region = ? \
             ORDER BY {} {}, rank ASC LIMIT ? OFFSET ?",
            filter.column(),
            order.keyword()
        );

        sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(region.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_leaderboard_region(&self, region: Region) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leaderboard WHERE region = ?")
            .bind(region.as_str())
            .fetch_one(&self.pool)
            .await
    }

    /* Dedup support */

    pub async fn all_ratings(&self) -> Result<Vec<PlayerRating>, sqlx::Error> {
        sqlx::query_as::<_, PlayerRating>(&format!(
            "SELECT {RATING_COLUMNS} FROM player_ratings ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn all_character_ratings(&self) -> Result<Vec<PlayerCharacterRating>, sqlx::Error> {
        sqlx::query_as::<_, PlayerCharacterRating>(&format!(
            "SELECT {CHARACTER_RATING_COLUMNS} FROM player_character_ratings \
             ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Deletes every rating row and reinserts `keep` with their original ids.
    pub async fn replace_all_ratings(&self, keep: &[PlayerRating]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM player_ratings").execute(&mut *tx).await?;

        for rating in keep {
            sqlx::query(
                "INSERT INTO player_ratings \
                 (id, player_id, rating, rank, wins, losses, games, mastery_level, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(rating.id)
            .bind(&rating.player_id)
            .bind(rating.rating)
            .bind(rating.rank)
            .bind(rating.wins)
            .bind(rating.losses)
            .bind(rating.games)
            .bind(rating.mastery_level)
            .bind(rating.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    pub async fn replace_all_character_ratings(
        &self,
        keep: &[PlayerCharacterRating],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM player_character_ratings")
            .execute(&mut *tx)
            .await?;

        for rating in keep {
            sqlx::query(
                "INSERT INTO player_character_ratings \
                 (id, player_id, character, role, gamemode, wins, losses, knockouts, scores, \
                  mvp, saves, assists, games, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(rating.id)
            .bind(&rating.player_id)
            .bind(&rating.character)
            .bind(&rating.role)
            .bind(&rating.gamemode)
            .bind(rating.wins)
            .bind(rating.losses)
            .bind(rating.knockouts)
            .bind(rating.scores)
            .bind(rating.mvp)
            .bind(rating.saves)
            .bind(rating.assists)
            .bind(rating.games)
            .bind(rating.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}

async fn upsert_player(
    tx: &mut Transaction<'_, Sqlite>,
    profile: &PlayerProfile,
    now: DateTime<Utc>,
) -> Result<Player, sqlx::Error> {
    sqlx::query_as::<_, Player>(&format!(
        r#"
        INSERT INTO players (
            id, username, region, current_xp, logo_id, emoticon_id, title_id,
            nameplate_id, social_url, tags, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            region = excluded.region,
            current_xp = excluded.current_xp,
            logo_id = excluded.logo_id,
            emoticon_id = excluded.emoticon_id,
            title_id = excluded.title_id,
            nameplate_id = excluded.nameplate_id,
            social_url = excluded.social_url,
            tags = excluded.tags,
            updated_at = excluded.updated_at
        RETURNING {PLAYER_COLUMNS}
        "#
    ))
    .bind(&profile.id)
    .bind(&profile.username)
    .bind(&profile.region)
    .bind(profile.current_xp)
    .bind(&profile.logo_id)
    .bind(&profile.emoticon_id)
    .bind(&profile.title_id)
    .bind(&profile.nameplate_id)
    .bind(&profile.social_url)
    .bind(Json(&profile.tags))
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

async fn insert_character_rating(
    tx: &mut Transaction<'_, Sqlite>,
    player_id: &str,
    rating: &NewCharacterRating,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO player_character_ratings \
         (player_id, character, role, gamemode, wins, losses, knockouts, scores, mvp, saves, \
          assists, games, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(player_id)
    .bind(&rating.character)
    .bind(rating.role.as_str())
    .bind(rating.gamemode.as_str())
    .bind(rating.stat.wins)
    .bind(rating.stat.losses)
    .bind(rating.stat.knockouts)
    .bind(rating.stat.scores)
    .bind(rating.stat.mvp)
    .bind(rating.stat.saves)
    .bind(rating.stat.assists)
    .bind(rating.stat.games)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
