use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::info;

use crate::dto::job_dto::DedupReport;
use crate::dto::player_dto::{PlayerCharacterRating, PlayerRating};
use crate::error::{StrikrError, StrikrResult};
use crate::services::snapshot_store::SnapshotStore;

pub const DEDUP_JOB: &str = "deduplicate";

/// Keeps, per group, the row with the latest `created_at`. Ties go to the
/// higher id so the result never depends on input order. Winners come back
/// sorted by `(created_at, id)`.
pub fn latest_per_group<T, K, G, S>(rows: Vec<T>, group: G, sort_key: S) -> Vec<T>
where
    K: Eq + std::hash::Hash,
    G: Fn(&T) -> K,
    S: Fn(&T) -> (chrono::DateTime<chrono::Utc>, i64),
{
    let mut winners: HashMap<K, T> = HashMap::new();
    for row in rows {
        match winners.entry(group(&row)) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if sort_key(&row) > sort_key(slot.get()) {
                    slot.insert(row);
                }
            }
        }
    }

    let mut kept: Vec<T> = winners.into_values().collect();
    kept.sort_by_key(|row| sort_key(row));
    kept
}

pub fn dedup_ratings(rows: Vec<PlayerRating>) -> Vec<PlayerRating> {
    latest_per_group(
        rows,
        |r| (r.player_id.clone(), r.created_at.date_naive()),
        |r| (r.created_at, r.id),
    )
}

pub fn dedup_character_ratings(rows: Vec<PlayerCharacterRating>) -> Vec<PlayerCharacterRating> {
    latest_per_group(
        rows,
        |r| -> (String, String, String, String, NaiveDate) {
            (
                r.player_id.clone(),
                r.character.clone(),
                r.role.clone(),
                r.gamemode.clone(),
                r.created_at.date_naive(),
            )
        },
        |r| (r.created_at, r.id),
    )
}

/// Collapses the rating time-series to one sample per player per day.
pub struct DedupSweep {
    store: SnapshotStore,
    running: Mutex<()>,
}

impl DedupSweep {
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store,
            running: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> StrikrResult<DedupReport> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| StrikrError::JobAlreadyRunning(DEDUP_JOB))?;

        let ratings = self.store.all_ratings().await?;
        let ratings_scanned = ratings.len();
        let kept = dedup_ratings(ratings);
        if kept.len() < ratings_scanned {
            self.store.replace_all_ratings(&kept).await?;
        }
        let ratings_kept = kept.len();

        let characters = self.store.all_character_ratings().await?;
        let character_ratings_scanned = characters.len();
        let kept = dedup_character_ratings(characters);
        if kept.len() < character_ratings_scanned {
            self.store.replace_all_character_ratings(&kept).await?;
        }

        let report = DedupReport {
            ratings_scanned,
            ratings_kept,
            character_ratings_scanned,
            character_ratings_kept: kept.len(),
        };

        info!(
            ratings_removed = report.ratings_scanned - report.ratings_kept,
            character_ratings_removed = report.character_ratings_scanned - report.character_ratings_kept,
            "Deduplication sweep finished"
        );
        Ok(report)
    }
}
