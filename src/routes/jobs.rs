use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use tracing::info;

use crate::error::StrikrResult;
use crate::services::auth_user::StaffUser;
use crate::services::dedup::DedupSweep;
use crate::services::leaderboard_sync::LeaderboardSync;

/**
 * POST to run a leaderboard sync now. Staff only.
 */
pub async fn trigger_leaderboard_sync(
    Extension(sync): Extension<Arc<LeaderboardSync>>,
    StaffUser(claims): StaffUser,
) -> StrikrResult<impl IntoResponse> {
    info!("Leaderboard sync triggered by {}", claims.sub);
    let report = sync.run().await?;
    Ok((StatusCode::OK, Json(report)))
}

/**
 * POST to run the deduplication sweep now. Staff only.
 */
pub async fn trigger_deduplicate(
    Extension(dedup): Extension<Arc<DedupSweep>>,
    StaffUser(claims): StaffUser,
) -> StrikrResult<impl IntoResponse> {
    info!("Deduplication triggered by {}", claims.sub);
    let report = dedup.run().await?;
    Ok((StatusCode::OK, Json(report)))
}
