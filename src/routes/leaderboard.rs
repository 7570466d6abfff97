use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::dto::leaderboard_dto::LeaderboardParams;
use crate::dto::region_dto::Region;
use crate::error::StrikrResult;
use crate::routes::players::parse_region;
use crate::services::reconciliation::ReconciliationEngine;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1_000;

/**
 * GET a page of the cached leaderboard for one region.
 */
pub async fn get_leaderboard(
    Extension(engine): Extension<Arc<ReconciliationEngine>>,
    Query(params): Query<LeaderboardParams>,
) -> StrikrResult<impl IntoResponse> {
    let region = parse_region(params.region.as_deref())?.unwrap_or(Region::Global);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let page = params.page.unwrap_or(0).max(0);

    debug!(%region, filter = ?params.filter_by, order = ?params.order, limit, page, "Querying leaderboard");

    let entries = engine
        .store()
        .query_leaderboard(region, params.filter_by, params.order, limit, page * limit)
        .await?;
    Ok((StatusCode::OK, Json(entries)))
}

/**
 * GET the tracked regions in search order.
 */
pub async fn get_regions() -> impl IntoResponse {
    (StatusCode::OK, Json(Region::SEARCH_ORDER))
}
