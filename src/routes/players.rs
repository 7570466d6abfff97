use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use crate::dto::player_dto::{EnsurePlayerParams, HistoryParams, ListPlayersParams};
use crate::dto::region_dto::Region;
use crate::error::{StrikrError, StrikrResult};
use crate::services::reconciliation::ReconciliationEngine;

const DEFAULT_PLAYERS_LIMIT: i64 = 10;
const MAX_PLAYERS_LIMIT: i64 = 25;
const DEFAULT_RATINGS_TAKE: i64 = 7;
const MAX_RATINGS_TAKE: i64 = 30;
const DEFAULT_CHARACTER_TAKE: i64 = 57;
const MAX_CHARACTER_TAKE: i64 = 300;

pub(crate) fn parse_region(raw: Option<&str>) -> StrikrResult<Option<Region>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Region::from_str(raw)
            .map(Some)
            .map_err(|e| StrikrError::InvalidInput(e.to_string())),
        None => Ok(None),
    }
}

fn bounded(value: Option<i64>, default: i64, max: i64) -> i64 {
    value.unwrap_or(default).clamp(1, max)
}

/**
 * GET a player, reconciling against the game API when needed.
 */
pub async fn ensure_player(
    Extension(engine): Extension<Arc<ReconciliationEngine>>,
    Path(name): Path<String>,
    Query(params): Query<EnsurePlayerParams>,
) -> StrikrResult<impl IntoResponse> {
    let region = parse_region(params.region.as_deref())?;
    info!("Ensuring player {} (refresh: {})", name, params.refresh);

    let record = engine.ensure_player(&name, params.refresh, region).await?;
    Ok((StatusCode::OK, Json(record)))
}

/**
 * GET registered players, optionally filtered by region.
 */
pub async fn list_players(
    Extension(engine): Extension<Arc<ReconciliationEngine>>,
    Query(params): Query<ListPlayersParams>,
) -> StrikrResult<impl IntoResponse> {
    let region = parse_region(params.region.as_deref())?;
    let limit = bounded(params.limit, DEFAULT_PLAYERS_LIMIT, MAX_PLAYERS_LIMIT);
    let page = params.page.unwrap_or(1).max(1);

    let players = engine
        .store()
        .list_players(region, limit, (page - 1) * limit)
        .await?;
    Ok((StatusCode::OK, Json(players)))
}

/**
 * GET one cached player by id.
 */
pub async fn get_player(
    Extension(engine): Extension<Arc<ReconciliationEngine>>,
    Path(id): Path<String>,
) -> StrikrResult<impl IntoResponse> {
    let player = engine
        .store()
        .find_player(&id)
        .await?
        .ok_or_else(|| StrikrError::PlayerNotFound(id.clone()))?;
    Ok((StatusCode::OK, Json(player)))
}

/**
 * GET the newest rating samples of a player.
 */
pub async fn get_player_ratings(
    Extension(engine): Extension<Arc<ReconciliationEngine>>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> StrikrResult<impl IntoResponse> {
    let take = bounded(params.take, DEFAULT_RATINGS_TAKE, MAX_RATINGS_TAKE);
    let ratings = engine.store().latest_ratings(&id, take).await?;
    Ok((StatusCode::OK, Json(ratings)))
}

/**
 * GET the latest sample for each character, role and gamemode of a player.
 */
pub async fn get_player_character_ratings(
    Extension(engine): Extension<Arc<ReconciliationEngine>>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> StrikrResult<impl IntoResponse> {
    let take = bounded(params.take, DEFAULT_CHARACTER_TAKE, MAX_CHARACTER_TAKE);
    let ratings = engine.store().latest_character_ratings(&id, take).await?;
    Ok((StatusCode::OK, Json(ratings)))
}
