pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::AuthConfig;
use crate::services::dedup::DedupSweep;
use crate::services::leaderboard_sync::LeaderboardSync;
use crate::services::reconciliation::ReconciliationEngine;

/// Collaborators handed to the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub engine: Arc<ReconciliationEngine>,
    pub sync: Arc<LeaderboardSync>,
    pub dedup: Arc<DedupSweep>,
    pub auth: AuthConfig,
}

pub fn app(services: AppServices) -> Router {
    Router::new()
        .route("/players", get(routes::players::list_players))
        .route("/players/ensure/{name}", get(routes::players::ensure_player))
        .route("/players/{id}", get(routes::players::get_player))
        .route("/players/{id}/ratings", get(routes::players::get_player_ratings))
        .route(
            "/players/{id}/character-ratings",
            get(routes::players::get_player_character_ratings),
        )
        .route("/leaderboard", get(routes::leaderboard::get_leaderboard))
        .route("/leaderboard/regions", get(routes::leaderboard::get_regions))
        .route("/jobs/leaderboard-sync", post(routes::jobs::trigger_leaderboard_sync))
        .route("/jobs/deduplicate", post(routes::jobs::trigger_deduplicate))
        .layer(Extension(services.engine))
        .layer(Extension(services.sync))
        .layer(Extension(services.dedup))
        .layer(Extension(services.auth))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured origins. An empty list allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if origins.is_empty() {
        return base.allow_origin(tower_http::cors::Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(parsed)
}
