use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::PrometheusConfig;
use crate::dto::prometheus_dto::{
    LeaderboardPage, LoginToken, PlayerMastery, PlayerQuery, PlayerStats, PlayerSummary,
};
use crate::dto::region_dto::Region;
use crate::error::UpstreamError;

/// Operations the service consumes from the upstream ranked API.
#[async_trait]
pub trait PrometheusApi: Send + Sync {
    /// Case-insensitive exact match against the username search candidates.
    async fn find_player_by_username(
        &self,
        username: &str,
    ) -> Result<Option<PlayerSummary>, UpstreamError>;

    async fn get_player_mastery(&self, player_id: &str) -> Result<PlayerMastery, UpstreamError>;

    async fn get_player_stats(&self, player_id: &str) -> Result<PlayerStats, UpstreamError>;

    async fn search_leaderboard(
        &self,
        player_id: &str,
        region: Region,
        entries_before: u32,
        entries_after: u32,
    ) -> Result<LeaderboardPage, UpstreamError>;

    async fn get_leaderboard_page(
        &self,
        region: Region,
        start_rank: u32,
        page_size: u32,
    ) -> Result<LeaderboardPage, UpstreamError>;
}

struct Tokens {
    token: String,
    refresh_token: String,
}

pub struct PrometheusClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    tokens: RwLock<Tokens>,
}

impl PrometheusClient {
    pub fn new(config: &PrometheusConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            tokens: RwLock::new(Tokens {
                token: config.token.clone(),
                refresh_token: config.refresh_token.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(err)
        }
    }

    fn authorize(&self, request: RequestBuilder, token: &str, refresh_token: &str) -> RequestBuilder {
        request
            .header("X-Authorization", format!("Bearer {token}"))
            .header("X-Refresh-Token", refresh_token)
    }

    async fn current_tokens(&self) -> (String, String) {
        let tokens = self.tokens.read().await;
        (tokens.token.clone(), tokens.refresh_token.clone())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let mut refreshed = false;

        loop {
            let (token, refresh_token) = self.current_tokens().await;
            let request = self.authorize(self.http.get(self.url(path)).query(query), &token, &refresh_token);
            let response = request.send().await.map_err(|e| self.classify(e))?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if refreshed {
                    return Err(UpstreamError::Unauthorized(path.to_string()));
                }
                warn!(path, status = status.as_u16(), "Upstream rejected token, refreshing");
                self.refresh_tokens(&token).await?;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    path: path.to_string(),
                });
            }

            return response.json::<T>().await.map_err(|e| self.classify(e));
        }
    }

    /// Swaps both tokens under the write lock. A caller that lost the race
    /// sees a token different from the one that failed and skips the call.
    async fn refresh_tokens(&self, stale_token: &str) -> Result<(), UpstreamError> {
        let mut tokens = self.tokens.write().await;
        if tokens.token != stale_token {
            debug!("Token already refreshed by a concurrent request");
            return Ok(());
        }

        let request = self.authorize(
            self.http.post(self.url("v1/login/token")),
            &tokens.token,
            &tokens.refresh_token,
        );
        let response = request.send().await.map_err(|e| self.classify(e))?;
        if !response.status().is_success() {
            return Err(UpstreamError::TokenRefresh(format!(
                "login endpoint returned {}",
                response.status()
            )));
        }

        let login: LoginToken = response
            .json()
            .await
            .map_err(|e| UpstreamError::TokenRefresh(e.to_string()))?;
        tokens.token = login.jwt;
        tokens.refresh_token = login.refresh_token;
        info!("Refreshed upstream tokens");
        Ok(())
    }
}

fn region_param(query: &mut Vec<(&'static str, String)>, region: Region) {
    if let Some(specific) = region.specific_region() {
        query.push(("specificRegion", specific.to_string()));
    }
}

#[async_trait]
impl PrometheusApi for PrometheusClient {
    async fn find_player_by_username(
        &self,
        username: &str,
    ) -> Result<Option<PlayerSummary>, UpstreamError> {
        let query = [
            ("usernameQuery", username.to_string()),
            ("entriesBefore", "0".to_string()),
            ("entriesAfter", "0".to_string()),
        ];
        let result: PlayerQuery = self.get_json("v1/players", &query).await?;
        let wanted = username.to_lowercase();

        Ok(result
            .matches
            .into_iter()
            .find(|candidate| candidate.username.to_lowercase() == wanted))
    }

    async fn get_player_mastery(&self, player_id: &str) -> Result<PlayerMastery, UpstreamError> {
        self.get_json(&format!("v1/mastery/{player_id}/player"), &[]).await
    }

    async fn get_player_stats(&self, player_id: &str) -> Result<PlayerStats, UpstreamError> {
        self.get_json(&format!("v1/stats/player-stats/{player_id}"), &[]).await
    }

    async fn search_leaderboard(
        &self,
        player_id: &str,
        region: Region,
        entries_before: u32,
        entries_after: u32,
    ) -> Result<LeaderboardPage, UpstreamError> {
        let mut query = vec![
            ("entriesBefore", entries_before.to_string()),
            ("entriesAfter", entries_after.to_string()),
        ];
        region_param(&mut query, region);
        self.get_json(&format!("v1/ranked/leaderboard/search/{player_id}"), &query)
            .await
    }

    async fn get_leaderboard_page(
        &self,
        region: Region,
        start_rank: u32,
        page_size: u32,
    ) -> Result<LeaderboardPage, UpstreamError> {
        let mut query = vec![
            ("startRank", start_rank.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        region_param(&mut query, region);
        self.get_json("v1/ranked/leaderboard/players", &query).await
    }
}
