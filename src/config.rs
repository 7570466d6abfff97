use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::dto::region_dto::Region;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub prometheus: PrometheusConfig,
    pub sync: SyncConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://./data/strikr.db?mode=rwc`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    pub base_url: String,
    pub token: String,
    pub refresh_token: String,
    /// Bound for every upstream request.
    pub timeout_secs: u64,
    /// Bound for each per-region leaderboard search while locating a player.
    pub region_timeout_secs: u64,
}

impl PrometheusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn region_timeout(&self) -> Duration {
        Duration::from_secs(self.region_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub page_size: u32,
    /// Run the ensure procedure for every synced player as well.
    pub with_history: bool,
    pub on_startup: bool,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Layers `default.toml`, then `{STRIKR_ENV}.toml`, then `STRIKR_*`
    /// environment variables (`STRIKR_PROMETHEUS__TOKEN`, ...).
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let env_name = std::env::var("STRIKR_ENV").unwrap_or_else(|_| "development".to_string());

        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://./data/strikr.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("prometheus.base_url", "")?
            .set_default("prometheus.token", "")?
            .set_default("prometheus.refresh_token", "")?
            .set_default("prometheus.timeout_secs", 10)?
            .set_default("prometheus.region_timeout_secs", 5)?
            .set_default("sync.interval_secs", 12 * 60 * 60)?
            .set_default("sync.page_size", 25)?
            .set_default("sync.with_history", false)?
            .set_default("sync.on_startup", false)?
            .set_default(
                "sync.regions",
                Region::SEARCH_ORDER
                    .iter()
                    .map(|r| r.as_str().to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default("auth.jwt_secret", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(env_name)).required(false))
            .add_source(
                Environment::with_prefix("STRIKR")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("sync.regions")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.prometheus.base_url.trim().is_empty() {
            errors.push("prometheus.base_url must not be empty".to_string());
        }
        if self.prometheus.timeout_secs == 0 || self.prometheus.region_timeout_secs == 0 {
            errors.push("prometheus timeouts must be positive".to_string());
        }
        if !(1..=100).contains(&self.sync.page_size) {
            errors.push(format!(
                "sync.page_size must be between 1 and 100, got {}",
                self.sync.page_size
            ));
        }
        if self.sync.interval_secs == 0 {
            errors.push("sync.interval_secs must be positive".to_string());
        }
        if self.sync.regions.is_empty() {
            errors.push("sync.regions must list at least one region".to_string());
        }
        if self.auth.jwt_secret.is_empty() {
            errors.push("auth.jwt_secret must not be empty".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            prometheus: PrometheusConfig {
                base_url: "https://prometheus.example".to_string(),
                token: "t".to_string(),
                refresh_token: "r".to_string(),
                timeout_secs: 10,
                region_timeout_secs: 5,
            },
            sync: SyncConfig {
                interval_secs: 60,
                page_size: 25,
                with_history: false,
                on_startup: false,
                regions: vec![Region::Global],
            },
            auth: AuthConfig {
                jwt_secret: "secret".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_reports_every_problem() {
        let mut config = sample();
        config.sync.page_size = 0;
        config.sync.regions.clear();
        config.prometheus.base_url = " ".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
