//! Process configuration for `gmc-server`
//!
//! Everything comes from the environment (after `.env` is read). Unset or
//! unparseable values fall back to the section defaults below.

use crate::db::{validate_connection_string, DbConfig};
use crate::visibility::VisibilityPolicy;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 50051;
/// Seconds in-flight requests get to finish after SIGINT/SIGTERM.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/gmc";
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub visibility: VisibilityPolicy,
}

/// Listener settings (`GMC_HOST`, `GMC_PORT`, `GMC_SHUTDOWN_TIMEOUT`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("GMC_HOST", defaults.host),
            port: env_or("GMC_PORT", defaults.port),
            shutdown_timeout_secs: env_or("GMC_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout_secs),
        }
    }
}

/// Allowed browser origins (`CORS_ALLOWED_ORIGINS`, comma separated)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Empty or containing `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    fn from_env() -> Self {
        let Ok(raw) = std::env::var("CORS_ALLOWED_ORIGINS") else {
            return Self::default();
        };
        Self {
            allowed_origins: raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

/// Catalog connection settings (`DATABASE_*`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("DATABASE_URL", defaults.url),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections),
            connect_timeout_secs: env_or("DATABASE_CONNECT_TIMEOUT", defaults.connect_timeout_secs),
            idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", defaults.idle_timeout_secs),
        }
    }

    /// Pool settings for [`crate::db::create_pool`].
    pub fn pool_config(&self) -> DbConfig {
        DbConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: Some(self.idle_timeout_secs),
        }
    }
}

/// Parsed value of `name`, or `default` when it is unset or unparseable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable setting");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// Read `.env`, then the process environment, and validate the result.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            cors: CorsConfig::from_env(),
            visibility: VisibilityPolicy::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.server.port != 0, "GMC_PORT must be non-zero");

        validate_connection_string(&self.database.url)?;

        let db = &self.database;
        anyhow::ensure!(db.max_connections > 0, "DATABASE_MAX_CONNECTIONS must be non-zero");
        anyhow::ensure!(
            db.min_connections <= db.max_connections,
            "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
            db.min_connections,
            db.max_connections
        );

        if self.visibility.allow_unreleased {
            tracing::warn!(
                site_id = self.visibility.current_site_id,
                "Unreleased releases and datasets are visible to every caller"
            );
        }

        Ok(())
    }
}
