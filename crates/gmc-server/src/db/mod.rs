//! Catalog database connection
//!
//! The catalog lives in PostgreSQL. This module validates the connection
//! string, builds the sqlx pool and answers the health probe; queries live with
//! the features that issue them.

use std::time::Duration;

use gmc_common::GmcError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

/// Pool bootstrap errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Connection string or pool settings are unusable
    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),
}

impl From<GmcError> for DbError {
    fn from(err: GmcError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Reject connection strings that cannot point at a PostgreSQL catalog.
pub fn validate_connection_string(url: &str) -> Result<(), GmcError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(GmcError::InvalidConnectionString(
            "connection string is empty".to_string(),
        ));
    }
    if !(trimmed.starts_with("postgres://") || trimmed.starts_with("postgresql://")) {
        return Err(GmcError::InvalidConnectionString(format!(
            "expected a postgres:// or postgresql:// URL, got '{}'",
            redact(trimmed)
        )));
    }
    Ok(())
}

// Keep credentials out of error messages and logs.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        },
        _ => url.to_string(),
    }
}

/// Pool settings. The server fills these from [`crate::config::DatabaseConfig`];
/// the CLI only supplies a URL.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
}

impl DbConfig {
    /// Default pool sizing for `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout_secs: 30,
            idle_timeout_secs: Some(600),
        }
    }
}

/// Validate the URL and open the pool.
pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    validate_connection_string(&config.url)?;
    if config.min_connections > config.max_connections {
        return Err(DbError::Config(format!(
            "min_connections ({}) exceeds max_connections ({})",
            config.min_connections, config.max_connections
        )));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(config.idle_timeout_secs.map(Duration::from_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Catalog pool ready"
    );
    Ok(pool)
}

/// Round trip used by `GET /health`.
pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
