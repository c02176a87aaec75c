//! Export API routes
//!
//! - `GET /api/v1/exports/stats` - Partial and integrated release statistics
//! - `GET /api/v1/exports/changelog/:label` - Changelog rows of one release
//! - `GET /api/v1/exports/ftp-index` - FTP metadata index document
//!
//! Reports are returned as plain documents, without the response envelope.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use super::{ChangelogError, FtpIndexError, StatsError};
use crate::error::AppError;
use crate::features::FeatureState;
use crate::visibility::VisibilityPolicy;

pub fn exports_routes() -> Router<FeatureState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/changelog/:label", get(changelog))
        .route("/ftp-index", get(ftp_index))
}

#[tracing::instrument(skip(pool, policy))]
async fn stats(
    State(pool): State<PgPool>,
    State(policy): State<VisibilityPolicy>,
) -> Result<Response, AppError> {
    let report = super::stats::handle(pool, policy).await?;
    Ok(Json(report).into_response())
}

#[tracing::instrument(skip(pool, policy))]
async fn changelog(
    State(pool): State<PgPool>,
    State(policy): State<VisibilityPolicy>,
    Path(label): Path<String>,
) -> Result<Response, AppError> {
    let report = super::changelog::handle(pool, policy, label).await?;
    Ok(Json(report).into_response())
}

#[tracing::instrument(skip(pool))]
async fn ftp_index(State(pool): State<PgPool>) -> Result<Response, AppError> {
    let index = super::ftp_index::handle(pool).await?;
    Ok(Json(index).into_response())
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Database(e) => AppError::Database(e),
            StatsError::Io(e) => AppError::Io(e),
            StatsError::Csv(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<ChangelogError> for AppError {
    fn from(err: ChangelogError) -> Self {
        match err {
            ChangelogError::ReleaseNotFound(_) => AppError::Validation(err.to_string()),
            ChangelogError::Database(e) => AppError::Database(e),
            ChangelogError::Io(e) => AppError::Io(e),
            ChangelogError::Csv(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<FtpIndexError> for AppError {
    fn from(err: FtpIndexError) -> Self {
        match err {
            FtpIndexError::Database(e) => AppError::Database(e),
            FtpIndexError::Io(e) => AppError::Io(e),
            FtpIndexError::Json(_) | FtpIndexError::Pattern(_) => AppError::Internal(err.to_string()),
        }
    }
}
