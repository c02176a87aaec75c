//! Release API routes
//!
//! - `GET /api/v1/releases` - Visible releases, narrowed by query-string filters
//!
//! Per-genome and per-dataset release listings live under their own resources.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sqlx::PgPool;

use super::queries::{FetchReleasesError, ListReleasesParams};
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;
use crate::visibility::VisibilityPolicy;

pub fn releases_routes() -> Router<FeatureState> {
    Router::new().route("/", get(list_releases))
}

/// `GET /api/v1/releases?current_only=true&release_type=partial`
#[tracing::instrument(skip(pool, policy))]
async fn list_releases(
    State(pool): State<PgPool>,
    State(policy): State<VisibilityPolicy>,
    Query(params): Query<ListReleasesParams>,
) -> Result<Response, AppError> {
    let filter = params.into_filter()?;
    let releases = super::queries::list::handle(pool, policy, filter).await?;
    Ok(ApiResponse::success(releases).into_response())
}

impl From<FetchReleasesError> for AppError {
    fn from(err: FetchReleasesError) -> Self {
        match err {
            FetchReleasesError::InvalidParameter { .. } => AppError::Validation(err.to_string()),
            FetchReleasesError::Database(e) => AppError::Database(e),
        }
    }
}
