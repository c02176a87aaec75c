//! Genome API routes
//!
//! - `POST /api/v1/genomes/query` - Run the genome/dataset filter engine
//! - `GET /api/v1/genomes/:uuid/releases` - Visible releases that include the genome

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::filters::GenomeFilters;
use super::queries::FetchGenomesError;
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;
use crate::visibility::VisibilityPolicy;

pub fn genomes_routes() -> Router<FeatureState> {
    Router::new()
        .route("/query", post(query_genomes))
        .route("/:uuid/releases", get(list_releases))
}

/// Request body is a [`GenomeFilters`]; omitted fields take their defaults.
#[tracing::instrument(skip(pool, policy, filters))]
async fn query_genomes(
    State(pool): State<PgPool>,
    State(policy): State<VisibilityPolicy>,
    Json(filters): Json<GenomeFilters>,
) -> Result<Response, AppError> {
    let batch = filters.batch();
    let rows = super::queries::fetch::handle(pool, policy, filters).await?;
    let meta = json!({
        "page": batch.page(),
        "batch_size": batch.batch_size(),
        "count": rows.len(),
    });
    Ok(ApiResponse::success(rows).with_meta(meta).into_response())
}

#[tracing::instrument(skip(pool, policy))]
async fn list_releases(
    State(pool): State<PgPool>,
    State(policy): State<VisibilityPolicy>,
    Path(genome_uuid): Path<Uuid>,
) -> Result<Response, AppError> {
    let releases =
        crate::features::releases::queries::for_genome::handle(pool, policy, genome_uuid).await?;
    Ok(ApiResponse::success(releases).into_response())
}

impl From<FetchGenomesError> for AppError {
    fn from(err: FetchGenomesError) -> Self {
        match err {
            FetchGenomesError::DatasetNotFound(_) | FetchGenomesError::AttributeNotFound(_) => {
                AppError::NotFound(err.to_string())
            },
            FetchGenomesError::Lifecycle(e) => AppError::Lifecycle(e),
            FetchGenomesError::Database(e) => AppError::Database(e),
        }
    }
}
