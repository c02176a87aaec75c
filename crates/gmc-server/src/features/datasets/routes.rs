//! Dataset API routes
//!
//! - `POST /api/v1/datasets` - Create a dataset and make it current for its genome
//! - `GET /api/v1/datasets/genomes?status=&dataset_type=` - Genomes by dataset status and type
//! - `POST /api/v1/datasets/:uuid/children` - Create missing child datasets
//! - `PUT /api/v1/datasets/:uuid/status` - Advance the dataset status
//! - `PUT /api/v1/datasets/:uuid/attributes` - Upsert attribute values
//! - `GET /api/v1/datasets/:uuid/parent` - Parent dataset, if any
//! - `GET /api/v1/datasets/:uuid/releases` - Visible releases of the dataset

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use gmc_common::DatasetStatus;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::commands::{
    CreateChildDatasetsCommand, CreateChildDatasetsError, CreateDatasetCommand,
    CreateDatasetError, UpdateDatasetAttributesCommand, UpdateDatasetAttributesError,
    UpdateDatasetStatusCommand, UpdateDatasetStatusError,
};
use super::queries::{GenomesByStatusError, GetParentDatasetError};
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;
use crate::visibility::VisibilityPolicy;

pub fn datasets_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(create_dataset))
        .route("/genomes", get(genomes_by_status))
        .route("/:uuid/children", post(create_children))
        .route("/:uuid/status", put(update_status))
        .route("/:uuid/attributes", put(update_attributes))
        .route("/:uuid/parent", get(get_parent))
        .route("/:uuid/releases", get(list_releases))
}

#[derive(Debug, Deserialize)]
struct ChildrenBody {
    topic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: DatasetStatus,
}

#[derive(Debug, Deserialize)]
struct GenomesByStatusParams {
    status: DatasetStatus,
    dataset_type: String,
}

#[tracing::instrument(skip(pool, command), fields(genome_uuid = %command.genome_uuid))]
async fn create_dataset(
    State(pool): State<PgPool>,
    Json(command): Json<CreateDatasetCommand>,
) -> Result<Response, AppError> {
    let response = super::commands::create::handle(pool, command).await?;
    Ok(ApiResponse::created(response).into_response())
}

#[tracing::instrument(skip(pool, policy))]
async fn genomes_by_status(
    State(pool): State<PgPool>,
    State(policy): State<VisibilityPolicy>,
    Query(params): Query<GenomesByStatusParams>,
) -> Result<Response, AppError> {
    let rows = super::queries::by_status_and_type::handle(
        pool,
        policy,
        params.status,
        params.dataset_type,
    )
    .await?;
    Ok(ApiResponse::success(rows).into_response())
}

#[tracing::instrument(skip(pool, body))]
async fn create_children(
    State(pool): State<PgPool>,
    Path(parent_uuid): Path<Uuid>,
    body: Option<Json<ChildrenBody>>,
) -> Result<Response, AppError> {
    let topic = body.and_then(|Json(body)| body.topic);
    let command = CreateChildDatasetsCommand { parent_uuid, topic };
    let response = super::commands::create_children::handle(pool, command).await?;
    Ok(ApiResponse::created(response).into_response())
}

#[tracing::instrument(skip(pool, body))]
async fn update_status(
    State(pool): State<PgPool>,
    Path(dataset_uuid): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Response, AppError> {
    let command = UpdateDatasetStatusCommand {
        dataset_uuid,
        status: body.status,
    };
    let response = super::commands::update_status::handle(pool, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool, attributes))]
async fn update_attributes(
    State(pool): State<PgPool>,
    Path(dataset_uuid): Path<Uuid>,
    Json(attributes): Json<BTreeMap<String, String>>,
) -> Result<Response, AppError> {
    let command = UpdateDatasetAttributesCommand {
        dataset_uuid,
        attributes,
    };
    let response = super::commands::update_attributes::handle(pool, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool))]
async fn get_parent(
    State(pool): State<PgPool>,
    Path(dataset_uuid): Path<Uuid>,
) -> Result<Response, AppError> {
    let parent = super::queries::parent::handle(pool, dataset_uuid).await?;
    Ok(ApiResponse::success(parent).into_response())
}

#[tracing::instrument(skip(pool, policy))]
async fn list_releases(
    State(pool): State<PgPool>,
    State(policy): State<VisibilityPolicy>,
    Path(dataset_uuid): Path<Uuid>,
) -> Result<Response, AppError> {
    let releases =
        crate::features::releases::queries::for_dataset::handle(pool, policy, dataset_uuid).await?;
    Ok(ApiResponse::success(releases).into_response())
}

// ============================================================================
// Error Mapping
// ============================================================================

impl From<CreateDatasetError> for AppError {
    fn from(err: CreateDatasetError) -> Self {
        match err {
            CreateDatasetError::Validation(_) => AppError::Validation(err.to_string()),
            CreateDatasetError::GenomeNotFound(_)
            | CreateDatasetError::DatasetTypeNotFound(_)
            | CreateDatasetError::AttributeNotFound(_)
            | CreateDatasetError::ParentNotFound(_) => AppError::NotFound(err.to_string()),
            CreateDatasetError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<CreateChildDatasetsError> for AppError {
    fn from(err: CreateChildDatasetsError) -> Self {
        match err {
            CreateChildDatasetsError::ParentNotFound(_) => AppError::NotFound(err.to_string()),
            CreateChildDatasetsError::GenomeLinkCount { .. } => {
                AppError::Validation(err.to_string())
            },
            CreateChildDatasetsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<UpdateDatasetStatusError> for AppError {
    fn from(err: UpdateDatasetStatusError) -> Self {
        match err {
            UpdateDatasetStatusError::NotFound(_) => AppError::NotFound(err.to_string()),
            UpdateDatasetStatusError::Lifecycle(e) => AppError::Lifecycle(e),
            UpdateDatasetStatusError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<UpdateDatasetAttributesError> for AppError {
    fn from(err: UpdateDatasetAttributesError) -> Self {
        match err {
            UpdateDatasetAttributesError::DatasetNotFound(_)
            | UpdateDatasetAttributesError::AttributeNotFound(_) => {
                AppError::NotFound(err.to_string())
            },
            UpdateDatasetAttributesError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<GetParentDatasetError> for AppError {
    fn from(err: GetParentDatasetError) -> Self {
        match err {
            GetParentDatasetError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetParentDatasetError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<GenomesByStatusError> for AppError {
    fn from(err: GenomesByStatusError) -> Self {
        match err {
            GenomesByStatusError::Database(e) => AppError::Database(e),
        }
    }
}
