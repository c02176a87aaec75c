//! Parent dataset lookup

use gmc_common::DatasetStatus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentDataset {
    pub dataset_uuid: Uuid,
    pub status: DatasetStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum GetParentDatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Parent of a dataset, `None` for a top-level dataset.
///
/// An unknown `dataset_uuid` is an error rather than `None`.
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    dataset_uuid: Uuid,
) -> Result<Option<ParentDataset>, GetParentDatasetError> {
    let row: Option<(Option<Uuid>, Option<DatasetStatus>)> = sqlx::query_as(
        r#"
        SELECT p.dataset_uuid, p.status
        FROM dataset d
        LEFT JOIN dataset p ON p.dataset_id = d.parent_id
        WHERE d.dataset_uuid = $1
        "#,
    )
    .bind(dataset_uuid)
    .fetch_optional(&pool)
    .await?;

    match row {
        None => Err(GetParentDatasetError::NotFound(dataset_uuid)),
        Some((Some(dataset_uuid), Some(status))) => Ok(Some(ParentDataset {
            dataset_uuid,
            status,
        })),
        Some(_) => Ok(None),
    }
}
