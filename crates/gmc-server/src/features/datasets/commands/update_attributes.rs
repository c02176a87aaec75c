//! Update dataset attributes command

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::features::datasets::store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDatasetAttributesCommand {
    pub dataset_uuid: Uuid,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDatasetAttributesResponse {
    pub dataset_uuid: Uuid,
    pub updated: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateDatasetAttributesError {
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(Uuid),

    #[error("Attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Upsert every attribute on an open connection or transaction.
pub async fn apply(
    conn: &mut PgConnection,
    dataset_uuid: Uuid,
    attributes: &BTreeMap<String, String>,
) -> Result<usize, UpdateDatasetAttributesError> {
    let dataset = store::dataset_by_uuid(&mut *conn, dataset_uuid)
        .await?
        .ok_or(UpdateDatasetAttributesError::DatasetNotFound(dataset_uuid))?;

    for (name, value) in attributes {
        let attribute_id = store::attribute_id(&mut *conn, name)
            .await?
            .ok_or_else(|| UpdateDatasetAttributesError::AttributeNotFound(name.clone()))?;
        store::upsert_attribute(&mut *conn, dataset.dataset_id, attribute_id, value).await?;
    }

    Ok(attributes.len())
}

#[tracing::instrument(skip(pool, command), fields(dataset_uuid = %command.dataset_uuid))]
pub async fn handle(
    pool: PgPool,
    command: UpdateDatasetAttributesCommand,
) -> Result<UpdateDatasetAttributesResponse, UpdateDatasetAttributesError> {
    let mut tx = pool.begin().await?;
    let updated = apply(&mut *tx, command.dataset_uuid, &command.attributes).await?;
    tx.commit().await?;

    tracing::info!(updated, "Dataset attributes updated");

    Ok(UpdateDatasetAttributesResponse {
        dataset_uuid: command.dataset_uuid,
        updated,
    })
}
