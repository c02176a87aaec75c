//! Create dataset command
//!
//! Inserts a dataset with its attributes and makes it the current dataset of
//! its type for the genome, demoting whichever dataset held that slot before.
//! Everything happens in one transaction.

use std::collections::BTreeMap;

use gmc_common::DatasetStatus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::datasets::store;
use crate::features::shared::validation::{validate_name, NameValidationError};

/// Provenance of a new dataset; created on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSourceSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasetCommand {
    pub genome_uuid: Uuid,
    pub dataset_type: String,
    pub source: DatasetSourceSpec,
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default = "default_status")]
    pub status: DatasetStatus,
    /// Attribute name → value
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<Uuid>,
}

fn default_status() -> DatasetStatus {
    DatasetStatus::Submitted
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasetResponse {
    pub dataset_uuid: Uuid,
    pub status: DatasetStatus,
    /// Datasets that stopped being current for this genome and type
    pub superseded: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateDatasetError {
    #[error("Validation failed: {0}")]
    Validation(#[from] NameValidationError),

    #[error("Genome '{0}' not found")]
    GenomeNotFound(Uuid),

    #[error("Dataset type '{0}' not found")]
    DatasetTypeNotFound(String),

    #[error("Attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error("Parent dataset '{0}' not found")]
    ParentNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateDatasetCommand {
    pub fn validate(&self) -> Result<(), CreateDatasetError> {
        validate_name(&self.dataset_type, "dataset_type", 32)?;
        validate_name(&self.source.name, "source name", 255)?;
        validate_name(&self.source.source_type, "source type", 32)?;
        validate_name(&self.name, "name", 128)?;
        validate_name(&self.label, "label", 128)?;
        for name in self.attributes.keys() {
            validate_name(name, "attribute name", 128)?;
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(pool, command),
    fields(genome_uuid = %command.genome_uuid, dataset_type = %command.dataset_type)
)]
pub async fn handle(
    pool: PgPool,
    command: CreateDatasetCommand,
) -> Result<CreateDatasetResponse, CreateDatasetError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let genome_id: i32 = sqlx::query_scalar("SELECT genome_id FROM genome WHERE genome_uuid = $1")
        .bind(command.genome_uuid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CreateDatasetError::GenomeNotFound(command.genome_uuid))?;

    let dataset_type_id: i32 =
        sqlx::query_scalar("SELECT dataset_type_id FROM dataset_type WHERE name = $1")
            .bind(&command.dataset_type)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CreateDatasetError::DatasetTypeNotFound(command.dataset_type.clone()))?;

    // The no-op update makes RETURNING yield the existing row on conflict
    let dataset_source_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO dataset_source (type, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING dataset_source_id
        "#,
    )
    .bind(&command.source.source_type)
    .bind(&command.source.name)
    .fetch_one(&mut *tx)
    .await?;

    let parent_id = match command.parent_uuid {
        Some(parent_uuid) => Some(
            store::dataset_by_uuid(&mut *tx, parent_uuid)
                .await?
                .ok_or(CreateDatasetError::ParentNotFound(parent_uuid))?
                .dataset_id,
        ),
        None => None,
    };

    let dataset_uuid = Uuid::new_v4();
    let dataset_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO dataset
            (dataset_uuid, dataset_type_id, name, version, dataset_source_id, label, status, parent_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING dataset_id
        "#,
    )
    .bind(dataset_uuid)
    .bind(dataset_type_id)
    .bind(&command.name)
    .bind(&command.version)
    .bind(dataset_source_id)
    .bind(&command.label)
    .bind(command.status)
    .bind(parent_id)
    .fetch_one(&mut *tx)
    .await?;

    for (name, value) in &command.attributes {
        let attribute_id = store::attribute_id(&mut *tx, name)
            .await?
            .ok_or_else(|| CreateDatasetError::AttributeNotFound(name.clone()))?;
        store::upsert_attribute(&mut *tx, dataset_id, attribute_id, value).await?;
    }

    let superseded =
        store::link_as_current(&mut *tx, genome_id, dataset_id, dataset_type_id, command.release_id)
            .await?;

    tx.commit().await?;

    tracing::info!(
        dataset_uuid = %dataset_uuid,
        superseded = superseded.len(),
        "Dataset created"
    );

    Ok(CreateDatasetResponse {
        dataset_uuid,
        status: command.status,
        superseded,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn command() -> CreateDatasetCommand {
        CreateDatasetCommand {
            genome_uuid: Uuid::new_v4(),
            dataset_type: "genebuild".to_string(),
            source: DatasetSourceSpec {
                name: "homo_sapiens_core_110_38".to_string(),
                source_type: "core".to_string(),
            },
            name: "genebuild".to_string(),
            label: "GENCODE 44".to_string(),
            version: None,
            status: DatasetStatus::Submitted,
            attributes: BTreeMap::new(),
            release_id: None,
            parent_uuid: None,
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_blank_fields() {
        let mut cmd = command();
        cmd.dataset_type = " ".to_string();
        assert!(matches!(cmd.validate(), Err(CreateDatasetError::Validation(_))));

        let mut cmd = command();
        cmd.attributes.insert(String::new(), "ensembl".to_string());
        assert!(matches!(cmd.validate(), Err(CreateDatasetError::Validation(_))));
    }

    #[test]
    fn test_status_defaults_to_submitted() {
        let json = serde_json::json!({
            "genome_uuid": Uuid::nil(),
            "dataset_type": "genebuild",
            "source": {"name": "core_db", "type": "core"},
            "name": "genebuild",
            "label": "label"
        });
        let cmd: CreateDatasetCommand = serde_json::from_value(json).unwrap();
        assert_eq!(cmd.status, DatasetStatus::Submitted);
        assert!(cmd.attributes.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_unknown_genome(pool: PgPool) -> sqlx::Result<()> {
        let result = handle(pool, command()).await;
        assert!(matches!(result, Err(CreateDatasetError::GenomeNotFound(_))));
        Ok(())
    }
}
