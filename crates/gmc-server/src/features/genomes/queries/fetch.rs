//! Genome/dataset filter engine
//!
//! Turns a [`GenomeFilters`] into one grouped, paginated join and streams the
//! matching (genome, dataset) rows. Conditions are added in a fixed order: the
//! release condition needs `genome_release` joined, and visibility needs
//! `ensembl_release` joined, before either can be applied.
//!
//! With `update_dataset_status` set, every dataset on the page goes through the
//! lifecycle manager inside one transaction before any row is yielded. A
//! rejected transition rolls the whole page back and ends the stream with that
//! error.

use std::collections::BTreeMap;

use futures::stream::{self, Stream, TryStreamExt};
use gmc_common::DatasetStatus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::features::datasets::commands::{
    update_attributes, update_status, UpdateDatasetAttributesError, UpdateDatasetStatusError,
};
use crate::features::genomes::filters::{GenomeFilters, SpeciesFilter};
use crate::features::releases::filter::{ReleaseQuery, SqlValue, WithRelease};
use crate::visibility::VisibilityPolicy;

const GENOME_DATASET_SELECT: &str = "SELECT g.genome_uuid, g.production_name AS species, \
     d.dataset_uuid, d.status AS dataset_status, ds.name AS dataset_source, \
     dt.name AS dataset_type \
     FROM genome g \
     JOIN assembly a ON a.assembly_id = g.assembly_id \
     JOIN organism o ON o.organism_id = g.organism_id \
     JOIN organism_group_member ogm ON ogm.organism_id = o.organism_id \
     JOIN organism_group og ON og.organism_group_id = ogm.organism_group_id \
     JOIN genome_dataset gd ON gd.genome_id = g.genome_id \
     JOIN dataset d ON d.dataset_id = gd.dataset_id \
     JOIN dataset_source ds ON ds.dataset_source_id = d.dataset_source_id \
     JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id";

#[derive(Debug, Clone, sqlx::FromRow)]
struct RawGenomeRow {
    genome_uuid: Uuid,
    species: String,
    dataset_uuid: Option<Uuid>,
    dataset_status: DatasetStatus,
    dataset_source: String,
    dataset_type: String,
}

/// One matched (genome, dataset) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeDatasetRow {
    pub genome_uuid: Uuid,
    pub species: String,
    pub dataset_uuid: Uuid,
    pub dataset_status: DatasetStatus,
    pub dataset_source: String,
    pub dataset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_dataset_status: Option<DatasetStatus>,
}

impl RawGenomeRow {
    fn into_row(self) -> Option<GenomeDatasetRow> {
        let Some(dataset_uuid) = self.dataset_uuid else {
            tracing::warn!(genome_uuid = %self.genome_uuid, "Row without dataset UUID skipped");
            return None;
        };

        Some(GenomeDatasetRow {
            genome_uuid: self.genome_uuid,
            species: self.species,
            dataset_uuid,
            dataset_status: self.dataset_status,
            dataset_source: self.dataset_source,
            dataset_type: self.dataset_type,
            updated_dataset_status: None,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchGenomesError {
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(Uuid),

    #[error("Attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<UpdateDatasetStatusError> for FetchGenomesError {
    fn from(err: UpdateDatasetStatusError) -> Self {
        match err {
            UpdateDatasetStatusError::NotFound(uuid) => Self::DatasetNotFound(uuid),
            UpdateDatasetStatusError::Lifecycle(e) => Self::Lifecycle(e),
            UpdateDatasetStatusError::Database(e) => Self::Database(e),
        }
    }
}

impl From<UpdateDatasetAttributesError> for FetchGenomesError {
    fn from(err: UpdateDatasetAttributesError) -> Self {
        match err {
            UpdateDatasetAttributesError::DatasetNotFound(uuid) => Self::DatasetNotFound(uuid),
            UpdateDatasetAttributesError::AttributeNotFound(name) => Self::AttributeNotFound(name),
            UpdateDatasetAttributesError::Database(e) => Self::Database(e),
        }
    }
}

/// Build the page query for `filters` under `policy`.
pub fn build(policy: &VisibilityPolicy, filters: &GenomeFilters) -> ReleaseQuery<WithRelease> {
    let mut query = ReleaseQuery::new(GENOME_DATASET_SELECT);

    if let Some(group_type) = &filters.organism_group_type {
        query = query.filter_eq("og.type", SqlValue::Text(group_type.clone()));
    }

    let divisions = filters.divisions();
    if !divisions.is_empty() {
        query = query.filter_in("og.name", SqlValue::Texts(divisions));
    }

    if !filters.genome_uuid.is_empty() {
        query = query.filter_in("g.genome_uuid", SqlValue::Uuids(filters.genome_uuid.clone()));
    }

    if !filters.dataset_uuid.is_empty() {
        query = query.filter_in("d.dataset_uuid", SqlValue::Uuids(filters.dataset_uuid.clone()));
    }

    query = match filters.species_filter() {
        SpeciesFilter::All => query,
        SpeciesFilter::Only(species) => query.filter_in("g.production_name", SqlValue::Texts(species)),
        SpeciesFilter::Except(species) => {
            query.filter_not_in("g.production_name", SqlValue::Texts(species))
        },
    };

    if let Some(release_id) = filters.release_id {
        // One placeholder keeps the dataset and genome release links in step
        let placeholder = query.push_bind(SqlValue::Int(release_id));
        query = query
            .join("JOIN genome_release gr ON gr.genome_id = g.genome_id")
            .filter(format!("gd.release_id = {}", placeholder))
            .filter(format!("gr.release_id = {}", placeholder));
    }

    if !filters.dataset_type.trim().is_empty() {
        query = query.filter_eq("dt.name", SqlValue::Text(filters.dataset_type.clone()));
    }

    if !filters.dataset_status.is_empty() {
        let statuses = filters.dataset_status.iter().map(|s| s.as_str().to_string()).collect();
        query = query.filter_in("d.status::text", SqlValue::Texts(statuses));
    }

    let mut query = query
        .join_release("LEFT JOIN ensembl_release er ON er.release_id = gd.release_id")
        .with_visibility(policy, None);

    if !policy.allow_unreleased {
        query = query.filter("d.status = 'Released'");
    }

    let batch = filters.batch();
    query
        .group_by(&["g.genome_id", "d.dataset_id", "ds.dataset_source_id", "dt.dataset_type_id"])
        .order_by(&["g.genome_uuid", "d.dataset_uuid"])
        .paginate(batch.batch_size(), batch.offset())
}

/// Stream the rows matching `filters`.
///
/// The page is fetched (and promoted, when requested) on first poll; dropping
/// the stream early returns the connection to the pool.
pub fn fetch_genomes(
    pool: PgPool,
    policy: VisibilityPolicy,
    filters: GenomeFilters,
) -> impl Stream<Item = Result<GenomeDatasetRow, FetchGenomesError>> + Send {
    let query = build(&policy, &filters);
    let update = filters.update_dataset_status;
    let attributes = filters.update_dataset_attribute;

    stream::once(async move {
        let raw: Vec<RawGenomeRow> = query.fetch_all(&pool).await?;
        tracing::debug!(rows = raw.len(), "Fetched genome page");

        let mut rows: Vec<GenomeDatasetRow> = raw.into_iter().filter_map(RawGenomeRow::into_row).collect();
        if let Some(status) = update {
            promote_page(&pool, &mut rows, status, &attributes).await?;
        }

        Ok::<_, FetchGenomesError>(stream::iter(rows.into_iter().map(Ok::<_, FetchGenomesError>)))
    })
    .try_flatten()
}

/// Move every row's dataset to `status` and apply `attributes`, all or nothing.
async fn promote_page(
    pool: &PgPool,
    rows: &mut [GenomeDatasetRow],
    status: DatasetStatus,
    attributes: &BTreeMap<String, String>,
) -> Result<(), FetchGenomesError> {
    // Dropping `tx` on an early return rolls back the rows already applied
    let mut tx = pool.begin().await?;

    for row in rows.iter_mut() {
        let updated = update_status::apply(&mut *tx, row.dataset_uuid, status).await?;
        if !attributes.is_empty() {
            update_attributes::apply(&mut *tx, row.dataset_uuid, attributes).await?;
        }
        row.updated_dataset_status = Some(updated.status);
    }

    tx.commit().await?;
    tracing::info!(rows = rows.len(), %status, "Promoted genome page");
    Ok(())
}

/// Collect the whole page.
#[tracing::instrument(skip(pool, filters))]
pub async fn handle(
    pool: PgPool,
    policy: VisibilityPolicy,
    filters: GenomeFilters,
) -> Result<Vec<GenomeDatasetRow>, FetchGenomesError> {
    fetch_genomes(pool, policy, filters).try_collect().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_query_shape() {
        let query = build(&VisibilityPolicy::allow_unreleased(1), &GenomeFilters::default());
        let sql = query.sql();

        assert!(sql.contains("dt.name = $1"));
        assert!(sql.contains("d.status::text = ANY($2)"));
        assert!(sql.contains("LEFT JOIN ensembl_release er ON er.release_id = gd.release_id"));
        assert!(sql.contains("LEFT JOIN ensembl_site es"));
        assert!(sql.contains(
            "GROUP BY g.genome_id, d.dataset_id, ds.dataset_source_id, dt.dataset_type_id"
        ));
        assert!(sql.contains("ORDER BY g.genome_uuid, d.dataset_uuid LIMIT $4 OFFSET $5"));
        assert_eq!(query.binds()[3], SqlValue::BigInt(50));
        assert_eq!(query.binds()[4], SqlValue::BigInt(0));
    }

    #[test]
    fn test_hidden_unreleased_requires_released_rows() {
        let sql = build(&VisibilityPolicy::released_only(1), &GenomeFilters::default()).sql();
        assert!(sql.contains("er.status = 'Released'"));
        assert!(sql.contains("d.status = 'Released'"));
        assert!(!sql.contains("LEFT JOIN ensembl_site"));
    }

    #[test]
    fn test_release_condition_shares_placeholder() {
        let filters = GenomeFilters {
            release_id: Some(7),
            dataset_type: String::new(),
            dataset_status: Vec::new(),
            ..Default::default()
        };
        let query = build(&VisibilityPolicy::allow_unreleased(1), &filters);
        let sql = query.sql();

        assert!(sql.contains("JOIN genome_release gr ON gr.genome_id = g.genome_id"));
        assert!(sql.contains("gd.release_id = $1 AND gr.release_id = $1"));
        assert_eq!(query.binds()[0], SqlValue::Int(7));
    }

    #[test]
    fn test_species_fallback_excludes_denied() {
        let filters = GenomeFilters {
            species: strings(&["mus_musculus"]),
            antispecies: strings(&["mus_musculus"]),
            ..Default::default()
        };
        let query = build(&VisibilityPolicy::allow_unreleased(1), &filters);

        assert!(query.sql().contains("NOT (g.production_name = ANY($1))"));
        assert_eq!(query.binds()[0], SqlValue::Texts(strings(&["mus_musculus"])));
    }

    #[test]
    fn test_division_filter_follows_group_type() {
        let filters = GenomeFilters {
            division: strings(&["plants"]),
            organism_group_type: Some("DIVISION".to_string()),
            ..Default::default()
        };
        let query = build(&VisibilityPolicy::allow_unreleased(1), &filters);
        let sql = query.sql();

        assert!(sql.contains("og.type = $1 AND og.name = ANY($2)"));
        assert_eq!(query.binds()[1], SqlValue::Texts(strings(&["EnsemblPlants"])));
    }

    #[test]
    fn test_page_offset() {
        let filters = GenomeFilters {
            page: 3,
            batch_size: 10,
            ..Default::default()
        };
        let query = build(&VisibilityPolicy::allow_unreleased(1), &filters);
        let binds = query.binds();
        assert_eq!(binds[binds.len() - 1], SqlValue::BigInt(20));
    }

    #[test]
    fn test_row_without_dataset_uuid_is_dropped() {
        let raw = RawGenomeRow {
            genome_uuid: Uuid::nil(),
            species: "homo_sapiens".to_string(),
            dataset_uuid: None,
            dataset_status: DatasetStatus::Submitted,
            dataset_source: "core".to_string(),
            dataset_type: "assembly".to_string(),
        };
        assert!(raw.into_row().is_none());
    }
}
