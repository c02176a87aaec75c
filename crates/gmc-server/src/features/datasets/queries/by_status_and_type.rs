//! Genomes holding datasets of a given type and status

use gmc_common::DatasetStatus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::releases::filter::{ReleaseQuery, SqlValue, WithRelease};
use crate::visibility::VisibilityPolicy;

const GENOME_DATASET_REF_SELECT: &str = "SELECT g.genome_uuid, g.production_name, d.dataset_uuid \
     FROM genome g \
     JOIN genome_dataset gd ON gd.genome_id = g.genome_id \
     JOIN dataset d ON d.dataset_id = gd.dataset_id \
     JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GenomeDatasetRef {
    pub genome_uuid: Uuid,
    pub production_name: String,
    pub dataset_uuid: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GenomesByStatusError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lookup for `status` and `dataset_type`; the genome-dataset link must pass
/// the release visibility check of `policy`.
pub fn build(
    policy: &VisibilityPolicy,
    status: DatasetStatus,
    dataset_type: &str,
) -> ReleaseQuery<WithRelease> {
    ReleaseQuery::new(GENOME_DATASET_REF_SELECT)
        .filter_eq("d.status::text", SqlValue::Text(status.as_str().to_string()))
        .filter_eq("dt.name", SqlValue::Text(dataset_type.to_string()))
        .join_release("LEFT JOIN ensembl_release er ON er.release_id = gd.release_id")
        .with_visibility(policy, None)
        .group_by(&["g.genome_id", "d.dataset_id"])
        .order_by(&["g.genome_uuid", "d.dataset_uuid"])
}

/// Every (genome, dataset) pair where the dataset has `dataset_type` and `status`.
///
/// When unreleased rows are hidden only `Released` datasets linked to a
/// `Released` release of the current site can match, so any other status
/// yields an empty list.
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    policy: VisibilityPolicy,
    status: DatasetStatus,
    dataset_type: String,
) -> Result<Vec<GenomeDatasetRef>, GenomesByStatusError> {
    if !policy.allow_unreleased && status != DatasetStatus::Released {
        tracing::debug!(%status, "Unreleased datasets are hidden");
        return Ok(Vec::new());
    }

    let rows = build(&policy, status, &dataset_type).fetch_all(&pool).await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_unreleased_joins_released_site_release() {
        let query = build(&VisibilityPolicy::released_only(2), DatasetStatus::Released, "assembly");
        let sql = query.sql();

        assert!(sql.contains("LEFT JOIN ensembl_release er ON er.release_id = gd.release_id"));
        assert!(sql.contains("JOIN ensembl_site es ON es.site_id = er.site_id AND es.site_id = $3"));
        assert!(!sql.contains("LEFT JOIN ensembl_site"));
        assert!(sql.contains("er.status = 'Released'"));
        assert_eq!(query.binds()[2], SqlValue::Int(2));
    }

    #[test]
    fn test_visible_unreleased_keeps_releaseless_links() {
        let sql = build(&VisibilityPolicy::allow_unreleased(1), DatasetStatus::Processing, "genebuild").sql();

        assert!(sql.contains("LEFT JOIN ensembl_site es"));
        assert!(!sql.contains("er.status = 'Released'"));
        assert!(sql.contains("d.status::text = $1 AND dt.name = $2"));
        assert!(sql.ends_with("GROUP BY g.genome_id, d.dataset_id ORDER BY g.genome_uuid, d.dataset_uuid"));
    }
}
