//! Releases a dataset is associated with

use sqlx::PgPool;
use uuid::Uuid;

use super::FetchReleasesError;
use crate::features::releases::filter::{ReleaseQuery, SqlValue, WithRelease};
use crate::features::releases::types::{ReleaseRecord, RELEASE_COLUMNS};
use crate::visibility::VisibilityPolicy;

pub fn build(policy: &VisibilityPolicy, dataset_uuid: Uuid) -> ReleaseQuery<WithRelease> {
    // One dataset can reach the same release through several genomes
    ReleaseQuery::new(format!(
        "SELECT DISTINCT {} FROM dataset d \
         JOIN genome_dataset gd ON gd.dataset_id = d.dataset_id",
        RELEASE_COLUMNS
    ))
    .filter_eq("d.dataset_uuid", SqlValue::Uuid(dataset_uuid))
    .join_release("JOIN ensembl_release er ON er.release_id = gd.release_id")
    .with_visibility(policy, None)
    .order_by(&["er.version"])
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    policy: VisibilityPolicy,
    dataset_uuid: Uuid,
) -> Result<Vec<ReleaseRecord>, FetchReleasesError> {
    Ok(build(&policy, dataset_uuid).fetch_all(&pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_releases_apply_visibility() {
        let sql = build(&VisibilityPolicy::default(), Uuid::nil()).sql();
        assert!(sql.starts_with("SELECT DISTINCT"));
        assert!(sql.contains("d.dataset_uuid = $1"));
        assert!(sql.contains("es.site_id = $2"));
        assert!(sql.contains("er.status = 'Released'"));
    }
}
