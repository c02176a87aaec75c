//! Releases that include a genome

use sqlx::PgPool;
use uuid::Uuid;

use super::FetchReleasesError;
use crate::features::releases::filter::{ReleaseQuery, SqlValue, WithRelease};
use crate::features::releases::types::{ReleaseRecord, RELEASE_COLUMNS};
use crate::visibility::VisibilityPolicy;

pub fn build(policy: &VisibilityPolicy, genome_uuid: Uuid) -> ReleaseQuery<WithRelease> {
    ReleaseQuery::new(format!(
        "SELECT {} FROM genome_release gr JOIN genome g ON g.genome_id = gr.genome_id",
        RELEASE_COLUMNS
    ))
    .filter_eq("g.genome_uuid", SqlValue::Uuid(genome_uuid))
    .join_release("JOIN ensembl_release er ON er.release_id = gr.release_id")
    .with_visibility(policy, None)
    .order_by(&["er.version"])
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    policy: VisibilityPolicy,
    genome_uuid: Uuid,
) -> Result<Vec<ReleaseRecord>, FetchReleasesError> {
    Ok(build(&policy, genome_uuid).fetch_all(&pool).await?)
}
