//! Update dataset status command

use gmc_common::DatasetStatus;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::features::datasets::graph::DatasetGraph;
use crate::features::datasets::lifecycle::{parse_depends_on, plan_transition};
use crate::features::datasets::store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDatasetStatusCommand {
    pub dataset_uuid: Uuid,
    pub status: DatasetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDatasetStatusResponse {
    pub dataset_uuid: Uuid,
    /// Status after the update; equals the previous status for a no-op.
    pub status: DatasetStatus,
    /// Descendants moved along with the dataset
    pub propagated: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateDatasetStatusError {
    #[error("Dataset '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Apply a status change on an open connection or transaction.
///
/// The caller owns the transaction and must roll it back on error, since a
/// failure partway through the writes leaves some rows updated.
pub async fn apply(
    conn: &mut PgConnection,
    dataset_uuid: Uuid,
    status: DatasetStatus,
) -> Result<UpdateDatasetStatusResponse, UpdateDatasetStatusError> {
    let dataset = store::dataset_by_uuid(&mut *conn, dataset_uuid)
        .await?
        .ok_or(UpdateDatasetStatusError::NotFound(dataset_uuid))?;

    let graph = DatasetGraph::load(&mut *conn, dataset.dataset_id).await?;
    let depends_on = parse_depends_on(dataset.depends_on.as_deref());
    let plan = plan_transition(&graph, dataset.dataset_id, status, &depends_on)?;

    for (dataset_id, new_status) in &plan.writes {
        sqlx::query("UPDATE dataset SET status = $1 WHERE dataset_id = $2")
            .bind(new_status)
            .bind(dataset_id)
            .execute(&mut *conn)
            .await?;
    }

    if plan.writes.is_empty() {
        tracing::debug!(dataset_uuid = %dataset_uuid, status = %plan.status, "Status unchanged");
    } else {
        tracing::info!(
            dataset_uuid = %dataset_uuid,
            from = %dataset.status,
            to = %plan.status,
            propagated = plan.propagated.len(),
            "Dataset status updated"
        );
    }

    Ok(UpdateDatasetStatusResponse {
        dataset_uuid,
        status: plan.status,
        propagated: plan.propagated,
    })
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: UpdateDatasetStatusCommand,
) -> Result<UpdateDatasetStatusResponse, UpdateDatasetStatusError> {
    let mut tx = pool.begin().await?;
    let response = apply(&mut *tx, command.dataset_uuid, command.status).await?;
    tx.commit().await?;
    Ok(response)
}
