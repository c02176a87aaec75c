//! Dataset status transitions
//!
//! Decides, without touching the database, which rows a status request writes:
//!
//! | Requested    | Requires                                            | Also writes                          |
//! |--------------|-----------------------------------------------------|--------------------------------------|
//! | `Processing` | current `depends_on` datasets are complete          | Submitted descendants → Processing   |
//! | `Processed`  | every descendant is complete                        | nothing                              |
//! | `Released`   | every descendant is complete                        | Processed descendants → Released     |
//!
//! Requests below the current status are rejected; requesting the current
//! status writes nothing.

use gmc_common::DatasetStatus;
use uuid::Uuid;

use super::graph::DatasetGraph;
use crate::error::LifecycleError;

/// Rows to update for one accepted transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub dataset_uuid: Uuid,
    pub status: DatasetStatus,
    /// `(dataset_id, new status)` pairs, target first.
    pub writes: Vec<(i32, DatasetStatus)>,
    /// Descendants whose status changes along with the target.
    pub propagated: Vec<Uuid>,
}

/// Split a `depends_on` column into dataset type names.
pub fn parse_depends_on(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split([',', ';'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Plan moving `dataset_id` to `requested`.
///
/// `depends_on` lists the dataset types whose current dataset for the same
/// genome must be complete before processing can start; superseded datasets
/// do not count.
pub fn plan_transition(
    graph: &DatasetGraph,
    dataset_id: i32,
    requested: DatasetStatus,
    depends_on: &[String],
) -> Result<TransitionPlan, LifecycleError> {
    let Some(target) = graph.get(dataset_id) else {
        return Ok(TransitionPlan {
            dataset_uuid: Uuid::nil(),
            status: requested,
            writes: Vec::new(),
            propagated: Vec::new(),
        });
    };

    let mut plan = TransitionPlan {
        dataset_uuid: target.dataset_uuid,
        status: target.status,
        writes: Vec::new(),
        propagated: Vec::new(),
    };

    if requested == target.status {
        return Ok(plan);
    }

    if requested < target.status {
        return Err(LifecycleError::Regression {
            dataset_uuid: target.dataset_uuid,
            current: target.status,
            requested,
        });
    }

    let descendants = graph.descendants(dataset_id);

    let cascade_from = match requested {
        DatasetStatus::Processing => {
            let blocking: Vec<String> = depends_on
                .iter()
                .filter(|kind| {
                    !graph
                        .current_of_type(kind)
                        .any(|node| node.dataset_id != dataset_id && node.status.is_complete())
                })
                .cloned()
                .collect();

            if !blocking.is_empty() {
                return Err(LifecycleError::DependenciesIncomplete {
                    dataset_uuid: target.dataset_uuid,
                    blocking,
                });
            }

            Some(DatasetStatus::Submitted)
        },
        DatasetStatus::Processed | DatasetStatus::Released => {
            let pending: Vec<(Uuid, DatasetStatus)> = descendants
                .iter()
                .filter(|node| !node.status.is_complete())
                .map(|node| (node.dataset_uuid, node.status))
                .collect();

            if !pending.is_empty() {
                return Err(LifecycleError::DescendantsIncomplete {
                    dataset_uuid: target.dataset_uuid,
                    requested,
                    pending,
                });
            }

            (requested == DatasetStatus::Released).then_some(DatasetStatus::Processed)
        },
        // Nothing sits below Submitted, so it can never be an advance
        DatasetStatus::Submitted => None,
    };

    plan.status = requested;
    plan.writes.push((dataset_id, requested));

    if let Some(from) = cascade_from {
        for node in descendants.into_iter().filter(|node| node.status == from) {
            plan.writes.push((node.dataset_id, requested));
            plan.propagated.push(node.dataset_uuid);
        }
    }

    Ok(plan)
}
