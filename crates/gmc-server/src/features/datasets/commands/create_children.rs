//! Create child datasets command
//!
//! Dataset types declare their parent type in `dataset_type.parent_id`. Given
//! a parent dataset, this creates one dataset for every child type (and their
//! child types, recursively) that the parent's genome does not have yet.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::datasets::store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChildDatasetsCommand {
    pub parent_uuid: Uuid,
    /// Only create children whose type carries this topic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChildDatasetsResponse {
    pub parent_uuid: Uuid,
    pub created: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateChildDatasetsError {
    #[error("Dataset '{0}' not found")]
    ParentNotFound(Uuid),

    #[error("Dataset '{dataset_uuid}' must be linked to exactly one genome, found {genomes}")]
    GenomeLinkCount { dataset_uuid: Uuid, genomes: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DatasetTypeRow {
    pub dataset_type_id: i32,
    pub name: String,
    pub topic: String,
    pub parent_id: Option<i32>,
}

/// A child dataset to insert under `parent`; `parent` indexes into the plan,
/// `None` meaning the requested parent dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChild {
    pub parent: Option<usize>,
    pub dataset_type_id: i32,
    pub name: String,
}

/// Walk the type table breadth first from `root_type`.
///
/// Types already present for the genome are skipped together with their
/// subtree, and a type is never planned twice, so self-referencing type
/// chains terminate.
pub fn plan_children(
    types: &[DatasetTypeRow],
    root_type: i32,
    existing: &HashSet<i32>,
    topic: Option<&str>,
) -> Vec<PlannedChild> {
    let mut by_parent: HashMap<i32, Vec<&DatasetTypeRow>> = HashMap::new();
    for row in types {
        if let Some(parent) = row.parent_id {
            by_parent.entry(parent).or_default().push(row);
        }
    }
    for children in by_parent.values_mut() {
        children.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let mut visited = HashSet::from([root_type]);
    let mut plan = Vec::new();
    let mut queue = std::collections::VecDeque::from([(None, root_type)]);

    while let Some((parent, type_id)) = queue.pop_front() {
        for child in by_parent.get(&type_id).into_iter().flatten() {
            if topic.is_some_and(|t| t != child.topic) {
                continue;
            }
            if !visited.insert(child.dataset_type_id) {
                tracing::warn!(dataset_type = %child.name, "Dataset type reached twice, skipping");
                continue;
            }
            if existing.contains(&child.dataset_type_id) {
                tracing::debug!(dataset_type = %child.name, "Genome already has a dataset of this type");
                continue;
            }

            plan.push(PlannedChild {
                parent,
                dataset_type_id: child.dataset_type_id,
                name: child.name.clone(),
            });
            queue.push_back((Some(plan.len() - 1), child.dataset_type_id));
        }
    }

    plan
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: CreateChildDatasetsCommand,
) -> Result<CreateChildDatasetsResponse, CreateChildDatasetsError> {
    let mut tx = pool.begin().await?;

    let parent = store::dataset_by_uuid(&mut *tx, command.parent_uuid)
        .await?
        .ok_or(CreateChildDatasetsError::ParentNotFound(command.parent_uuid))?;

    let genomes: Vec<i32> =
        sqlx::query_scalar("SELECT DISTINCT genome_id FROM genome_dataset WHERE dataset_id = $1")
            .bind(parent.dataset_id)
            .fetch_all(&mut *tx)
            .await?;
    let genome_id = match genomes.as_slice() {
        [genome_id] => *genome_id,
        _ => {
            return Err(CreateChildDatasetsError::GenomeLinkCount {
                dataset_uuid: parent.dataset_uuid,
                genomes: genomes.len(),
            })
        },
    };

    let types: Vec<DatasetTypeRow> =
        sqlx::query_as("SELECT dataset_type_id, name, topic, parent_id FROM dataset_type")
            .fetch_all(&mut *tx)
            .await?;

    let existing: HashSet<i32> = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT DISTINCT d.dataset_type_id
        FROM dataset d
        JOIN genome_dataset gd ON gd.dataset_id = d.dataset_id
        WHERE gd.genome_id = $1
        "#,
    )
    .bind(genome_id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .collect();

    let plan = plan_children(&types, parent.dataset_type_id, &existing, command.topic.as_deref());

    let label = format!("Child of {}", parent.name);
    let mut inserted: Vec<(i32, Uuid)> = Vec::with_capacity(plan.len());

    for child in &plan {
        let parent_id = match child.parent {
            Some(slot) => inserted[slot].0,
            None => parent.dataset_id,
        };
        let dataset_uuid = Uuid::new_v4();

        let dataset_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO dataset
                (dataset_uuid, dataset_type_id, name, dataset_source_id, label, status, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING dataset_id
            "#,
        )
        .bind(dataset_uuid)
        .bind(child.dataset_type_id)
        .bind(&child.name)
        .bind(parent.dataset_source_id)
        .bind(&label)
        .bind(parent.status)
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await?;

        store::link_as_current(&mut *tx, genome_id, dataset_id, child.dataset_type_id, None).await?;

        tracing::debug!(dataset_uuid = %dataset_uuid, dataset_type = %child.name, "Child dataset created");
        inserted.push((dataset_id, dataset_uuid));
    }

    tx.commit().await?;

    tracing::info!(created = inserted.len(), "Child datasets created");

    Ok(CreateChildDatasetsResponse {
        parent_uuid: parent.dataset_uuid,
        created: inserted.into_iter().map(|(_, uuid)| uuid).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, name: &str, topic: &str, parent: Option<i32>) -> DatasetTypeRow {
        DatasetTypeRow {
            dataset_type_id: id,
            name: name.to_string(),
            topic: topic.to_string(),
            parent_id: parent,
        }
    }

    fn types() -> Vec<DatasetTypeRow> {
        vec![
            row(1, "genebuild", "production_process", None),
            row(2, "xrefs", "production_process", Some(1)),
            row(3, "protein_features", "production_process", Some(2)),
            row(4, "alpha_fold", "production_preparation", Some(1)),
            row(5, "assembly", "production_process", None),
        ]
    }

    fn names(plan: &[PlannedChild]) -> Vec<&str> {
        plan.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_plan_walks_type_tree() {
        let plan = plan_children(&types(), 1, &HashSet::new(), None);
        assert_eq!(names(&plan), vec!["alpha_fold", "xrefs", "protein_features"]);
        assert_eq!(plan[2].parent, Some(1));
        assert_eq!(plan[0].parent, None);
    }

    #[test]
    fn test_plan_respects_topic() {
        let plan = plan_children(&types(), 1, &HashSet::new(), Some("production_process"));
        assert_eq!(names(&plan), vec!["xrefs", "protein_features"]);
    }

    #[test]
    fn test_plan_skips_existing_types() {
        let plan = plan_children(&types(), 1, &HashSet::from([2]), None);
        assert_eq!(names(&plan), vec!["alpha_fold"]);
    }

    #[test]
    fn test_plan_terminates_on_type_cycle() {
        let types = vec![row(1, "a", "t", Some(2)), row(2, "b", "t", Some(1))];
        let plan = plan_children(&types, 1, &HashSet::new(), None);
        assert_eq!(names(&plan), vec!["b"]);
    }

    #[test]
    fn test_leaf_type_has_no_children() {
        assert!(plan_children(&types(), 5, &HashSet::new(), None).is_empty());
    }
}
