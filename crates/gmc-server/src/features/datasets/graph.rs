//! In-memory arena of related datasets
//!
//! Datasets form a DAG through `dataset.parent_id`. Rather than chasing parent
//! links one query at a time, the lifecycle code loads every dataset attached
//! to the same genome(s) as its target in a single round trip and walks the
//! links here. Nodes are addressed by slot; `children` holds slot indices.

use std::collections::{HashMap, HashSet};

use gmc_common::DatasetStatus;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DatasetNode {
    pub dataset_id: i32,
    pub dataset_uuid: Uuid,
    pub parent_id: Option<i32>,
    pub status: DatasetStatus,
    pub dataset_type: String,
    /// Whether a genome-dataset link shared with the loaded target is current.
    pub is_current: bool,
}

#[derive(Debug, Default)]
pub struct DatasetGraph {
    nodes: Vec<DatasetNode>,
    index: HashMap<i32, usize>,
    children: Vec<Vec<usize>>,
}

impl DatasetGraph {
    /// Build the arena. Duplicate ids keep their first occurrence; parent links
    /// pointing outside the loaded set are ignored.
    pub fn new(nodes: Vec<DatasetNode>) -> Self {
        let mut graph = Self::default();

        for node in nodes {
            if graph.index.contains_key(&node.dataset_id) {
                continue;
            }
            graph.index.insert(node.dataset_id, graph.nodes.len());
            graph.nodes.push(node);
            graph.children.push(Vec::new());
        }

        for (slot, node) in graph.nodes.iter().enumerate() {
            if let Some(&parent) = node.parent_id.and_then(|id| graph.index.get(&id)) {
                graph.children[parent].push(slot);
            }
        }

        graph
    }

    /// Load the target dataset and every dataset sharing a genome with it.
    pub async fn load(conn: &mut PgConnection, dataset_id: i32) -> sqlx::Result<Self> {
        let nodes: Vec<DatasetNode> = sqlx::query_as(
            r#"
            SELECT d.dataset_id, d.dataset_uuid, d.parent_id, d.status, dt.name AS dataset_type,
                   EXISTS (
                       SELECT 1
                       FROM genome_dataset link
                       JOIN genome_dataset target ON target.genome_id = link.genome_id
                       WHERE link.dataset_id = d.dataset_id
                         AND target.dataset_id = $1
                         AND link.is_current
                   ) AS is_current
            FROM dataset d
            JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
            WHERE d.dataset_id = $1
               OR d.dataset_id IN (
                   SELECT related.dataset_id
                   FROM genome_dataset target
                   JOIN genome_dataset related ON related.genome_id = target.genome_id
                   WHERE target.dataset_id = $1
               )
            ORDER BY d.dataset_id
            "#,
        )
        .bind(dataset_id)
        .fetch_all(&mut *conn)
        .await?;

        tracing::debug!(dataset_id, nodes = nodes.len(), "Loaded dataset graph");

        Ok(Self::new(nodes))
    }

    pub fn get(&self, dataset_id: i32) -> Option<&DatasetNode> {
        self.index.get(&dataset_id).map(|&slot| &self.nodes[slot])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every dataset reachable through child links, depth first, each at most
    /// once. The start node is never part of the result, even on a cycle.
    pub fn descendants(&self, dataset_id: i32) -> Vec<&DatasetNode> {
        let Some(&start) = self.index.get(&dataset_id) else {
            return Vec::new();
        };

        let mut visited = HashSet::from([start]);
        let mut stack: Vec<usize> = self.children[start].iter().rev().copied().collect();
        let mut found = Vec::new();

        while let Some(slot) = stack.pop() {
            if !visited.insert(slot) {
                continue;
            }
            found.push(&self.nodes[slot]);
            stack.extend(self.children[slot].iter().rev().copied());
        }

        found
    }

    pub fn of_type<'a>(&'a self, dataset_type: &'a str) -> impl Iterator<Item = &'a DatasetNode> {
        self.nodes.iter().filter(move |node| node.dataset_type == dataset_type)
    }

    /// Datasets of `dataset_type` that have not been superseded.
    pub fn current_of_type<'a>(&'a self, dataset_type: &'a str) -> impl Iterator<Item = &'a DatasetNode> {
        self.of_type(dataset_type).filter(|node| node.is_current)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn node(id: i32, parent: Option<i32>, status: DatasetStatus, kind: &str) -> DatasetNode {
        DatasetNode {
            dataset_id: id,
            dataset_uuid: Uuid::from_u128(id as u128),
            parent_id: parent,
            status,
            dataset_type: kind.to_string(),
            is_current: true,
        }
    }

    pub(crate) fn superseded(mut node: DatasetNode) -> DatasetNode {
        node.is_current = false;
        node
    }

    fn ids(nodes: &[&DatasetNode]) -> Vec<i32> {
        nodes.iter().map(|n| n.dataset_id).collect()
    }

    #[test]
    fn test_descendants_are_transitive() {
        use DatasetStatus::*;
        let graph = DatasetGraph::new(vec![
            node(1, None, Submitted, "genebuild"),
            node(2, Some(1), Submitted, "xrefs"),
            node(3, Some(2), Submitted, "protein_features"),
            node(4, Some(1), Submitted, "alpha_fold"),
            node(5, None, Submitted, "assembly"),
        ]);

        assert_eq!(ids(&graph.descendants(1)), vec![2, 3, 4]);
        assert_eq!(ids(&graph.descendants(2)), vec![3]);
        assert!(graph.descendants(5).is_empty());
        assert!(graph.descendants(99).is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        use DatasetStatus::*;
        let graph = DatasetGraph::new(vec![
            node(1, Some(3), Submitted, "a"),
            node(2, Some(1), Submitted, "b"),
            node(3, Some(2), Submitted, "c"),
        ]);

        assert_eq!(ids(&graph.descendants(1)), vec![2, 3]);
    }

    #[test]
    fn test_duplicates_and_dangling_parents() {
        use DatasetStatus::*;
        let graph = DatasetGraph::new(vec![
            node(1, Some(42), Processed, "genebuild"),
            node(1, None, Submitted, "genebuild"),
            node(2, Some(1), Processed, "xrefs"),
        ]);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get(1).map(|n| n.status), Some(Processed));
        assert_eq!(graph.of_type("xrefs").count(), 1);
    }

    #[test]
    fn test_current_of_type_skips_superseded() {
        use DatasetStatus::*;
        let graph = DatasetGraph::new(vec![
            superseded(node(1, None, Processed, "assembly")),
            node(2, None, Submitted, "assembly"),
        ]);

        assert_eq!(graph.of_type("assembly").count(), 2);
        assert_eq!(ids(&graph.current_of_type("assembly").collect::<Vec<_>>()), vec![2]);
    }
}
