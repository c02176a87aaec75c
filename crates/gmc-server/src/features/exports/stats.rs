//! Release statistics
//!
//! For every released partial release (ordered by label) the report gives the
//! counts introduced by that release and the running totals across all
//! partial releases seen so far. Totals are set unions of the underlying ids,
//! so a genome or dataset attached to several releases is counted once.
//! Integrated releases report absolute counts with no running total.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use gmc_common::{ReleaseStatus, ReleaseType};
use serde::Serialize;
use sqlx::PgPool;

use super::ensure_parent_dir;
use crate::features::releases::filter::{ReleaseQuery, SqlValue};
use crate::visibility::VisibilityPolicy;

pub const PARTIAL_STATS_FILE: &str = "stats.partial.csv";
pub const INTEGRATED_STATS_FILE: &str = "stats.integrated.csv";

pub const PARTIAL_COLUMNS: [&str; 9] = [
    "release",
    "new_genomes",
    "total_genomes",
    "new_assemblies",
    "total_assemblies",
    "new_variation_datasets",
    "total_variation_datasets",
    "new_regulation_datasets",
    "total_regulation_datasets",
];

pub const INTEGRATED_COLUMNS: [&str; 5] =
    ["release", "genomes", "assemblies", "variation_datasets", "regulation_datasets"];

const VARIATION_TYPE: &str = "variation";
const REGULATION_TYPE: &str = "regulatory_features";

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Failed to write stats: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode stats: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Ids attached to one released release.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseContent {
    pub release_id: i32,
    pub label: String,
    pub release_type: ReleaseType,
    pub genomes: BTreeSet<i32>,
    pub assemblies: BTreeSet<i32>,
    pub variation_datasets: BTreeSet<i32>,
    pub regulation_datasets: BTreeSet<i32>,
}

impl ReleaseContent {
    pub fn new(release_id: i32, label: impl Into<String>, release_type: ReleaseType) -> Self {
        Self {
            release_id,
            label: label.into(),
            release_type,
            genomes: BTreeSet::new(),
            assemblies: BTreeSet::new(),
            variation_datasets: BTreeSet::new(),
            regulation_datasets: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialStats {
    pub release: String,
    pub new_genomes: usize,
    pub total_genomes: usize,
    pub new_assemblies: usize,
    pub total_assemblies: usize,
    pub new_variation_datasets: usize,
    pub total_variation_datasets: usize,
    pub new_regulation_datasets: usize,
    pub total_regulation_datasets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegratedStats {
    pub release: String,
    pub genomes: usize,
    pub assemblies: usize,
    pub variation_datasets: usize,
    pub regulation_datasets: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub partial: Vec<PartialStats>,
    pub integrated: Vec<IntegratedStats>,
}

#[derive(Default)]
struct RunningTotals {
    genomes: BTreeSet<i32>,
    assemblies: BTreeSet<i32>,
    variation: BTreeSet<i32>,
    regulation: BTreeSet<i32>,
}

fn sorted_by_label(releases: &[ReleaseContent], release_type: ReleaseType) -> Vec<&ReleaseContent> {
    let mut selected: Vec<_> =
        releases.iter().filter(|r| r.release_type == release_type).collect();
    selected.sort_by(|a, b| a.label.cmp(&b.label).then(a.release_id.cmp(&b.release_id)));
    selected
}

/// Per-release and cumulative counts for the partial releases in `releases`.
pub fn partial_stats(releases: &[ReleaseContent]) -> Vec<PartialStats> {
    let mut totals = RunningTotals::default();

    sorted_by_label(releases, ReleaseType::Partial)
        .into_iter()
        .map(|release| {
            totals.genomes.extend(&release.genomes);
            totals.assemblies.extend(&release.assemblies);
            totals.variation.extend(&release.variation_datasets);
            totals.regulation.extend(&release.regulation_datasets);

            PartialStats {
                release: release.label.clone(),
                new_genomes: release.genomes.len(),
                total_genomes: totals.genomes.len(),
                new_assemblies: release.assemblies.len(),
                total_assemblies: totals.assemblies.len(),
                new_variation_datasets: release.variation_datasets.len(),
                total_variation_datasets: totals.variation.len(),
                new_regulation_datasets: release.regulation_datasets.len(),
                total_regulation_datasets: totals.regulation.len(),
            }
        })
        .collect()
}

/// Absolute counts for the integrated releases in `releases`.
pub fn integrated_stats(releases: &[ReleaseContent]) -> Vec<IntegratedStats> {
    sorted_by_label(releases, ReleaseType::Integrated)
        .into_iter()
        .map(|release| IntegratedStats {
            release: release.label.clone(),
            genomes: release.genomes.len(),
            assemblies: release.assemblies.len(),
            variation_datasets: release.variation_datasets.len(),
            regulation_datasets: release.regulation_datasets.len(),
        })
        .collect()
}

impl StatsReport {
    pub fn from_releases(releases: &[ReleaseContent]) -> Self {
        Self {
            partial: partial_stats(releases),
            integrated: integrated_stats(releases),
        }
    }

    /// Write both CSV files into `dir`, creating it when missing.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf), StatsError> {
        std::fs::create_dir_all(dir)?;

        let partial_path = dir.join(PARTIAL_STATS_FILE);
        write_csv(&partial_path, &PARTIAL_COLUMNS, &self.partial)?;

        let integrated_path = dir.join(INTEGRATED_STATS_FILE);
        write_csv(&integrated_path, &INTEGRATED_COLUMNS, &self.integrated)?;

        tracing::info!(
            partial = self.partial.len(),
            integrated = self.integrated.len(),
            dir = %dir.display(),
            "Stats written"
        );
        Ok((partial_path, integrated_path))
    }
}

// The header is written explicitly so an empty report still gets one.
fn write_csv<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<(), StatsError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    release_id: i32,
    label: String,
    release_type: ReleaseType,
}

/// Load the ids attached to every visible released release.
#[tracing::instrument(skip(pool))]
pub async fn load_release_contents(
    pool: &PgPool,
    policy: &VisibilityPolicy,
) -> Result<Vec<ReleaseContent>, StatsError> {
    let releases: Vec<ReleaseRow> = ReleaseQuery::from_releases(
        "SELECT er.release_id, COALESCE(er.label, '') AS label, er.release_type \
         FROM ensembl_release er",
    )
    .with_visibility(policy, Some(ReleaseStatus::Released))
    .order_by(&["er.label", "er.release_id"])
    .fetch_all(pool)
    .await?;

    let mut contents: BTreeMap<i32, ReleaseContent> = releases
        .into_iter()
        .map(|r| (r.release_id, ReleaseContent::new(r.release_id, r.label, r.release_type)))
        .collect();
    if contents.is_empty() {
        return Ok(Vec::new());
    }
    let release_ids: Vec<i32> = contents.keys().copied().collect();

    let genomes = sqlx::query_as::<_, (i32, i32, i32)>(
        r#"
        SELECT gr.release_id, g.genome_id, g.assembly_id
        FROM genome_release gr
        JOIN genome g ON g.genome_id = gr.genome_id
        WHERE gr.release_id = ANY($1)
        "#,
    )
    .bind(&release_ids)
    .fetch_all(pool)
    .await?;

    for (release_id, genome_id, assembly_id) in genomes {
        if let Some(content) = contents.get_mut(&release_id) {
            content.genomes.insert(genome_id);
            content.assemblies.insert(assembly_id);
        }
    }

    let datasets = sqlx::query_as::<_, (i32, i32, String)>(
        r#"
        SELECT gd.release_id, gd.dataset_id, dt.name
        FROM genome_dataset gd
        JOIN dataset d ON d.dataset_id = gd.dataset_id
        JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
        WHERE gd.release_id = ANY($1)
          AND d.status = 'Released'
          AND dt.name = ANY($2)
        "#,
    )
    .bind(&release_ids)
    .bind(vec![VARIATION_TYPE.to_string(), REGULATION_TYPE.to_string()])
    .fetch_all(pool)
    .await?;

    for (release_id, dataset_id, dataset_type) in datasets {
        let Some(content) = contents.get_mut(&release_id) else {
            continue;
        };
        match dataset_type.as_str() {
            VARIATION_TYPE => content.variation_datasets.insert(dataset_id),
            REGULATION_TYPE => content.regulation_datasets.insert(dataset_id),
            _ => false,
        };
    }

    Ok(contents.into_values().collect())
}

/// Compute the stats report for every visible released release.
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, policy: VisibilityPolicy) -> Result<StatsReport, StatsError> {
    let contents = load_release_contents(&pool, &policy).await?;
    let report = StatsReport::from_releases(&contents);
    tracing::debug!(
        partial = report.partial.len(),
        integrated = report.integrated.len(),
        "Computed release stats"
    );
    Ok(report)
}
