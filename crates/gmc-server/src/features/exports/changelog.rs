//! Per-release genome changelog
//!
//! A partial release lists every genome whose genebuild, variation or
//! regulation dataset was attached to it, with a 0/1 flag per dataset kind.
//! An integrated release lists its genomes with the partial release label in
//! which each dataset kind was last released, compared against the previous
//! integrated release: `New`, `Updated`, `Unchanged`, or `Removed` for genomes
//! that only the previous release carried.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use gmc_common::ReleaseType;
use serde::Serialize;
use sqlx::PgPool;

use super::ensure_parent_dir;
use crate::features::releases::filter::{ReleaseQuery, SqlValue};
use crate::visibility::VisibilityPolicy;

const GENEBUILD_TYPE: &str = "genebuild";
const VARIATION_TYPE: &str = "variation";
const REGULATION_TYPE: &str = "regulatory_features";
const ANNOTATION_SOURCE_ATTRIBUTE: &str = "genebuild.annotation_source";

pub const PARTIAL_COLUMNS: [&str; 8] = [
    "scientific_name",
    "common_name",
    "assembly_name",
    "assembly_accession",
    "annotation_provider",
    "geneset_updated",
    "variation_updated",
    "regulation_updated",
];

pub const INTEGRATED_COLUMNS: [&str; 9] = [
    "scientific_name",
    "common_name",
    "assembly_name",
    "assembly_accession",
    "annotation_provider",
    "geneset_updated",
    "variation_updated",
    "regulation_updated",
    "status",
];

#[derive(Debug, thiserror::Error)]
pub enum ChangelogError {
    #[error("Release '{0}' not found")]
    ReleaseNotFound(String),

    #[error("Failed to write changelog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode changelog: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Classification of a genome in an integrated release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeStatus {
    New,
    Updated,
    Unchanged,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct GenomeSummary {
    #[serde(skip)]
    pub genome_id: i32,
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub assembly_name: String,
    pub assembly_accession: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialEntry {
    #[serde(flatten)]
    pub genome: GenomeSummary,
    pub annotation_provider: Option<String>,
    pub geneset_updated: u8,
    pub variation_updated: u8,
    pub regulation_updated: u8,
}

/// Partial release labels of one genome's datasets in an integrated release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetLabels {
    pub geneset: Option<String>,
    pub variation: Option<String>,
    pub regulation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeSnapshot {
    pub genome: GenomeSummary,
    pub labels: DatasetLabels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegratedEntry {
    #[serde(flatten)]
    pub genome: GenomeSummary,
    pub annotation_provider: Option<String>,
    pub geneset_updated: Option<String>,
    pub variation_updated: Option<String>,
    pub regulation_updated: Option<String>,
    pub status: ChangeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "release_type", content = "entries", rename_all = "lowercase")]
pub enum ChangelogEntries {
    Partial(Vec<PartialEntry>),
    Integrated(Vec<IntegratedEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogReport {
    pub label: String,
    #[serde(flatten)]
    pub entries: ChangelogEntries,
}

impl ChangelogReport {
    pub fn len(&self) -> usize {
        match &self.entries {
            ChangelogEntries::Partial(rows) => rows.len(),
            ChangelogEntries::Integrated(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the comment line, header and rows as CSV.
    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<(), ChangelogError> {
        writeln!(out, "# Changelog for release {}", self.label)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
        match &self.entries {
            ChangelogEntries::Partial(rows) => {
                writer.write_record(PARTIAL_COLUMNS)?;
                for row in rows {
                    writer.serialize(PartialRecord::from(row))?;
                }
            },
            ChangelogEntries::Integrated(rows) => {
                writer.write_record(INTEGRATED_COLUMNS)?;
                for row in rows {
                    writer.serialize(IntegratedRecord::from(row))?;
                }
            },
        }
        writer.flush()?;
        Ok(())
    }

    /// Write to `path`, creating parent directories.
    pub fn write_to_path(&self, path: &Path) -> Result<(), ChangelogError> {
        ensure_parent_dir(path)?;
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        tracing::info!(rows = self.len(), path = %path.display(), "Changelog written");
        Ok(())
    }
}

/// `<label>.csv` in the working directory.
pub fn default_output_path(label: &str) -> PathBuf {
    PathBuf::from(format!("{}.csv", label))
}

// The csv crate cannot serialize flattened structs, so rows are flattened by hand.
#[derive(Serialize)]
struct PartialRecord<'a> {
    scientific_name: Option<&'a str>,
    common_name: Option<&'a str>,
    assembly_name: &'a str,
    assembly_accession: &'a str,
    annotation_provider: Option<&'a str>,
    geneset_updated: u8,
    variation_updated: u8,
    regulation_updated: u8,
}

impl<'a> From<&'a PartialEntry> for PartialRecord<'a> {
    fn from(row: &'a PartialEntry) -> Self {
        Self {
            scientific_name: row.genome.scientific_name.as_deref(),
            common_name: row.genome.common_name.as_deref(),
            assembly_name: &row.genome.assembly_name,
            assembly_accession: &row.genome.assembly_accession,
            annotation_provider: row.annotation_provider.as_deref(),
            geneset_updated: row.geneset_updated,
            variation_updated: row.variation_updated,
            regulation_updated: row.regulation_updated,
        }
    }
}

#[derive(Serialize)]
struct IntegratedRecord<'a> {
    scientific_name: Option<&'a str>,
    common_name: Option<&'a str>,
    assembly_name: &'a str,
    assembly_accession: &'a str,
    annotation_provider: Option<&'a str>,
    geneset_updated: Option<&'a str>,
    variation_updated: Option<&'a str>,
    regulation_updated: Option<&'a str>,
    status: ChangeStatus,
}

impl<'a> From<&'a IntegratedEntry> for IntegratedRecord<'a> {
    fn from(row: &'a IntegratedEntry) -> Self {
        Self {
            scientific_name: row.genome.scientific_name.as_deref(),
            common_name: row.genome.common_name.as_deref(),
            assembly_name: &row.genome.assembly_name,
            assembly_accession: &row.genome.assembly_accession,
            annotation_provider: row.annotation_provider.as_deref(),
            geneset_updated: row.geneset_updated.as_deref(),
            variation_updated: row.variation_updated.as_deref(),
            regulation_updated: row.regulation_updated.as_deref(),
            status: row.status,
        }
    }
}

/// Classify `current` against `previous` (the prior integrated release, if any).
///
/// Current genomes keep their order; genomes only in `previous` follow as
/// `Removed` with their last known values.
pub fn diff_integrated(
    current: &[GenomeSnapshot],
    previous: Option<&[GenomeSnapshot]>,
    providers: &HashMap<i32, String>,
) -> Vec<IntegratedEntry> {
    let previous_by_id: HashMap<i32, &GenomeSnapshot> = previous
        .unwrap_or_default()
        .iter()
        .map(|s| (s.genome.genome_id, s))
        .collect();

    let entry = |snapshot: &GenomeSnapshot, status: ChangeStatus| IntegratedEntry {
        genome: snapshot.genome.clone(),
        annotation_provider: providers.get(&snapshot.genome.genome_id).cloned(),
        geneset_updated: snapshot.labels.geneset.clone(),
        variation_updated: snapshot.labels.variation.clone(),
        regulation_updated: snapshot.labels.regulation.clone(),
        status,
    };

    let mut entries: Vec<IntegratedEntry> = current
        .iter()
        .map(|snapshot| {
            let status = match previous_by_id.get(&snapshot.genome.genome_id) {
                None => ChangeStatus::New,
                Some(before) if before.labels != snapshot.labels => ChangeStatus::Updated,
                Some(_) => ChangeStatus::Unchanged,
            };
            entry(snapshot, status)
        })
        .collect();

    let current_ids: std::collections::HashSet<i32> =
        current.iter().map(|s| s.genome.genome_id).collect();
    entries.extend(
        previous
            .unwrap_or_default()
            .iter()
            .filter(|s| !current_ids.contains(&s.genome.genome_id))
            .map(|s| entry(s, ChangeStatus::Removed)),
    );

    entries
}

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    release_id: i32,
    release_type: ReleaseType,
}

#[derive(sqlx::FromRow)]
struct PartialFlagsRow {
    #[sqlx(flatten)]
    genome: GenomeSummary,
    geneset: Option<bool>,
    variation: Option<bool>,
    regulation: Option<bool>,
}

#[derive(sqlx::FromRow)]
struct DatasetLabelRow {
    genome_id: i32,
    dataset_type: String,
    partial_label: Option<String>,
}

const GENOME_SUMMARY_COLUMNS: &str = "g.genome_id, o.scientific_name, o.common_name, \
     a.name AS assembly_name, a.accession AS assembly_accession";

fn dataset_kinds() -> Vec<String> {
    [GENEBUILD_TYPE, VARIATION_TYPE, REGULATION_TYPE].iter().map(|s| s.to_string()).collect()
}

/// Build the changelog of the release labelled `label`.
///
/// The release must be visible under `policy`; an unknown or hidden label is
/// [`ChangelogError::ReleaseNotFound`].
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    policy: VisibilityPolicy,
    label: String,
) -> Result<ChangelogReport, ChangelogError> {
    let release = ReleaseQuery::from_releases(
        "SELECT er.release_id, er.release_type FROM ensembl_release er",
    )
    .filter_eq("er.label", SqlValue::Text(label.clone()))
    .with_visibility(&policy, None)
    .order_by(&["er.version DESC", "er.release_id DESC"])
    .paginate(1, 0)
    .fetch_all::<ReleaseRow, _>(&pool)
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| ChangelogError::ReleaseNotFound(label.clone()))?;

    let entries = match release.release_type {
        ReleaseType::Partial => {
            ChangelogEntries::Partial(partial_entries(&pool, release.release_id).await?)
        },
        ReleaseType::Integrated => {
            ChangelogEntries::Integrated(integrated_entries(&pool, release.release_id).await?)
        },
    };

    let report = ChangelogReport { label, entries };
    tracing::debug!(rows = report.len(), "Built changelog");
    Ok(report)
}

async fn partial_entries(pool: &PgPool, release_id: i32) -> Result<Vec<PartialEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PartialFlagsRow>(&format!(
        r#"
        SELECT {columns},
               BOOL_OR(dt.name = '{genebuild}') AS geneset,
               BOOL_OR(dt.name = '{variation}') AS variation,
               BOOL_OR(dt.name = '{regulation}') AS regulation
        FROM genome g
        JOIN organism o ON o.organism_id = g.organism_id
        JOIN assembly a ON a.assembly_id = g.assembly_id
        JOIN genome_dataset gd ON gd.genome_id = g.genome_id
        JOIN dataset d ON d.dataset_id = gd.dataset_id
        JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
        WHERE gd.release_id = $1 AND dt.name = ANY($2)
        GROUP BY g.genome_id, o.organism_id, a.assembly_id
        ORDER BY o.scientific_name, a.accession
        "#,
        columns = GENOME_SUMMARY_COLUMNS,
        genebuild = GENEBUILD_TYPE,
        variation = VARIATION_TYPE,
        regulation = REGULATION_TYPE,
    ))
    .bind(release_id)
    .bind(dataset_kinds())
    .fetch_all(pool)
    .await?;

    let genome_ids: Vec<i32> = rows.iter().map(|r| r.genome.genome_id).collect();
    let providers = annotation_providers(pool, &genome_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| PartialEntry {
            annotation_provider: providers.get(&row.genome.genome_id).cloned(),
            geneset_updated: u8::from(row.geneset.unwrap_or(false)),
            variation_updated: u8::from(row.variation.unwrap_or(false)),
            regulation_updated: u8::from(row.regulation.unwrap_or(false)),
            genome: row.genome,
        })
        .collect())
}

async fn integrated_entries(
    pool: &PgPool,
    release_id: i32,
) -> Result<Vec<IntegratedEntry>, sqlx::Error> {
    let previous_id = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT release_id FROM ensembl_release
        WHERE release_type = 'integrated' AND release_id < $1
        ORDER BY release_id DESC
        LIMIT 1
        "#,
    )
    .bind(release_id)
    .fetch_optional(pool)
    .await?;

    let current = snapshot(pool, release_id).await?;
    let previous = match previous_id {
        Some(id) => Some(snapshot(pool, id).await?),
        None => None,
    };
    tracing::debug!(
        current = current.len(),
        previous = previous.as_ref().map(Vec::len),
        "Loaded integrated release snapshots"
    );

    let mut genome_ids: Vec<i32> = current.iter().map(|s| s.genome.genome_id).collect();
    if let Some(previous) = &previous {
        genome_ids.extend(previous.iter().map(|s| s.genome.genome_id));
    }
    let providers = annotation_providers(pool, &genome_ids).await?;

    Ok(diff_integrated(&current, previous.as_deref(), &providers))
}

async fn snapshot(pool: &PgPool, release_id: i32) -> Result<Vec<GenomeSnapshot>, sqlx::Error> {
    let genomes = sqlx::query_as::<_, GenomeSummary>(&format!(
        r#"
        SELECT {}
        FROM genome_release gr
        JOIN genome g ON g.genome_id = gr.genome_id
        JOIN organism o ON o.organism_id = g.organism_id
        JOIN assembly a ON a.assembly_id = g.assembly_id
        WHERE gr.release_id = $1
        ORDER BY o.scientific_name, a.accession
        "#,
        GENOME_SUMMARY_COLUMNS
    ))
    .bind(release_id)
    .fetch_all(pool)
    .await?;

    // Latest partial release (by version) that carried each dataset.
    let labels = sqlx::query_as::<_, DatasetLabelRow>(
        r#"
        SELECT gd.genome_id, dt.name AS dataset_type,
               (SELECT pr.label
                FROM genome_dataset pgd
                JOIN ensembl_release pr ON pr.release_id = pgd.release_id
                WHERE pgd.dataset_id = gd.dataset_id
                  AND pgd.genome_id = gd.genome_id
                  AND pr.release_type = 'partial'
                ORDER BY pr.version DESC
                LIMIT 1) AS partial_label
        FROM genome_dataset gd
        JOIN dataset d ON d.dataset_id = gd.dataset_id
        JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
        WHERE gd.release_id = $1 AND dt.name = ANY($2)
        "#,
    )
    .bind(release_id)
    .bind(dataset_kinds())
    .fetch_all(pool)
    .await?;

    let mut by_genome: BTreeMap<i32, DatasetLabels> = BTreeMap::new();
    for row in labels {
        let entry = by_genome.entry(row.genome_id).or_default();
        let slot = match row.dataset_type.as_str() {
            GENEBUILD_TYPE => &mut entry.geneset,
            VARIATION_TYPE => &mut entry.variation,
            REGULATION_TYPE => &mut entry.regulation,
            _ => continue,
        };
        if slot.is_none() {
            *slot = row.partial_label;
        }
    }

    Ok(genomes
        .into_iter()
        .map(|genome| GenomeSnapshot {
            labels: by_genome.remove(&genome.genome_id).unwrap_or_default(),
            genome,
        })
        .collect())
}

/// Annotation source of each genome's most recently created genebuild dataset.
async fn annotation_providers(
    pool: &PgPool,
    genome_ids: &[i32],
) -> Result<HashMap<i32, String>, sqlx::Error> {
    if genome_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (i32, Option<String>)>(
        r#"
        SELECT DISTINCT ON (gd.genome_id) gd.genome_id, da.value
        FROM genome_dataset gd
        JOIN dataset d ON d.dataset_id = gd.dataset_id
        JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
        LEFT JOIN attribute attr ON attr.name = $2
        LEFT JOIN dataset_attribute da
               ON da.dataset_id = d.dataset_id AND da.attribute_id = attr.attribute_id
        WHERE gd.genome_id = ANY($1) AND dt.name = $3
        ORDER BY gd.genome_id, d.created DESC, d.dataset_id DESC
        "#,
    )
    .bind(genome_ids)
    .bind(ANNOTATION_SOURCE_ATTRIBUTE)
    .bind(GENEBUILD_TYPE)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(genome_id, value)| value.map(|v| (genome_id, v)))
        .collect())
}
