//! FTP metadata index
//!
//! Builds the nested JSON document
//! `species -> assemblies -> genebuild_providers -> <YYYY_MM> -> paths`
//! describing where the public files of every released genome live. All rows
//! are loaded in four bulk queries and grouped in memory.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use gmc_common::naming::{format_accession_path, normalize_species_name};
use regex::Regex;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::ensure_parent_dir;

const ANNOTATION_SOURCE_ATTRIBUTE: &str = "genebuild.annotation_source";
const LAST_GENESET_UPDATE_ATTRIBUTE: &str = "genebuild.last_geneset_update";
const RELEASE_KEY_PATTERN: &str = r"^(\d{4})-(\d{2})";

/// Label used for homology/variation datasets never attached to a labelled release.
pub const UNKNOWN_PARTIAL_RELEASE: &str = "unknown";

#[derive(Debug, thiserror::Error)]
pub enum FtpIndexError {
    #[error("Failed to write FTP index: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode FTP index: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid release key pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Directory layout of one dataset type.
struct PathTemplate {
    dataset_type: &'static str,
    subdir: &'static str,
    /// Nested one level further by partial release label.
    per_partial_release: bool,
    category: &'static str,
    files: &'static [&'static str],
}

const PATH_TEMPLATES: [PathTemplate; 4] = [
    PathTemplate {
        dataset_type: "genebuild",
        subdir: "geneset",
        per_partial_release: false,
        category: "annotations",
        files: &[
            "cdna.fa.bgz",
            "genes.embl.bgz",
            "genes.gff3.bgz",
            "genes.gtf.bgz",
            "pep.fa.bgz",
            "xref.tsv.gz",
        ],
    },
    PathTemplate {
        dataset_type: "assembly",
        subdir: "genome",
        per_partial_release: false,
        category: "genome_sequences",
        files: &[
            "chromosomes.tsv.gz",
            "hardmasked.fa.bgz",
            "softmasked.fa.bgz",
            "unmasked.fa.bgz",
        ],
    },
    PathTemplate {
        dataset_type: "homologies",
        subdir: "homology",
        per_partial_release: true,
        category: "homology_data",
        files: &["homology.txt.gz"],
    },
    PathTemplate {
        dataset_type: "variation",
        subdir: "variation",
        per_partial_release: true,
        category: "variation_data",
        files: &["variation.vcf.bgz"],
    },
];

// ----------------------------------------------------------------------------
// Input rows
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GenomeRecord {
    pub genome_id: i32,
    pub genome_uuid: Uuid,
    pub taxonomy_id: i32,
    pub species_taxonomy_id: Option<i32>,
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub strain: Option<String>,
    pub strain_type: Option<String>,
    pub biosample_id: String,
    pub accession: String,
    pub assembly_name: String,
    pub assembly_level: Option<String>,
}

/// Attributes of the genome's genebuild dataset that place its files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenebuildMetadata {
    pub annotation_source: Option<String>,
    pub last_geneset_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDataset {
    pub dataset_type: String,
    pub partial_label: Option<String>,
}

/// Everything the index needs about one genome.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeExport {
    pub genome: GenomeRecord,
    pub genebuild: Option<GenebuildMetadata>,
    pub datasets: Vec<ExportDataset>,
}

// ----------------------------------------------------------------------------
// Output document
// ----------------------------------------------------------------------------

pub type FileMap = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSet {
    pub files: FileMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DatasetPaths {
    Files(FileSet),
    ByPartialRelease(BTreeMap<String, FileSet>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReleasePaths {
    pub paths: BTreeMap<String, DatasetPaths>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyEntry {
    pub name: String,
    pub level: Option<String>,
    pub genebuild_providers: BTreeMap<String, BTreeMap<String, ReleasePaths>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesEntry {
    pub taxid: i32,
    pub species_taxonomy_id: Option<i32>,
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub strain: Option<String>,
    pub strain_type: Option<String>,
    pub biosample_id: String,
    pub assemblies: BTreeMap<String, AssemblyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FtpIndex {
    pub last_updated: String,
    pub species: BTreeMap<String, SpeciesEntry>,
}

impl FtpIndex {
    /// Pretty-printed JSON.
    pub fn write_json<W: std::io::Write>(&self, out: W) -> Result<(), FtpIndexError> {
        serde_json::to_writer_pretty(out, self)?;
        Ok(())
    }

    /// Write to `path`, creating parent directories.
    pub fn write_to_path(&self, path: &Path) -> Result<(), FtpIndexError> {
        ensure_parent_dir(path)?;
        let file = std::fs::File::create(path)?;
        let mut out = std::io::BufWriter::new(file);
        self.write_json(&mut out)?;
        std::io::Write::flush(&mut out)?;
        tracing::info!(
            species = self.species.len(),
            path = %path.display(),
            "FTP index written"
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Derivation
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
enum SkipReason {
    #[error("missing scientific name")]
    ScientificName,
    #[error("missing genebuild.annotation_source")]
    AnnotationSource,
    #[error("missing genebuild.last_geneset_update")]
    LastGenesetUpdate,
    #[error("malformed genebuild.last_geneset_update '{0}'")]
    MalformedUpdate(String),
    #[error("invalid accession '{0}'")]
    Accession(String),
}

/// Location of a genome's files, derived once per genome.
struct GenomeLocation {
    species_key: String,
    provider: String,
    release_key: String,
    base_path: String,
}

fn locate(export: &GenomeExport, release_pattern: &Regex) -> Result<GenomeLocation, SkipReason> {
    let genome = &export.genome;
    let scientific_name = genome
        .scientific_name
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(SkipReason::ScientificName)?;

    let genebuild = export.genebuild.clone().unwrap_or_default();
    let provider = genebuild
        .annotation_source
        .filter(|s| !s.trim().is_empty())
        .ok_or(SkipReason::AnnotationSource)?
        .to_lowercase();
    let update = genebuild
        .last_geneset_update
        .filter(|s| !s.trim().is_empty())
        .ok_or(SkipReason::LastGenesetUpdate)?;
    let release_key = release_key(release_pattern, &update)
        .ok_or_else(|| SkipReason::MalformedUpdate(update.clone()))?;

    let accession_path = format_accession_path(&genome.accession)
        .map_err(|_| SkipReason::Accession(genome.accession.clone()))?;

    Ok(GenomeLocation {
        species_key: normalize_species_name(scientific_name),
        base_path: format!("{}/{}/{}", accession_path, provider, release_key),
        provider,
        release_key,
    })
}

/// `YYYY_MM` from a `YYYY-MM...` date string.
fn release_key(pattern: &Regex, last_geneset_update: &str) -> Option<String> {
    let captures = pattern.captures(last_geneset_update)?;
    Some(format!("{}_{}", captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

fn file_set(template: &PathTemplate, dir: &str) -> FileSet {
    let files = template
        .files
        .iter()
        .map(|file| (file.to_string(), format!("{}/{}", dir, file)))
        .collect();
    FileSet {
        files: BTreeMap::from([(template.category.to_string(), files)]),
    }
}

fn dataset_paths(location: &GenomeLocation, datasets: &[ExportDataset]) -> BTreeMap<String, DatasetPaths> {
    let mut paths = BTreeMap::new();

    for template in &PATH_TEMPLATES {
        let matching: Vec<&ExportDataset> =
            datasets.iter().filter(|d| d.dataset_type == template.dataset_type).collect();
        if matching.is_empty() {
            continue;
        }

        let dir = format!("{}/{}", location.base_path, template.subdir);
        let entry = if template.per_partial_release {
            let by_label = matching
                .iter()
                .map(|d| d.partial_label.as_deref().unwrap_or(UNKNOWN_PARTIAL_RELEASE))
                .map(|label| (label.to_string(), file_set(template, &format!("{}/{}", dir, label))))
                .collect();
            DatasetPaths::ByPartialRelease(by_label)
        } else {
            DatasetPaths::Files(file_set(template, &dir))
        };
        paths.insert(template.dataset_type.to_string(), entry);
    }

    paths
}

/// Group `genomes` into the index document.
///
/// Genomes whose location cannot be derived are logged and left out.
pub fn build_index(
    genomes: &[GenomeExport],
    last_updated: DateTime<Utc>,
) -> Result<FtpIndex, FtpIndexError> {
    let release_pattern = Regex::new(RELEASE_KEY_PATTERN)?;
    let mut species: BTreeMap<String, SpeciesEntry> = BTreeMap::new();

    for export in genomes {
        let genome = &export.genome;
        let location = match locate(export, &release_pattern) {
            Ok(location) => location,
            Err(reason) => {
                tracing::warn!(genome_uuid = %genome.genome_uuid, %reason, "Skipping genome in FTP index");
                continue;
            },
        };

        let species_entry =
            species.entry(location.species_key.clone()).or_insert_with(|| SpeciesEntry {
                taxid: genome.taxonomy_id,
                species_taxonomy_id: genome.species_taxonomy_id,
                scientific_name: genome.scientific_name.clone(),
                common_name: genome.common_name.clone(),
                strain: genome.strain.clone(),
                strain_type: genome.strain_type.clone(),
                biosample_id: genome.biosample_id.clone(),
                assemblies: BTreeMap::new(),
            });

        let assembly = species_entry
            .assemblies
            .entry(genome.accession.clone())
            .or_insert_with(|| AssemblyEntry {
                name: genome.assembly_name.clone(),
                level: genome.assembly_level.clone(),
                genebuild_providers: BTreeMap::new(),
            });

        let release = assembly
            .genebuild_providers
            .entry(location.provider.clone())
            .or_default()
            .entry(location.release_key.clone())
            .or_default();

        for (dataset_type, paths) in dataset_paths(&location, &export.datasets) {
            let merged = match (release.paths.remove(&dataset_type), paths) {
                (
                    Some(DatasetPaths::ByPartialRelease(mut existing)),
                    DatasetPaths::ByPartialRelease(more),
                ) => {
                    existing.extend(more);
                    DatasetPaths::ByPartialRelease(existing)
                },
                (_, paths) => paths,
            };
            release.paths.insert(dataset_type, merged);
        }
    }

    Ok(FtpIndex {
        last_updated: last_updated.to_rfc3339(),
        species,
    })
}

// ----------------------------------------------------------------------------
// Loading
// ----------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct DatasetRow {
    genome_id: i32,
    dataset_type: String,
    partial_label: Option<String>,
}

#[derive(sqlx::FromRow)]
struct GenebuildRow {
    genome_id: i32,
    annotation_source: Option<String>,
    last_geneset_update: Option<String>,
}

/// Load every genome that has at least one released dataset.
#[tracing::instrument(skip(pool))]
pub async fn load_genome_exports(pool: &PgPool) -> Result<Vec<GenomeExport>, sqlx::Error> {
    let genomes = sqlx::query_as::<_, GenomeRecord>(
        r#"
        SELECT g.genome_id, g.genome_uuid, o.taxonomy_id, o.species_taxonomy_id,
               o.scientific_name, o.common_name, o.strain, o.strain_type, o.biosample_id,
               a.accession, a.name AS assembly_name, a.level AS assembly_level
        FROM genome g
        JOIN organism o ON o.organism_id = g.organism_id
        JOIN assembly a ON a.assembly_id = g.assembly_id
        WHERE EXISTS (
            SELECT 1
            FROM genome_dataset gd
            JOIN dataset d ON d.dataset_id = gd.dataset_id
            WHERE gd.genome_id = g.genome_id AND d.status = 'Released'
        )
        ORDER BY g.genome_uuid
        "#,
    )
    .fetch_all(pool)
    .await?;

    if genomes.is_empty() {
        tracing::warn!("No genomes with released datasets");
        return Ok(Vec::new());
    }
    let genome_ids: Vec<i32> = genomes.iter().map(|g| g.genome_id).collect();

    // Label of a partial release carrying the dataset, else any labelled release.
    let datasets = sqlx::query_as::<_, DatasetRow>(
        r#"
        SELECT DISTINCT ON (gd.genome_id, d.dataset_id)
               gd.genome_id, dt.name AS dataset_type, er.label AS partial_label
        FROM genome_dataset gd
        JOIN dataset d ON d.dataset_id = gd.dataset_id
        JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
        LEFT JOIN genome_dataset lgd ON lgd.dataset_id = d.dataset_id
        LEFT JOIN ensembl_release er
               ON er.release_id = lgd.release_id AND er.label IS NOT NULL
        WHERE gd.genome_id = ANY($1) AND d.status = 'Released'
        ORDER BY gd.genome_id, d.dataset_id,
                 (er.release_type = 'partial') DESC NULLS LAST,
                 er.version DESC NULLS LAST
        "#,
    )
    .bind(&genome_ids)
    .fetch_all(pool)
    .await?;

    let genebuilds = sqlx::query_as::<_, GenebuildRow>(
        r#"
        SELECT gd.genome_id,
               MAX(CASE WHEN attr.name = $2 THEN da.value END) AS annotation_source,
               MAX(CASE WHEN attr.name = $3 THEN da.value END) AS last_geneset_update
        FROM genome_dataset gd
        JOIN dataset d ON d.dataset_id = gd.dataset_id
        JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
        JOIN dataset_attribute da ON da.dataset_id = d.dataset_id
        JOIN attribute attr ON attr.attribute_id = da.attribute_id
        WHERE gd.genome_id = ANY($1)
          AND dt.name = 'genebuild'
          AND attr.name IN ($2, $3)
        GROUP BY gd.genome_id
        "#,
    )
    .bind(&genome_ids)
    .bind(ANNOTATION_SOURCE_ATTRIBUTE)
    .bind(LAST_GENESET_UPDATE_ATTRIBUTE)
    .fetch_all(pool)
    .await?;

    let mut datasets_by_genome: HashMap<i32, Vec<ExportDataset>> = HashMap::new();
    for row in datasets {
        datasets_by_genome.entry(row.genome_id).or_default().push(ExportDataset {
            dataset_type: row.dataset_type,
            partial_label: row.partial_label,
        });
    }

    let mut genebuild_by_genome: HashMap<i32, GenebuildMetadata> = genebuilds
        .into_iter()
        .map(|row| {
            (
                row.genome_id,
                GenebuildMetadata {
                    annotation_source: row.annotation_source,
                    last_geneset_update: row.last_geneset_update,
                },
            )
        })
        .collect();

    tracing::info!(genomes = genomes.len(), "Loaded genome data for FTP index");

    Ok(genomes
        .into_iter()
        .map(|genome| GenomeExport {
            datasets: datasets_by_genome.remove(&genome.genome_id).unwrap_or_default(),
            genebuild: genebuild_by_genome.remove(&genome.genome_id),
            genome,
        })
        .collect())
}

/// Build the FTP index from the current catalog content.
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool) -> Result<FtpIndex, FtpIndexError> {
    let genomes = load_genome_exports(&pool).await?;
    let index = build_index(&genomes, Utc::now())?;
    tracing::info!(species = index.species.len(), "Built FTP index");
    Ok(index)
}
