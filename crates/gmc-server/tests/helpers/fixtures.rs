//! Test fixtures and data builders for GMC server tests
//!
//! Builders insert the minimum rows a catalog test needs and return the
//! generated ids.

use chrono::NaiveDate;
use gmc_common::{DatasetStatus, ReleaseStatus, ReleaseType};
use sqlx::PgPool;
use uuid::Uuid;

fn unique_digits(width: usize) -> String {
    let n = Uuid::new_v4().as_u128() % 10u128.pow(width as u32);
    format!("{:0width$}", n, width = width)
}

// ============================================================================
// Sites and releases
// ============================================================================

pub async fn create_site(pool: &PgPool, name: &str) -> sqlx::Result<i32> {
    sqlx::query_scalar(
        "INSERT INTO ensembl_site (name, label, uri) VALUES ($1, $1, $2) RETURNING site_id",
    )
    .bind(name)
    .bind(format!("https://{}.example.org", name))
    .fetch_one(pool)
    .await
}

/// Builder for `ensembl_release` rows
#[derive(Debug, Clone)]
pub struct ReleaseFixture {
    version: f64,
    label: Option<String>,
    release_type: ReleaseType,
    status: ReleaseStatus,
    is_current: bool,
    site_id: Option<i32>,
    release_date: Option<NaiveDate>,
}

impl ReleaseFixture {
    pub fn partial(version: f64, label: impl Into<String>) -> Self {
        Self {
            version,
            label: Some(label.into()),
            release_type: ReleaseType::Partial,
            status: ReleaseStatus::Released,
            is_current: false,
            site_id: None,
            release_date: None,
        }
    }

    pub fn integrated(version: f64, label: impl Into<String>) -> Self {
        Self {
            release_type: ReleaseType::Integrated,
            ..Self::partial(version, label)
        }
    }

    pub fn with_status(mut self, status: ReleaseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_site(mut self, site_id: i32) -> Self {
        self.site_id = Some(site_id);
        self
    }

    pub fn current(mut self) -> Self {
        self.is_current = true;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<i32> {
        sqlx::query_scalar(
            r#"
            INSERT INTO ensembl_release
                (version, release_date, label, is_current, release_type, status, site_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING release_id
            "#,
        )
        .bind(self.version)
        .bind(self.release_date)
        .bind(self.label)
        .bind(self.is_current)
        .bind(self.release_type)
        .bind(self.status)
        .bind(self.site_id)
        .fetch_one(pool)
        .await
    }
}

// ============================================================================
// Genomes
// ============================================================================

/// Ids of a genome and the organism/assembly rows created with it.
#[derive(Debug, Clone, Copy)]
pub struct GenomeIds {
    pub genome_id: i32,
    pub genome_uuid: Uuid,
    pub organism_id: i32,
    pub assembly_id: i32,
}

/// Builder for a genome with its own organism and assembly
#[derive(Debug, Clone)]
pub struct GenomeFixture {
    production_name: String,
    scientific_name: String,
    common_name: Option<String>,
    accession: Option<String>,
    assembly_name: String,
    groups: Vec<(String, String)>,
    assembly_id: Option<i32>,
}

impl GenomeFixture {
    pub fn new(production_name: impl Into<String>) -> Self {
        let production_name = production_name.into();
        let scientific_name = production_name.replace('_', " ");
        Self {
            production_name,
            scientific_name,
            common_name: None,
            accession: None,
            assembly_name: "asm1".to_string(),
            groups: Vec::new(),
            assembly_id: None,
        }
    }

    pub fn with_scientific_name(mut self, name: impl Into<String>) -> Self {
        self.scientific_name = name.into();
        self
    }

    pub fn with_common_name(mut self, name: impl Into<String>) -> Self {
        self.common_name = Some(name.into());
        self
    }

    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.accession = Some(accession.into());
        self
    }

    /// Reuse an existing assembly instead of creating one.
    pub fn with_assembly(mut self, assembly_id: i32) -> Self {
        self.assembly_id = Some(assembly_id);
        self
    }

    /// Add the organism to a `DIVISION` group.
    pub fn in_division(self, division: impl Into<String>) -> Self {
        self.in_group("DIVISION", division)
    }

    pub fn in_group(mut self, group_type: impl Into<String>, name: impl Into<String>) -> Self {
        self.groups.push((group_type.into(), name.into()));
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<GenomeIds> {
        let organism_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO organism
                (organism_uuid, taxonomy_id, species_taxonomy_id, common_name,
                 scientific_name, biosample_id)
            VALUES ($1, 9606, 9606, $2, $3, $4)
            RETURNING organism_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&self.common_name)
        .bind(&self.scientific_name)
        .bind(format!("SAMN{}", unique_digits(12)))
        .fetch_one(pool)
        .await?;

        let assembly_id = match self.assembly_id {
            Some(id) => id,
            None => {
                let accession = self
                    .accession
                    .clone()
                    .unwrap_or_else(|| format!("GCA_{}.1", unique_digits(9)));
                sqlx::query_scalar(
                    r#"
                    INSERT INTO assembly (assembly_uuid, accession, name, level)
                    VALUES ($1, $2, $3, 'chromosome')
                    RETURNING assembly_id
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(accession)
                .bind(&self.assembly_name)
                .fetch_one(pool)
                .await?
            },
        };

        let genome_uuid = Uuid::new_v4();
        let genome_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO genome (genome_uuid, assembly_id, organism_id, production_name)
            VALUES ($1, $2, $3, $4)
            RETURNING genome_id
            "#,
        )
        .bind(genome_uuid)
        .bind(assembly_id)
        .bind(organism_id)
        .bind(&self.production_name)
        .fetch_one(pool)
        .await?;

        for (group_type, name) in &self.groups {
            let group_id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO organism_group (type, name) VALUES ($1, $2)
                ON CONFLICT (type, name) DO UPDATE SET name = EXCLUDED.name
                RETURNING organism_group_id
                "#,
            )
            .bind(group_type)
            .bind(name)
            .fetch_one(pool)
            .await?;

            sqlx::query(
                "INSERT INTO organism_group_member (organism_id, organism_group_id) VALUES ($1, $2)",
            )
            .bind(organism_id)
            .bind(group_id)
            .execute(pool)
            .await?;
        }

        Ok(GenomeIds {
            genome_id,
            genome_uuid,
            organism_id,
            assembly_id,
        })
    }
}

pub async fn add_genome_to_release(pool: &PgPool, genome_id: i32, release_id: i32) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO genome_release (genome_id, release_id) VALUES ($1, $2)")
        .bind(genome_id)
        .bind(release_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Dataset types, sources and attributes
// ============================================================================

/// Builder for `dataset_type` rows
#[derive(Debug, Clone)]
pub struct DatasetTypeFixture {
    name: String,
    topic: String,
    parent_id: Option<i32>,
    depends_on: Option<String>,
}

impl DatasetTypeFixture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: "production".to_string(),
            parent_id: None,
            depends_on: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_parent(mut self, parent_id: i32) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn depends_on(mut self, names: impl Into<String>) -> Self {
        self.depends_on = Some(names.into());
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<i32> {
        sqlx::query_scalar(
            r#"
            INSERT INTO dataset_type (name, label, topic, parent_id, depends_on)
            VALUES ($1, $1, $2, $3, $4)
            RETURNING dataset_type_id
            "#,
        )
        .bind(&self.name)
        .bind(&self.topic)
        .bind(self.parent_id)
        .bind(&self.depends_on)
        .fetch_one(pool)
        .await
    }
}

pub async fn create_source(pool: &PgPool, name: &str) -> sqlx::Result<i32> {
    sqlx::query_scalar(
        "INSERT INTO dataset_source (type, name) VALUES ('core', $1) RETURNING dataset_source_id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
}

pub async fn create_attribute(pool: &PgPool, name: &str) -> sqlx::Result<i32> {
    sqlx::query_scalar("INSERT INTO attribute (name, label) VALUES ($1, $1) RETURNING attribute_id")
        .bind(name)
        .fetch_one(pool)
        .await
}

pub async fn set_attribute(
    pool: &PgPool,
    dataset_id: i32,
    attribute_id: i32,
    value: &str,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO dataset_attribute (value, attribute_id, dataset_id) VALUES ($1, $2, $3)")
        .bind(value)
        .bind(attribute_id)
        .bind(dataset_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Datasets
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct DatasetIds {
    pub dataset_id: i32,
    pub dataset_uuid: Uuid,
}

/// Builder for a dataset, optionally linked to a genome
#[derive(Debug, Clone)]
pub struct DatasetFixture {
    dataset_type_id: i32,
    source_id: i32,
    name: String,
    status: DatasetStatus,
    parent_id: Option<i32>,
    genome: Option<(i32, Option<i32>)>,
}

impl DatasetFixture {
    pub fn new(dataset_type_id: i32, source_id: i32) -> Self {
        Self {
            dataset_type_id,
            source_id,
            name: "dataset".to_string(),
            status: DatasetStatus::Submitted,
            parent_id: None,
            genome: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: DatasetStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_parent(mut self, parent_id: i32) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Link to `genome_id` as the current dataset, attached to `release_id`.
    pub fn for_genome(mut self, genome_id: i32, release_id: Option<i32>) -> Self {
        self.genome = Some((genome_id, release_id));
        self
    }

    pub async fn create(self, pool: &PgPool) -> sqlx::Result<DatasetIds> {
        let dataset_uuid = Uuid::new_v4();
        let dataset_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO dataset
                (dataset_uuid, dataset_type_id, name, dataset_source_id, label, status, parent_id)
            VALUES ($1, $2, $3, $4, $3, $5, $6)
            RETURNING dataset_id
            "#,
        )
        .bind(dataset_uuid)
        .bind(self.dataset_type_id)
        .bind(&self.name)
        .bind(self.source_id)
        .bind(self.status)
        .bind(self.parent_id)
        .fetch_one(pool)
        .await?;

        if let Some((genome_id, release_id)) = self.genome {
            link_dataset(pool, genome_id, dataset_id, release_id).await?;
        }

        Ok(DatasetIds {
            dataset_id,
            dataset_uuid,
        })
    }
}

/// Add a current genome_dataset row.
pub async fn link_dataset(
    pool: &PgPool,
    genome_id: i32,
    dataset_id: i32,
    release_id: Option<i32>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO genome_dataset (dataset_id, genome_id, release_id, is_current)
        VALUES ($1, $2, $3, TRUE)
        "#,
    )
    .bind(dataset_id)
    .bind(genome_id)
    .bind(release_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn dataset_status(pool: &PgPool, dataset_uuid: Uuid) -> sqlx::Result<DatasetStatus> {
    sqlx::query_scalar("SELECT status FROM dataset WHERE dataset_uuid = $1")
        .bind(dataset_uuid)
        .fetch_one(pool)
        .await
}
