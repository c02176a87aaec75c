//! Row lookups shared by the dataset commands

use gmc_common::DatasetStatus;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DatasetRow {
    pub dataset_id: i32,
    pub dataset_uuid: Uuid,
    pub name: String,
    pub status: DatasetStatus,
    pub dataset_type_id: i32,
    pub dataset_source_id: i32,
    pub depends_on: Option<String>,
}

pub async fn dataset_by_uuid(
    conn: &mut PgConnection,
    dataset_uuid: Uuid,
) -> sqlx::Result<Option<DatasetRow>> {
    sqlx::query_as(
        r#"
        SELECT d.dataset_id, d.dataset_uuid, d.name, d.status, d.dataset_type_id,
               d.dataset_source_id, dt.depends_on
        FROM dataset d
        JOIN dataset_type dt ON dt.dataset_type_id = d.dataset_type_id
        WHERE d.dataset_uuid = $1
        "#,
    )
    .bind(dataset_uuid)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn attribute_id(conn: &mut PgConnection, name: &str) -> sqlx::Result<Option<i32>> {
    sqlx::query_scalar("SELECT attribute_id FROM attribute WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
}

/// Set an attribute value, replacing any earlier value on the same dataset.
pub async fn upsert_attribute(
    conn: &mut PgConnection,
    dataset_id: i32,
    attribute_id: i32,
    value: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dataset_attribute (value, attribute_id, dataset_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (dataset_id, attribute_id) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(value)
    .bind(attribute_id)
    .bind(dataset_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Link a dataset to a genome as the current dataset of its type.
///
/// Any previously current link for the same genome and dataset type is
/// demoted first; the demoted dataset UUIDs are returned.
pub async fn link_as_current(
    conn: &mut PgConnection,
    genome_id: i32,
    dataset_id: i32,
    dataset_type_id: i32,
    release_id: Option<i32>,
) -> sqlx::Result<Vec<Uuid>> {
    let demoted: Vec<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE genome_dataset gd
        SET is_current = FALSE
        FROM dataset d
        WHERE d.dataset_id = gd.dataset_id
          AND gd.genome_id = $1
          AND d.dataset_type_id = $2
          AND gd.is_current
        RETURNING d.dataset_uuid
        "#,
    )
    .bind(genome_id)
    .bind(dataset_type_id)
    .fetch_all(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO genome_dataset (dataset_id, genome_id, release_id, is_current)
        VALUES ($1, $2, $3, TRUE)
        "#,
    )
    .bind(dataset_id)
    .bind(genome_id)
    .bind(release_id)
    .execute(&mut *conn)
    .await?;

    Ok(demoted)
}
