//! Genome/dataset filter engine against a seeded catalog

use futures::TryStreamExt;
use gmc_common::{DatasetStatus, ReleaseStatus};
use gmc_server::features::datasets::queries::by_status_and_type;
use gmc_server::features::genomes::{fetch_genomes, queries, FetchGenomesError, GenomeFilters};
use gmc_server::{LifecycleError, VisibilityPolicy};
use sqlx::PgPool;
use uuid::Uuid;

mod helpers;
use helpers::*;

struct Catalog {
    site: i32,
    release: i32,
    human: GenomeIds,
    mouse: GenomeIds,
    human_assembly: DatasetIds,
    mouse_assembly: DatasetIds,
    plant_assembly: DatasetIds,
}

/// Two released vertebrate assemblies plus a submitted plant assembly that is
/// not attached to any release.
async fn seed(pool: &PgPool) -> sqlx::Result<Catalog> {
    let site = create_site(pool, "main").await?;
    let release = ReleaseFixture::partial(1.0, "2023-01")
        .with_site(site)
        .create(pool)
        .await?;

    let human = GenomeFixture::new("homo_sapiens")
        .in_division("EnsemblVertebrates")
        .create(pool)
        .await?;
    let mouse = GenomeFixture::new("mus_musculus")
        .in_division("EnsemblVertebrates")
        .create(pool)
        .await?;
    let plant = GenomeFixture::new("arabidopsis_thaliana")
        .in_division("EnsemblPlants")
        .create(pool)
        .await?;
    for genome in [&human, &mouse] {
        add_genome_to_release(pool, genome.genome_id, release).await?;
    }

    let assembly = DatasetTypeFixture::new("assembly").create(pool).await?;
    let source = create_source(pool, "core_dbs").await?;

    let human_assembly = DatasetFixture::new(assembly, source)
        .with_status(DatasetStatus::Released)
        .for_genome(human.genome_id, Some(release))
        .create(pool)
        .await?;
    let mouse_assembly = DatasetFixture::new(assembly, source)
        .with_status(DatasetStatus::Released)
        .for_genome(mouse.genome_id, Some(release))
        .create(pool)
        .await?;
    let plant_assembly = DatasetFixture::new(assembly, source)
        .for_genome(plant.genome_id, None)
        .create(pool)
        .await?;

    Ok(Catalog {
        site,
        release,
        human,
        mouse,
        human_assembly,
        mouse_assembly,
        plant_assembly,
    })
}

fn released() -> GenomeFilters {
    GenomeFilters {
        dataset_status: vec![DatasetStatus::Released],
        ..Default::default()
    }
}

fn species(rows: &[gmc_server::features::genomes::GenomeDatasetRow]) -> Vec<&str> {
    let mut names: Vec<&str> = rows.iter().map(|r| r.species.as_str()).collect();
    names.sort_unstable();
    names
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_strict_policy_hides_unreleased(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;
    let policy = VisibilityPolicy::released_only(catalog.site);

    let rows = queries::fetch::handle(pool.clone(), policy, released()).await.unwrap();
    assert_eq!(species(&rows), vec!["homo_sapiens", "mus_musculus"]);
    assert!(rows.iter().all(|r| r.dataset_type == "assembly" && r.dataset_source == "core_dbs"));

    // Submitted datasets never show without unreleased access
    let rows = queries::fetch::handle(pool, policy, GenomeFilters::default()).await.unwrap();
    assert!(rows.is_empty());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_permissive_policy_includes_unattached_datasets(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;

    let rows = queries::fetch::handle(
        pool,
        VisibilityPolicy::allow_unreleased(catalog.site),
        GenomeFilters::default(),
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].species, "arabidopsis_thaliana");
    assert_eq!(rows[0].dataset_uuid, catalog.plant_assembly.dataset_uuid);
    assert_eq!(rows[0].dataset_status, DatasetStatus::Submitted);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_species_and_antispecies(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;
    let policy = VisibilityPolicy::released_only(catalog.site);

    let only = GenomeFilters {
        species: vec!["mus_musculus".to_string()],
        ..released()
    };
    let rows = queries::fetch::handle(pool.clone(), policy, only).await.unwrap();
    assert_eq!(species(&rows), vec!["mus_musculus"]);

    // A species that is also denied falls back to excluding the denied list
    let denied = GenomeFilters {
        species: vec!["mus_musculus".to_string()],
        antispecies: vec!["mus_musculus".to_string()],
        ..released()
    };
    let rows = queries::fetch::handle(pool, policy, denied).await.unwrap();
    assert_eq!(species(&rows), vec!["homo_sapiens"]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_division_shorthand(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;
    let policy = VisibilityPolicy::allow_unreleased(catalog.site);

    let filters = GenomeFilters {
        organism_group_type: Some("DIVISION".to_string()),
        division: vec!["plants".to_string()],
        dataset_status: Vec::new(),
        ..Default::default()
    };
    let rows = queries::fetch::handle(pool.clone(), policy, filters).await.unwrap();
    assert_eq!(species(&rows), vec!["arabidopsis_thaliana"]);

    let filters = GenomeFilters {
        organism_group_type: Some("DIVISION".to_string()),
        division: vec!["vertebrates".to_string()],
        dataset_status: Vec::new(),
        ..Default::default()
    };
    let rows = queries::fetch::handle(pool, policy, filters).await.unwrap();
    assert_eq!(species(&rows), vec!["homo_sapiens", "mus_musculus"]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_genome_and_release_filters(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;
    let policy = VisibilityPolicy::allow_unreleased(catalog.site);

    let by_genome = GenomeFilters {
        genome_uuid: vec![catalog.human.genome_uuid],
        ..released()
    };
    let rows = queries::fetch::handle(pool.clone(), policy, by_genome).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dataset_uuid, catalog.human_assembly.dataset_uuid);

    let by_release = GenomeFilters {
        release_id: Some(catalog.release),
        dataset_status: Vec::new(),
        ..Default::default()
    };
    let rows = queries::fetch::handle(pool, policy, by_release).await.unwrap();
    assert_eq!(species(&rows), vec!["homo_sapiens", "mus_musculus"]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_pagination_walks_ordered_pages(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;
    let policy = VisibilityPolicy::released_only(catalog.site);

    let all = queries::fetch::handle(pool.clone(), policy, released()).await.unwrap();
    assert_eq!(all.len(), 2);

    let mut paged = Vec::new();
    for page in 1..=3 {
        let filters = GenomeFilters {
            batch_size: 1,
            page,
            ..released()
        };
        let rows: Vec<_> = fetch_genomes(pool.clone(), policy, filters).try_collect().await.unwrap();
        paged.extend(rows);
    }

    assert_eq!(paged, all);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_dataset_status_while_streaming(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;
    create_attribute(&pool, "assembly.checked").await?;

    let mut filters = GenomeFilters {
        update_dataset_status: Some(DatasetStatus::Processing),
        ..Default::default()
    };
    filters
        .update_dataset_attribute
        .insert("assembly.checked".to_string(), "yes".to_string());

    let rows = queries::fetch::handle(
        pool.clone(),
        VisibilityPolicy::allow_unreleased(catalog.site),
        filters,
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dataset_status, DatasetStatus::Submitted);
    assert_eq!(rows[0].updated_dataset_status, Some(DatasetStatus::Processing));
    assert_eq!(
        dataset_status(&pool, catalog.plant_assembly.dataset_uuid).await?,
        DatasetStatus::Processing
    );

    let value: String = sqlx::query_scalar(
        "SELECT value FROM dataset_attribute WHERE dataset_id = $1",
    )
    .bind(catalog.plant_assembly.dataset_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(value, "yes");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_rejects_regression(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;

    let filters = GenomeFilters {
        genome_uuid: vec![catalog.mouse.genome_uuid],
        update_dataset_status: Some(DatasetStatus::Processing),
        ..released()
    };
    let result = queries::fetch::handle(
        pool.clone(),
        VisibilityPolicy::released_only(catalog.site),
        filters,
    )
    .await;

    assert!(matches!(
        result,
        Err(FetchGenomesError::Lifecycle(LifecycleError::Regression { .. }))
    ));
    assert_eq!(
        dataset_status(&pool, catalog.mouse_assembly.dataset_uuid).await?,
        DatasetStatus::Released
    );
    Ok(())
}

async fn pin_genome_uuid(pool: &PgPool, genome_id: i32, uuid: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE genome SET genome_uuid = $1 WHERE genome_id = $2")
        .bind(uuid)
        .bind(genome_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_failed_bulk_update_rolls_back_whole_page(pool: PgPool) -> sqlx::Result<()> {
    let site = create_site(&pool, "main").await?;
    let human = GenomeFixture::new("homo_sapiens")
        .in_division("EnsemblVertebrates")
        .create(&pool)
        .await?;
    let mouse = GenomeFixture::new("mus_musculus")
        .in_division("EnsemblVertebrates")
        .create(&pool)
        .await?;
    // Rows come back ordered by genome UUID: human first
    pin_genome_uuid(&pool, human.genome_id, Uuid::from_u128(1)).await?;
    pin_genome_uuid(&pool, mouse.genome_id, Uuid::from_u128(2)).await?;

    let assembly = DatasetTypeFixture::new("assembly").create(&pool).await?;
    let xrefs = DatasetTypeFixture::new("xrefs").create(&pool).await?;
    let source = create_source(&pool, "core_dbs").await?;

    let human_assembly = DatasetFixture::new(assembly, source)
        .for_genome(human.genome_id, None)
        .create(&pool)
        .await?;
    let mouse_assembly = DatasetFixture::new(assembly, source)
        .for_genome(mouse.genome_id, None)
        .create(&pool)
        .await?;
    DatasetFixture::new(xrefs, source)
        .with_parent(mouse_assembly.dataset_id)
        .for_genome(mouse.genome_id, None)
        .create(&pool)
        .await?;

    let filters = GenomeFilters {
        update_dataset_status: Some(DatasetStatus::Processed),
        ..Default::default()
    };
    let result = queries::fetch::handle(pool.clone(), VisibilityPolicy::allow_unreleased(site), filters).await;

    assert!(matches!(
        result,
        Err(FetchGenomesError::Lifecycle(LifecycleError::DescendantsIncomplete { .. }))
    ));
    assert_eq!(
        dataset_status(&pool, human_assembly.dataset_uuid).await?,
        DatasetStatus::Submitted
    );
    assert_eq!(
        dataset_status(&pool, mouse_assembly.dataset_uuid).await?,
        DatasetStatus::Submitted
    );
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_status_lookup_respects_release_visibility(pool: PgPool) -> sqlx::Result<()> {
    let site = create_site(&pool, "main").await?;
    let other_site = create_site(&pool, "rapid").await?;
    let preparing = ReleaseFixture::partial(1.0, "2023-01")
        .with_site(site)
        .with_status(ReleaseStatus::Preparing)
        .create(&pool)
        .await?;
    let elsewhere = ReleaseFixture::partial(2.0, "2023-02")
        .with_site(other_site)
        .create(&pool)
        .await?;
    let visible = ReleaseFixture::partial(3.0, "2023-03")
        .with_site(site)
        .create(&pool)
        .await?;

    let assembly = DatasetTypeFixture::new("assembly").create(&pool).await?;
    let source = create_source(&pool, "core_dbs").await?;

    let mut released_uuids = Vec::new();
    for (name, release) in [
        ("homo_sapiens", Some(preparing)),
        ("mus_musculus", Some(elsewhere)),
        ("danio_rerio", None),
        ("gallus_gallus", Some(visible)),
    ] {
        let genome = GenomeFixture::new(name)
            .in_division("EnsemblVertebrates")
            .create(&pool)
            .await?;
        let dataset = DatasetFixture::new(assembly, source)
            .with_status(DatasetStatus::Released)
            .for_genome(genome.genome_id, release)
            .create(&pool)
            .await?;
        released_uuids.push(dataset.dataset_uuid);
    }

    let strict = VisibilityPolicy::released_only(site);
    let rows = by_status_and_type::handle(
        pool.clone(),
        strict,
        DatasetStatus::Released,
        "assembly".to_string(),
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].production_name, "gallus_gallus");
    assert_eq!(rows[0].dataset_uuid, released_uuids[3]);

    let rows = queries::fetch::handle(pool.clone(), strict, released()).await.unwrap();
    assert_eq!(species(&rows), vec!["gallus_gallus"]);

    let rows = by_status_and_type::handle(
        pool,
        VisibilityPolicy::allow_unreleased(site),
        DatasetStatus::Released,
        "assembly".to_string(),
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 4);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_hidden_release_hides_its_datasets(pool: PgPool) -> sqlx::Result<()> {
    let catalog = seed(&pool).await?;
    sqlx::query("UPDATE ensembl_release SET status = $1 WHERE release_id = $2")
        .bind(ReleaseStatus::Preparing)
        .bind(catalog.release)
        .execute(&pool)
        .await?;

    let rows = queries::fetch::handle(
        pool.clone(),
        VisibilityPolicy::released_only(catalog.site),
        released(),
    )
    .await
    .unwrap();
    assert!(rows.is_empty());

    let rows = queries::fetch::handle(pool, VisibilityPolicy::allow_unreleased(catalog.site), released())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    Ok(())
}
