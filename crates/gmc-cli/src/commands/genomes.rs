//! `gmc genomes` command implementation
//!
//! Streams the matching (genome, dataset) rows as JSON lines, optionally moving
//! each matched dataset to a new status on the way.

use std::io::Write;
use std::pin::pin;

use colored::Colorize;
use futures::TryStreamExt;
use gmc_server::features::genomes::{fetch_genomes, GenomeFilters};
use tracing::info;

use super::Context;
use crate::error::Result;
use crate::output::{open_output, write_json_line};
use crate::progress::create_row_counter;
use crate::GenomeArgs;

impl From<GenomeArgs> for GenomeFilters {
    fn from(args: GenomeArgs) -> Self {
        Self {
            genome_uuid: args.genome_uuid,
            dataset_uuid: args.dataset_uuid,
            division: args.division,
            species: args.species,
            antispecies: args.antispecies,
            dataset_type: args.dataset_type,
            dataset_status: args.dataset_status,
            organism_group_type: args.organism_group_type,
            release_id: args.release_id,
            batch_size: args.batch_size,
            page: args.page,
            run_all: args.run_all,
            update_dataset_status: args.update_dataset_status,
            update_dataset_attribute: args.update_dataset_attribute.into_iter().collect(),
        }
    }
}

/// Run the genome filter and write the rows
pub async fn run(ctx: &Context, args: GenomeArgs) -> Result<()> {
    let output = args.output.clone();
    let filters = GenomeFilters::from(args);
    let updating = filters.update_dataset_status;
    info!(?filters, "Querying genomes");

    let mut out = open_output(output.as_deref())?;
    let progress = create_row_counter("Querying genomes");

    let mut rows = pin!(fetch_genomes(ctx.pool.clone(), ctx.policy, filters));
    let mut count = 0u64;
    while let Some(row) = rows.try_next().await.inspect_err(|_| progress.abandon())? {
        write_json_line(&mut out, &row)?;
        count += 1;
        progress.inc(1);
    }
    out.flush()?;
    progress.finish_and_clear();

    let summary = match updating {
        Some(status) => format!("{} datasets moved to {}", count, status),
        None => format!("{} rows", count),
    };
    eprintln!("{} {}", "✓".green(), summary);
    Ok(())
}
