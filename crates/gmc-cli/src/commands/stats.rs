//! `gmc stats` command implementation

use std::path::PathBuf;

use colored::Colorize;
use gmc_server::features::exports::stats;

use super::Context;
use crate::error::Result;
use crate::progress::create_spinner;

/// Write the partial and integrated statistics CSVs into `output_dir`
pub async fn run(ctx: &Context, output_dir: PathBuf) -> Result<()> {
    let spinner = create_spinner("Computing release statistics");
    let report = stats::handle(ctx.pool.clone(), ctx.policy)
        .await
        .inspect_err(|_| spinner.abandon())?;
    spinner.finish_and_clear();

    let (partial, integrated) = report.write_to_dir(&output_dir)?;
    eprintln!("{} {}", "✓".green(), partial.display());
    eprintln!("{} {}", "✓".green(), integrated.display());
    Ok(())
}
