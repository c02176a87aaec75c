//! `gmc changelog` command implementation

use std::path::PathBuf;

use colored::Colorize;
use gmc_server::features::exports::changelog::{self, default_output_path};

use super::Context;
use crate::error::Result;
use crate::progress::create_spinner;

/// Write the changelog CSV of the release labelled `label`
pub async fn run(ctx: &Context, label: String, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| default_output_path(&label));

    let spinner = create_spinner(&format!("Building changelog for {}", label));
    let report = changelog::handle(ctx.pool.clone(), ctx.policy, label)
        .await
        .inspect_err(|_| spinner.abandon())?;
    spinner.finish_and_clear();

    report.write_to_path(&path)?;
    eprintln!(
        "{} {} rows written to {}",
        "✓".green(),
        report.len(),
        path.display().to_string().cyan()
    );
    Ok(())
}
