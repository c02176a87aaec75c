//! `gmc ftp-index` command implementation

use std::path::PathBuf;

use colored::Colorize;
use gmc_server::features::exports::ftp_index;

use super::Context;
use crate::error::Result;
use crate::progress::create_spinner;

/// Write the FTP index JSON to `output`, or stdout
pub async fn run(ctx: &Context, output: Option<PathBuf>) -> Result<()> {
    let spinner = create_spinner("Building FTP index");
    let index = ftp_index::handle(ctx.pool.clone())
        .await
        .inspect_err(|_| spinner.abandon())?;
    spinner.finish_and_clear();

    match output {
        Some(path) => {
            index.write_to_path(&path)?;
            eprintln!(
                "{} {} species written to {}",
                "✓".green(),
                index.species.len(),
                path.display().to_string().cyan()
            );
        },
        None => index.write_json(std::io::stdout().lock())?,
    }
    Ok(())
}
