//! `gmc releases` command implementation

use std::io::Write;

use gmc_server::features::releases::{queries::list, ReleaseFilter, ReleaseVersionFilter};
use tracing::info;

use super::Context;
use crate::error::Result;
use crate::output::{open_output, write_json_line};
use crate::ReleaseArgs;

impl From<ReleaseArgs> for ReleaseFilter {
    fn from(args: ReleaseArgs) -> Self {
        Self {
            release_ids: args.release_id,
            version: ReleaseVersionFilter::from_values(&args.release_version),
            current_only: args.current_only,
            site_names: args.site_name,
            release_types: args.release_type,
            labels: args.label,
            status: args.status,
        }
    }
}

/// List the visible releases as JSON lines
pub async fn run(ctx: &Context, args: ReleaseArgs) -> Result<()> {
    let output = args.output.clone();
    let filter = ReleaseFilter::from(args);
    info!(?filter, "Listing releases");

    let releases = list::handle(ctx.pool.clone(), ctx.policy, filter).await?;

    let mut out = open_output(output.as_deref())?;
    for release in &releases {
        write_json_line(&mut out, release)?;
    }
    out.flush()?;

    Ok(())
}
