//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function taking the
//! connected [`Context`].

pub mod changelog;
pub mod dataset;
pub mod ftp_index;
pub mod genomes;
pub mod releases;
pub mod stats;

use gmc_server::db::{create_pool, DbConfig};
use gmc_server::VisibilityPolicy;
use sqlx::PgPool;
use tracing::debug;

use crate::error::{CliError, Result};
use crate::{Cli, Commands, GlobalArgs};

/// Database pool and visibility policy shared by every command
#[derive(Clone)]
pub struct Context {
    pub pool: PgPool,
    pub policy: VisibilityPolicy,
}

impl Context {
    /// Connect to the catalog named by `--database-url` / `DATABASE_URL`.
    pub async fn connect(global: &GlobalArgs) -> Result<Self> {
        let url = global
            .database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CliError::config("DATABASE_URL not set"))?;

        let pool = create_pool(&DbConfig::with_url(url)).await?;
        let policy = policy_from_args(global);
        debug!(
            allow_unreleased = policy.allow_unreleased,
            site_id = policy.current_site_id,
            "Connected to catalog"
        );

        Ok(Self { pool, policy })
    }
}

/// Visibility policy selected by the global flags.
pub fn policy_from_args(global: &GlobalArgs) -> VisibilityPolicy {
    if global.allow_unreleased {
        VisibilityPolicy::allow_unreleased(global.site_id)
    } else {
        VisibilityPolicy::released_only(global.site_id)
    }
}

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::connect(&cli.global).await?;

    match cli.command {
        Commands::Genomes(args) => genomes::run(&ctx, args).await,
        Commands::Dataset { command } => dataset::run(&ctx, command).await,
        Commands::Releases(args) => releases::run(&ctx, args).await,
        Commands::Changelog { label, output } => changelog::run(&ctx, label, output).await,
        Commands::Stats { output_dir } => stats::run(&ctx, output_dir).await,
        Commands::FtpIndex { output } => ftp_index::run(&ctx, output).await,
    }
}
