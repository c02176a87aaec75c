//! GMC CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line interface over the genome metadata catalog.
//!
//! # Overview
//!
//! - **Genome queries**: run the genome/dataset filter engine (`gmc genomes`)
//! - **Dataset lifecycle**: advance statuses and derive children (`gmc dataset`)
//! - **Releases**: list visible releases (`gmc releases`)
//! - **Reports**: changelog CSV, statistics CSVs and the FTP index JSON
//!   (`gmc changelog`, `gmc stats`, `gmc ftp-index`)
//!
//! Rows are written as one JSON object per line to stdout or `--output`; logs
//! go to stderr.

pub mod commands;
pub mod error;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use error::{CliError, Result};

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use gmc_common::{DatasetStatus, ReleaseStatus, ReleaseType};
use uuid::Uuid;

/// GMC - Genome Metadata Catalog
#[derive(Parser, Debug)]
#[command(name = "gmc")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Connection and visibility options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// PostgreSQL connection string of the catalog
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Show unreleased releases and datasets
    #[arg(long, env = "ALLOW_UNRELEASED", global = true, action = ArgAction::SetTrue, value_parser = parse_flag)]
    pub allow_unreleased: bool,

    /// Site whose releases are visible
    #[arg(long, env = "ENSEMBL_SITE", global = true, default_value_t = gmc_server::visibility::DEFAULT_SITE_ID)]
    pub site_id: i32,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query genomes and their datasets
    Genomes(GenomeArgs),

    /// Dataset lifecycle operations
    Dataset {
        #[command(subcommand)]
        command: DatasetCommand,
    },

    /// List visible releases
    Releases(ReleaseArgs),

    /// Write the changelog CSV of a release
    Changelog {
        /// Release label
        label: String,

        /// Output file (defaults to <label>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write per-release statistics CSVs
    Stats {
        /// Directory for stats.partial.csv and stats.integrated.csv
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Write the FTP index JSON
    FtpIndex {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Dataset subcommands
#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    /// Move a dataset to a new status
    Status {
        /// Dataset UUID
        dataset_uuid: Uuid,

        /// Submitted, Processing, Processed or Released
        status: DatasetStatus,
    },

    /// Create the missing child datasets of a dataset
    Children {
        /// Parent dataset UUID
        dataset_uuid: Uuid,

        /// Only create children of this topic
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Show the parent of a dataset
    Parent {
        /// Dataset UUID
        dataset_uuid: Uuid,
    },
}

/// Genome filter flags
#[derive(Args, Debug, Clone)]
pub struct GenomeArgs {
    /// Genome UUIDs to include
    #[arg(long, num_args = 1..)]
    pub genome_uuid: Vec<Uuid>,

    /// Dataset UUIDs to include
    #[arg(long, num_args = 1..)]
    pub dataset_uuid: Vec<Uuid>,

    /// Organism group names (divisions such as "vertebrates" with --organism-group-type DIVISION)
    #[arg(long, num_args = 1..)]
    pub division: Vec<String>,

    /// Production names to include
    #[arg(long, num_args = 1..)]
    pub species: Vec<String>,

    /// Production names to exclude
    #[arg(long, num_args = 1..)]
    pub antispecies: Vec<String>,

    /// Dataset type name
    #[arg(long, default_value = gmc_server::features::genomes::filters::DEFAULT_DATASET_TYPE)]
    pub dataset_type: String,

    /// Dataset statuses to match
    #[arg(long, num_args = 1.., default_value = "Submitted")]
    pub dataset_status: Vec<DatasetStatus>,

    /// Organism group type, e.g. DIVISION
    #[arg(long)]
    pub organism_group_type: Option<String>,

    /// Only datasets and genomes attached to this release
    #[arg(long)]
    pub release_id: Option<i32>,

    /// Rows per page
    #[arg(long, default_value_t = gmc_server::features::shared::pagination::DEFAULT_BATCH_SIZE)]
    pub batch_size: i64,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: i64,

    /// Query every Ensembl division
    #[arg(long)]
    pub run_all: bool,

    /// Move every matched dataset to this status
    #[arg(long)]
    pub update_dataset_status: Option<DatasetStatus>,

    /// Attribute to set on every updated dataset (NAME=VALUE, repeatable)
    #[arg(long, value_parser = parse_key_value, requires = "update_dataset_status")]
    pub update_dataset_attribute: Vec<(String, String)>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Release filter flags
#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Release ids
    #[arg(long, num_args = 1..)]
    pub release_id: Vec<i32>,

    /// One version is an upper bound, several are matched exactly
    #[arg(long, num_args = 1..)]
    pub release_version: Vec<f64>,

    /// Only the current release of each site
    #[arg(long)]
    pub current_only: bool,

    /// Site names
    #[arg(long, num_args = 1..)]
    pub site_name: Vec<String>,

    /// partial or integrated
    #[arg(long, num_args = 1..)]
    pub release_type: Vec<ReleaseType>,

    /// Release labels
    #[arg(long, num_args = 1..)]
    pub label: Vec<String>,

    /// Release status, honoured with --allow-unreleased
    #[arg(long)]
    pub status: Option<ReleaseStatus>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    Ok(gmc_common::naming::parse_boolean_var(value))
}

fn parse_key_value(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), val.to_string()))
        },
        _ => Err(format!("expected NAME=VALUE, got '{}'", value)),
    }
}
