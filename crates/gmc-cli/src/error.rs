//! Error types for the GMC CLI
//!
//! Messages are user-facing and end with a hint where one helps.

use gmc_server::db::DbError;
use gmc_server::features::datasets::{
    CreateChildDatasetsError, GetParentDatasetError, UpdateDatasetStatusError,
};
use gmc_server::features::exports::{ChangelogError, FtpIndexError, StatsError};
use gmc_server::features::genomes::FetchGenomesError;
use gmc_server::features::releases::FetchReleasesError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check --database-url and the DATABASE_URL, ALLOW_UNRELEASED and ENSEMBL_SITE variables.")]
    Config(String),

    /// Pool creation or connection failed
    #[error("{0}")]
    Db(#[from] DbError),

    /// Invalid command-line value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Genomes(#[from] FetchGenomesError),

    #[error(transparent)]
    Releases(#[from] FetchReleasesError),

    #[error(transparent)]
    Status(#[from] UpdateDatasetStatusError),

    #[error(transparent)]
    Children(#[from] CreateChildDatasetsError),

    #[error(transparent)]
    Parent(#[from] GetParentDatasetError),

    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    FtpIndex(#[from] FtpIndexError),

    /// Writing output failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Encoding a result line failed
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<gmc_common::GmcError> for CliError {
    fn from(err: gmc_common::GmcError) -> Self {
        Self::Config(err.to_string())
    }
}
