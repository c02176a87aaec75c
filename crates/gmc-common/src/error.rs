//! Error types for GMC

use thiserror::Error;

/// Result type alias for GMC vocabulary operations
pub type Result<T> = std::result::Result<T, GmcError>;

/// Errors raised while interpreting catalog values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GmcError {
    #[error("Invalid assembly accession '{0}': expected GCA_/GCF_ followed by nine digits and a version")]
    InvalidAccession(String),

    #[error("Invalid dataset status: {0}")]
    InvalidDatasetStatus(String),

    #[error("Invalid release status: {0}")]
    InvalidReleaseStatus(String),

    #[error("Invalid release type: {0}")]
    InvalidReleaseType(String),

    #[error("Invalid attribute type: {0}")]
    InvalidAttributeType(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
