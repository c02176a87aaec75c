//! Catalog vocabulary shared by the server and the CLI

use crate::error::GmcError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Dataset Status
// ============================================================================

/// Production status of a dataset.
///
/// Variants are declared in lifecycle order, so the derived `Ord` matches the
/// only permitted direction of travel:
/// `Submitted < Processing < Processed < Released`.
///
/// # Examples
///
/// ```
/// use gmc_common::DatasetStatus;
///
/// assert!(DatasetStatus::Submitted < DatasetStatus::Released);
/// assert_eq!("Processed".parse::<DatasetStatus>().unwrap(), DatasetStatus::Processed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "dataset_status"))]
pub enum DatasetStatus {
    Submitted,
    Processing,
    Processed,
    Released,
}

impl DatasetStatus {
    pub const ALL: [DatasetStatus; 4] = [
        DatasetStatus::Submitted,
        DatasetStatus::Processing,
        DatasetStatus::Processed,
        DatasetStatus::Released,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetStatus::Submitted => "Submitted",
            DatasetStatus::Processing => "Processing",
            DatasetStatus::Processed => "Processed",
            DatasetStatus::Released => "Released",
        }
    }

    /// Whether production work on the dataset has finished.
    pub fn is_complete(&self) -> bool {
        *self >= DatasetStatus::Processed
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetStatus {
    type Err = GmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Submitted" => Ok(DatasetStatus::Submitted),
            "Processing" => Ok(DatasetStatus::Processing),
            "Processed" => Ok(DatasetStatus::Processed),
            "Released" => Ok(DatasetStatus::Released),
            other => Err(GmcError::InvalidDatasetStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Release Status / Type
// ============================================================================

/// Publication status of an Ensembl release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "release_status"))]
pub enum ReleaseStatus {
    Planned,
    Preparing,
    Prepared,
    Released,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Planned => "Planned",
            ReleaseStatus::Preparing => "Preparing",
            ReleaseStatus::Prepared => "Prepared",
            ReleaseStatus::Released => "Released",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = GmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planned" => Ok(ReleaseStatus::Planned),
            "Preparing" => Ok(ReleaseStatus::Preparing),
            "Prepared" => Ok(ReleaseStatus::Prepared),
            "Released" => Ok(ReleaseStatus::Released),
            other => Err(GmcError::InvalidReleaseStatus(other.to_string())),
        }
    }
}

/// Kind of release: a partial drop of new data, or an integrated snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "release_type", rename_all = "lowercase"))]
pub enum ReleaseType {
    Partial,
    Integrated,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Partial => "partial",
            ReleaseType::Integrated => "integrated",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = GmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "partial" => Ok(ReleaseType::Partial),
            "integrated" => Ok(ReleaseType::Integrated),
            _ => Err(GmcError::InvalidReleaseType(s.to_string())),
        }
    }
}

// ============================================================================
// Attribute Type
// ============================================================================

/// How the string value of a dataset attribute should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "attribute_type", rename_all = "lowercase"))]
pub enum AttributeType {
    #[default]
    String,
    Percent,
    Float,
    Integer,
    Bp,
}

impl FromStr for AttributeType {
    type Err = GmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(AttributeType::String),
            "percent" => Ok(AttributeType::Percent),
            "float" => Ok(AttributeType::Float),
            "integer" => Ok(AttributeType::Integer),
            "bp" => Ok(AttributeType::Bp),
            _ => Err(GmcError::InvalidAttributeType(s.to_string())),
        }
    }
}
