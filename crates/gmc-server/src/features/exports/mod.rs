//! Read-only reports over released catalog content
//!
//! - [`stats`]: per-release genome/assembly/dataset counts (`stats.partial.csv`,
//!   `stats.integrated.csv`)
//! - [`changelog`]: per-genome changes in one release (`<label>.csv`)
//! - [`ftp_index`]: nested JSON index of public file paths
//!
//! Each report loads its rows in a handful of bulk queries and derives the
//! output in memory, so the derivation functions are pure and unit tested
//! without a database.

pub mod changelog;
pub mod ftp_index;
pub mod routes;
pub mod stats;

use std::path::Path;

pub use changelog::{ChangelogError, ChangelogReport};
pub use ftp_index::{DatasetPaths, FtpIndex, FtpIndexError};
pub use routes::exports_routes;
pub use stats::{IntegratedStats, PartialStats, StatsError, StatsReport};

/// Create the parent directory of `path` when it has one.
pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
