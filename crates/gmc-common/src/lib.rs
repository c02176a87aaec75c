//! GMC Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared vocabulary, helpers, and error handling for the genome metadata catalog.
//!
//! # Overview
//!
//! This crate provides functionality used by every GMC workspace member:
//!
//! - **Error Handling**: [`GmcError`] and the [`Result`] alias
//! - **Types**: dataset/release status enums with their ordering rules
//! - **Naming**: accession path derivation, species key normalisation, division names
//! - **Logging**: `tracing` subscriber bootstrap shared by the server and the CLI
//!
//! # Example
//!
//! ```no_run
//! use gmc_common::naming::{format_accession_path, normalize_species_name};
//!
//! fn main() -> gmc_common::Result<()> {
//!     let path = format_accession_path("GCF_043381705.1")?;
//!     assert_eq!(path, "GCF/043/381/705/1");
//!     assert_eq!(normalize_species_name("Homo sapiens"), "Homo_sapiens");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod naming;
pub mod types;

// Re-export commonly used types
pub use error::{GmcError, Result};
pub use types::{AttributeType, DatasetStatus, ReleaseStatus, ReleaseType};
