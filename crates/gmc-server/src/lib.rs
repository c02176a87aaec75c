//! GMC Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Core of the genome metadata catalog plus its HTTP façade.
//!
//! # Overview
//!
//! - **Visibility**: [`VisibilityPolicy`] decides whether unreleased releases and
//!   datasets are returned; it is passed explicitly into every query
//! - **Releases**: a typed builder that adds the release/site join and the
//!   visibility predicate to any catalog query
//! - **Datasets**: dataset creation, child derivation and the monotonic status
//!   lifecycle, each mutation inside one transaction
//! - **Genomes**: the filter engine composing organism group, species, release
//!   and dataset filters into one paginated lazy query
//! - **Exports**: changelog CSV, statistics CSVs and the FTP index JSON
//! - **Configuration**: environment based, see [`config::Config`]
//!
//! # Architecture
//!
//! Features are vertical slices (`features/<name>/{commands,queries,routes}`).
//! Commands and queries are plain async functions over a `PgPool`, so the
//! HTTP routes and the `gmc` command-line tool share the same handlers.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing
//! - **SQLx**: PostgreSQL access with runtime-checked queries
//! - **Tower**: Middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use gmc_server::features::genomes::{fetch_genomes, GenomeFilters};
//! use gmc_server::VisibilityPolicy;
//! use futures::TryStreamExt;
//!
//! # async fn run(pool: sqlx::PgPool) -> anyhow::Result<()> {
//! let filters = GenomeFilters {
//!     species: vec!["homo_sapiens".into()],
//!     ..GenomeFilters::default()
//! };
//! let rows: Vec<_> = fetch_genomes(pool, VisibilityPolicy::default(), filters)
//!     .try_collect()
//!     .await?;
//! println!("{} rows", rows.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;
pub mod visibility;

// Re-export commonly used types
pub use error::{AppError, LifecycleError};
pub use visibility::VisibilityPolicy;
