//! Feature modules implementing the catalog API
//!
//! Each feature is a vertical slice with its own commands, queries and routes.
//!
//! # Features
//!
//! - **releases**: release lookups and the release/site visibility builder
//! - **datasets**: dataset creation, child derivation and status lifecycle
//! - **genomes**: the genome/dataset filter engine
//! - **exports**: changelog, statistics and FTP index reports
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations, each run in one transaction
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! Handlers are plain async functions taking the pool and, where rows may be
//! hidden, the [`VisibilityPolicy`] of the caller.

pub mod datasets;
pub mod exports;
pub mod genomes;
pub mod releases;
pub mod shared;

use axum::{extract::FromRef, Router};
use sqlx::PgPool;

use crate::visibility::VisibilityPolicy;

/// Shared state for all feature routes
///
/// Handlers extract the parts they need with `State<PgPool>` and
/// `State<VisibilityPolicy>`.
#[derive(Clone, FromRef)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: PgPool,
    /// Which releases and datasets callers may see
    pub policy: VisibilityPolicy,
}

/// Creates the main API router with all feature routes mounted
///
/// - `/releases` - Release listing
/// - `/datasets` - Dataset lifecycle
/// - `/genomes` - Genome queries
/// - `/exports` - Reports
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/releases", releases::releases_routes())
        .nest("/datasets", datasets::datasets_routes())
        .nest("/genomes", genomes::genomes_routes())
        .nest("/exports", exports::exports_routes())
        .with_state(state)
}
