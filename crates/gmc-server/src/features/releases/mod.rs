//! Release lookups under the visibility policy

pub mod filter;
pub mod queries;
pub mod routes;
pub mod types;

pub use filter::{Base, ReleaseQuery, SqlValue, WithRelease};
pub use queries::{FetchReleasesError, ListReleasesParams};
pub use routes::releases_routes;
pub use types::{ReleaseFilter, ReleaseRecord, ReleaseVersionFilter};
