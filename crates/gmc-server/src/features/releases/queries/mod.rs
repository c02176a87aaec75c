pub mod for_dataset;
pub mod for_genome;
pub mod list;

pub use list::{FetchReleasesError, ListReleasesParams};
