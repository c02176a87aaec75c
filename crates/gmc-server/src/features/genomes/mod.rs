//! Genome/dataset filter engine

pub mod filters;
pub mod queries;
pub mod routes;

pub use filters::{GenomeFilters, SpeciesFilter};
pub use queries::{fetch_genomes, FetchGenomesError, GenomeDatasetRow};
pub use routes::genomes_routes;
