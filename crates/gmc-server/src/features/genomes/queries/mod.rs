pub mod fetch;

pub use fetch::{fetch_genomes, FetchGenomesError, GenomeDatasetRow};
