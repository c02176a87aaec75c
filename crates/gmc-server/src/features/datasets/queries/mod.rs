pub mod by_status_and_type;
pub mod parent;

pub use by_status_and_type::{GenomeDatasetRef, GenomesByStatusError};
pub use parent::{GetParentDatasetError, ParentDataset};
