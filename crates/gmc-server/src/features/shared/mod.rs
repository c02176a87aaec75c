//! Helpers shared across feature slices

pub mod pagination;
pub mod validation;

pub use pagination::{BatchParams, DEFAULT_BATCH_SIZE};
pub use validation::{validate_name, NameValidationError};
