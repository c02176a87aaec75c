//! Batch pagination for streamed catalog queries
//!
//! ```rust,ignore
//! use gmc_server::features::shared::pagination::BatchParams;
//!
//! let batch = BatchParams::new(Some(3), Some(50));
//! assert_eq!(batch.offset(), 100);
//! ```

use serde::{Deserialize, Serialize};

/// Rows per batch when the caller does not say.
pub const DEFAULT_BATCH_SIZE: i64 = 50;

/// Page/batch request parameters
///
/// Pages are 1-indexed; anything below 1 is treated as the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BatchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
}

impl BatchParams {
    pub fn new(page: Option<i64>, batch_size: Option<i64>) -> Self {
        Self { page, batch_size }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Rows per batch, at least one.
    pub fn batch_size(&self) -> i64 {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1)
    }

    /// SQL OFFSET for the requested page
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.batch_size()
    }
}
