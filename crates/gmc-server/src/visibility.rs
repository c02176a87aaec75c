//! Visibility policy
//!
//! Decides whether unreleased releases and datasets may be returned to a caller.
//! The policy is loaded once per process (see [`crate::config::Config`]) and then
//! passed by value into every query builder; nothing reads it from global state,
//! so two callers holding different policies never observe each other.

use gmc_common::naming::parse_boolean_var;
use gmc_common::{GmcError, Result};
use serde::{Deserialize, Serialize};

/// Site used when `ENSEMBL_SITE` is unset.
pub const DEFAULT_SITE_ID: i32 = 1;

/// Which rows a query may surface.
///
/// With `allow_unreleased == false` only rows attached to a `Released` release of
/// `current_site_id` are eligible. With `allow_unreleased == true` releases without
/// a site, and releases in any status, become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPolicy {
    pub allow_unreleased: bool,
    pub current_site_id: i32,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::released_only(DEFAULT_SITE_ID)
    }
}

impl VisibilityPolicy {
    /// Only released data of `site_id` is visible.
    pub fn released_only(site_id: i32) -> Self {
        Self {
            allow_unreleased: false,
            current_site_id: site_id,
        }
    }

    /// Everything is visible; explicit status filters still narrow.
    pub fn allow_unreleased(site_id: i32) -> Self {
        Self {
            allow_unreleased: true,
            current_site_id: site_id,
        }
    }

    /// Read `ALLOW_UNRELEASED` and `ENSEMBL_SITE` from the environment.
    pub fn from_env() -> Result<Self> {
        let allow_unreleased = std::env::var("ALLOW_UNRELEASED")
            .map(|v| parse_boolean_var(&v))
            .unwrap_or(false);

        let current_site_id = match std::env::var("ENSEMBL_SITE") {
            Ok(raw) => raw.trim().parse::<i32>().map_err(|_| {
                GmcError::Config(format!("ENSEMBL_SITE must be an integer, got '{}'", raw))
            })?,
            Err(_) => DEFAULT_SITE_ID,
        };

        Ok(Self {
            allow_unreleased,
            current_site_id,
        })
    }
}
