//! Release row and filter types shared by the release queries

use chrono::NaiveDate;
use gmc_common::{ReleaseStatus, ReleaseType};
use serde::{Deserialize, Serialize};

/// Columns every release query selects, in [`ReleaseRecord`] order.
///
/// The site columns read from `es`, which [`super::filter::ReleaseQuery::with_visibility`] joins.
pub const RELEASE_COLUMNS: &str = "er.release_id, er.version, er.label, er.release_type, \
     er.status, er.is_current, er.release_date, er.name, \
     es.site_id AS site_id, es.name AS site_name";

/// One release as seen through the visibility policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReleaseRecord {
    pub release_id: i32,
    pub version: f64,
    pub label: Option<String>,
    pub release_type: ReleaseType,
    pub status: ReleaseStatus,
    pub is_current: bool,
    pub release_date: Option<NaiveDate>,
    pub name: Option<String>,
    /// Null when unreleased rows are visible and the release belongs to no
    /// site, or to a site other than the current one.
    pub site_id: Option<i32>,
    pub site_name: Option<String>,
}

/// How a release version constrains the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum ReleaseVersionFilter {
    Exact(f64),
    /// Every release up to and including the version.
    AtMost(f64),
    AnyOf(Vec<f64>),
}

impl ReleaseVersionFilter {
    /// Interpret loosely supplied versions: one value is an upper bound, several
    /// values are a set.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        match values {
            [] => None,
            [single] => Some(Self::AtMost(*single)),
            many => Some(Self::AnyOf(many.to_vec())),
        }
    }
}

/// Narrowing applied by [`super::queries::list`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseFilter {
    #[serde(default)]
    pub release_ids: Vec<i32>,
    #[serde(default)]
    pub version: Option<ReleaseVersionFilter>,
    #[serde(default)]
    pub current_only: bool,
    #[serde(default)]
    pub site_names: Vec<String>,
    #[serde(default)]
    pub release_types: Vec<ReleaseType>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Only honoured when unreleased rows are visible.
    #[serde(default)]
    pub status: Option<ReleaseStatus>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_version_filter_from_values() {
        assert_eq!(ReleaseVersionFilter::from_values(&[]), None);
        assert_eq!(
            ReleaseVersionFilter::from_values(&[110.1]),
            Some(ReleaseVersionFilter::AtMost(110.1))
        );
        assert_eq!(
            ReleaseVersionFilter::from_values(&[110.1, 111.0]),
            Some(ReleaseVersionFilter::AnyOf(vec![110.1, 111.0]))
        );
    }

    #[test]
    fn test_filter_deserializes_with_defaults() {
        let filter: ReleaseFilter =
            serde_json::from_str(r#"{"current_only": true, "version": {"op": "exact", "value": 1.0}}"#)
                .unwrap();
        assert!(filter.current_only);
        assert_eq!(filter.version, Some(ReleaseVersionFilter::Exact(1.0)));
        assert!(filter.labels.is_empty());
    }
}
