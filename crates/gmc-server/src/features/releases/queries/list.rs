//! List releases query

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::releases::filter::{ReleaseQuery, SqlValue, WithRelease};
use crate::features::releases::types::{
    ReleaseFilter, ReleaseRecord, ReleaseVersionFilter, RELEASE_COLUMNS,
};
use crate::visibility::VisibilityPolicy;

#[derive(Debug, thiserror::Error)]
pub enum FetchReleasesError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Query-string form of [`ReleaseFilter`].
///
/// List parameters are comma separated (`?release_id=1,2&label=beta-1`).
/// A single `version` is an upper bound; several versions are a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListReleasesParams {
    pub release_id: Option<String>,
    pub version: Option<String>,
    pub current_only: Option<bool>,
    pub site_name: Option<String>,
    pub release_type: Option<String>,
    pub label: Option<String>,
    pub status: Option<String>,
}

fn split_list(raw: &Option<String>) -> Vec<&str> {
    raw.as_deref()
        .map(|s| s.split(',').map(str::trim).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default()
}

fn parse_list<T: std::str::FromStr>(
    name: &'static str,
    raw: &Option<String>,
) -> Result<Vec<T>, FetchReleasesError>
where
    T::Err: std::fmt::Display,
{
    split_list(raw)
        .into_iter()
        .map(|token| {
            token.parse::<T>().map_err(|e| FetchReleasesError::InvalidParameter {
                name,
                reason: format!("'{}': {}", token, e),
            })
        })
        .collect()
}

impl ListReleasesParams {
    /// Decide every field's shape once, before any SQL is built.
    pub fn into_filter(self) -> Result<ReleaseFilter, FetchReleasesError> {
        let versions: Vec<f64> = parse_list("version", &self.version)?;
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(|e: gmc_common::GmcError| {
                FetchReleasesError::InvalidParameter {
                    name: "status",
                    reason: e.to_string(),
                }
            })?),
        };

        Ok(ReleaseFilter {
            release_ids: parse_list("release_id", &self.release_id)?,
            version: ReleaseVersionFilter::from_values(&versions),
            current_only: self.current_only.unwrap_or(false),
            site_names: split_list(&self.site_name).into_iter().map(String::from).collect(),
            release_types: parse_list("release_type", &self.release_type)?,
            labels: split_list(&self.label).into_iter().map(String::from).collect(),
            status,
        })
    }
}

/// Build the release listing for `filter` under `policy`.
pub fn build(policy: &VisibilityPolicy, filter: &ReleaseFilter) -> ReleaseQuery<WithRelease> {
    let mut query = ReleaseQuery::from_releases(format!(
        "SELECT {} FROM ensembl_release er",
        RELEASE_COLUMNS
    ));

    if !filter.release_ids.is_empty() {
        query = query.filter_in("er.release_id", SqlValue::Ints(filter.release_ids.clone()));
    }

    query = match &filter.version {
        Some(ReleaseVersionFilter::Exact(v)) => query.filter_eq("er.version", SqlValue::Float(*v)),
        Some(ReleaseVersionFilter::AtMost(v)) => {
            let mut query = query;
            let placeholder = query.push_bind(SqlValue::Float(*v));
            query.filter(format!("er.version <= {}", placeholder))
        },
        Some(ReleaseVersionFilter::AnyOf(vs)) => {
            query.filter_in("er.version", SqlValue::Floats(vs.clone()))
        },
        None => query,
    };

    if filter.current_only {
        query = query.filter("er.is_current");
    }

    if !filter.release_types.is_empty() {
        let types = filter.release_types.iter().map(|t| t.as_str().to_string()).collect();
        query = query.filter_in("er.release_type::text", SqlValue::Texts(types));
    }

    if !filter.labels.is_empty() {
        query = query.filter_in("er.label", SqlValue::Texts(filter.labels.clone()));
    }

    query
        .with_visibility(policy, filter.status)
        .filter_site_names(&filter.site_names)
        .order_by(&["er.version"])
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    policy: VisibilityPolicy,
    filter: ReleaseFilter,
) -> Result<Vec<ReleaseRecord>, FetchReleasesError> {
    let releases: Vec<ReleaseRecord> = build(&policy, &filter).fetch_all(&pool).await?;

    tracing::debug!(count = releases.len(), "Fetched releases");

    Ok(releases)
}
