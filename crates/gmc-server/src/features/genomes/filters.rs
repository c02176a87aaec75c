//! Structured genome/dataset filter
//!
//! Every field has a single shape; list-or-scalar guessing happens at the
//! boundary (JSON body, CLI flags), never while building SQL.

use std::collections::BTreeMap;

use gmc_common::naming::{normalize_division, ENSEMBL_DIVISIONS};
use gmc_common::DatasetStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::shared::pagination::{BatchParams, DEFAULT_BATCH_SIZE};

/// Organism group type whose names are division names.
pub const DIVISION_GROUP_TYPE: &str = "DIVISION";

/// Dataset type matched when the caller does not name one.
pub const DEFAULT_DATASET_TYPE: &str = "assembly";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeFilters {
    pub genome_uuid: Vec<Uuid>,
    pub dataset_uuid: Vec<Uuid>,
    pub division: Vec<String>,
    pub species: Vec<String>,
    pub antispecies: Vec<String>,
    pub dataset_type: String,
    pub dataset_status: Vec<DatasetStatus>,
    pub organism_group_type: Option<String>,
    pub release_id: Option<i32>,
    pub batch_size: i64,
    pub page: i64,
    /// Query every Ensembl division, replacing `division`.
    pub run_all: bool,
    /// Move every matched dataset to this status before yielding it.
    pub update_dataset_status: Option<DatasetStatus>,
    /// Attribute values written alongside a successful status update.
    pub update_dataset_attribute: BTreeMap<String, String>,
}

impl Default for GenomeFilters {
    fn default() -> Self {
        Self {
            genome_uuid: Vec::new(),
            dataset_uuid: Vec::new(),
            division: Vec::new(),
            species: Vec::new(),
            antispecies: Vec::new(),
            dataset_type: DEFAULT_DATASET_TYPE.to_string(),
            dataset_status: vec![DatasetStatus::Submitted],
            organism_group_type: None,
            release_id: None,
            batch_size: DEFAULT_BATCH_SIZE,
            page: 1,
            run_all: false,
            update_dataset_status: None,
            update_dataset_attribute: BTreeMap::new(),
        }
    }
}

/// Species restriction derived from the allow and deny lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesFilter {
    All,
    Only(Vec<String>),
    Except(Vec<String>),
}

impl GenomeFilters {
    pub fn batch(&self) -> BatchParams {
        BatchParams::new(Some(self.page), Some(self.batch_size))
    }

    fn is_division_group(&self) -> bool {
        self.organism_group_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(DIVISION_GROUP_TYPE))
    }

    /// Organism group names to match.
    ///
    /// Tokens are canonicalised (`plants` → `EnsemblPlants`) only when the group
    /// type is the division type.
    pub fn divisions(&self) -> Vec<String> {
        if self.run_all {
            return ENSEMBL_DIVISIONS.iter().map(|d| d.to_string()).collect();
        }

        if self.is_division_group() {
            self.division.iter().filter_map(|d| normalize_division(d)).collect()
        } else {
            self.division.clone()
        }
    }

    /// Allowed species minus denied ones; when that leaves nothing, every
    /// species except the denied ones.
    pub fn species_filter(&self) -> SpeciesFilter {
        let allowed: Vec<String> = self
            .species
            .iter()
            .filter(|s| !self.antispecies.contains(s))
            .cloned()
            .collect();

        if !allowed.is_empty() {
            SpeciesFilter::Only(allowed)
        } else if !self.antispecies.is_empty() {
            SpeciesFilter::Except(self.antispecies.clone())
        } else {
            SpeciesFilter::All
        }
    }
}
