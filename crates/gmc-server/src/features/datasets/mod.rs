//! Dataset lifecycle: creation, child derivation, status transitions

pub mod commands;
pub mod graph;
pub mod lifecycle;
pub mod queries;
pub mod routes;
pub mod store;

pub use commands::{
    CreateChildDatasetsCommand, CreateChildDatasetsError, CreateChildDatasetsResponse,
    CreateDatasetCommand, CreateDatasetError, CreateDatasetResponse, DatasetSourceSpec,
    UpdateDatasetAttributesCommand, UpdateDatasetAttributesError,
    UpdateDatasetAttributesResponse, UpdateDatasetStatusCommand, UpdateDatasetStatusError,
    UpdateDatasetStatusResponse,
};
pub use graph::{DatasetGraph, DatasetNode};
pub use lifecycle::{plan_transition, TransitionPlan};
pub use queries::{GenomeDatasetRef, GenomesByStatusError, GetParentDatasetError, ParentDataset};
pub use routes::datasets_routes;
