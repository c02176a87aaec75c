pub mod create;
pub mod create_children;
pub mod update_attributes;
pub mod update_status;

pub use create::{CreateDatasetCommand, CreateDatasetError, CreateDatasetResponse, DatasetSourceSpec};
pub use create_children::{
    CreateChildDatasetsCommand, CreateChildDatasetsError, CreateChildDatasetsResponse,
};
pub use update_attributes::{
    UpdateDatasetAttributesCommand, UpdateDatasetAttributesError, UpdateDatasetAttributesResponse,
};
pub use update_status::{
    UpdateDatasetStatusCommand, UpdateDatasetStatusError, UpdateDatasetStatusResponse,
};
