//! Server-specific error types

use crate::api::response::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gmc_common::DatasetStatus;
use thiserror::Error;
use uuid::Uuid;

/// A requested status change that the dataset graph does not permit yet.
///
/// Kept apart from validation errors: the request itself was well formed, but
/// the data is not ready for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Dataset {dataset_uuid} cannot move from {current} back to {requested}")]
    Regression {
        dataset_uuid: Uuid,
        current: DatasetStatus,
        requested: DatasetStatus,
    },

    #[error(
        "Dataset {dataset_uuid} cannot start processing: dependencies not processed: {}",
        .blocking.join(", ")
    )]
    DependenciesIncomplete {
        dataset_uuid: Uuid,
        blocking: Vec<String>,
    },

    #[error(
        "Dataset {dataset_uuid} cannot become {requested}: {} descendant dataset(s) not processed ({})",
        .pending.len(),
        describe_pending(.pending)
    )]
    DescendantsIncomplete {
        dataset_uuid: Uuid,
        requested: DatasetStatus,
        pending: Vec<(Uuid, DatasetStatus)>,
    },
}

fn describe_pending(pending: &[(Uuid, DatasetStatus)]) -> String {
    pending
        .iter()
        .map(|(uuid, status)| format!("{} is {}", uuid, status))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Lifecycle violation: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<gmc_common::GmcError> for AppError {
    fn from(err: gmc_common::GmcError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::Config(msg) => AppError::Internal(msg),
            crate::db::DbError::Sqlx(err) => AppError::Database(err),
        }
    }
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Lifecycle(_) => (StatusCode::CONFLICT, "LIFECYCLE_VIOLATION"),
            AppError::Internal(_) | AppError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            },
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                "An IO error occurred".to_string()
            },
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                "An internal error occurred".to_string()
            },
            AppError::NotFound(message) | AppError::Validation(message) => message.clone(),
            AppError::Lifecycle(e) => e.to_string(),
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("bad".into()).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("gone".into()).status_and_code().0,
            StatusCode::NOT_FOUND
        );
        let lifecycle = LifecycleError::Regression {
            dataset_uuid: Uuid::nil(),
            current: DatasetStatus::Released,
            requested: DatasetStatus::Processing,
        };
        assert_eq!(
            AppError::from(lifecycle).status_and_code(),
            (StatusCode::CONFLICT, "LIFECYCLE_VIOLATION")
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_and_code().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_lifecycle_messages_name_blockers() {
        let err = LifecycleError::DescendantsIncomplete {
            dataset_uuid: Uuid::nil(),
            requested: DatasetStatus::Released,
            pending: vec![(Uuid::nil(), DatasetStatus::Processing)],
        };
        let message = err.to_string();
        assert!(message.contains("Released"));
        assert!(message.contains("is Processing"));

        let err = LifecycleError::DependenciesIncomplete {
            dataset_uuid: Uuid::nil(),
            blocking: vec!["genebuild".into(), "assembly".into()],
        };
        assert!(err.to_string().ends_with("genebuild, assembly"));
    }

    #[test]
    fn test_common_errors_are_validation() {
        let err = AppError::from(gmc_common::GmcError::InvalidAccession("GCX_1".into()));
        assert!(matches!(err, AppError::Validation(_)));
    }
}
