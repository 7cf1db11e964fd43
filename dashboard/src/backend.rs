//! Analytical backend the dashboard talks to.
//!
//! Handlers and queries depend on the [`Backend`] trait only; the engine is
//! wired with a real client in production and with
//! [`MockBackend`](crate::mock::MockBackend) in tests and the demo.

use crate::model::{AttributeElement, Catalog, DashboardDefinition};
use async_trait::async_trait;
use dashflow_core::HandlerError;
use thiserror::Error;

/// Errors a backend call may return
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request succeeded but produced no data
    #[error("no data")]
    NoData,

    /// The requested object does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The backend could not be reached or failed
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A save raced with another writer
    #[error("revision conflict: expected {expected}, found {actual}")]
    Conflict {
        /// Revision the caller based its change on
        expected: u64,
        /// Revision stored in the backend
        actual: u64,
    },
}

impl From<BackendError> for HandlerError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::NotFound(what) => Self::not_found(format!("{what} not found")),
            BackendError::Conflict { .. } => Self::invalid_state(error.to_string()),
            BackendError::NoData | BackendError::Unavailable(_) => {
                Self::Collaborator(error.to_string())
            },
        }
    }
}

/// Result type for backend calls
pub type Result<T> = std::result::Result<T, BackendError>;

/// Calls the dashboard makes against the analytical backend
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Load a persisted dashboard
    ///
    /// # Errors
    ///
    /// [`BackendError::NotFound`] for an unknown id, or any transport error.
    async fn load_dashboard(&self, dashboard_id: &str) -> Result<DashboardDefinition>;

    /// Load the workspace catalog
    ///
    /// # Errors
    ///
    /// Any transport error.
    async fn load_catalog(&self) -> Result<Catalog>;

    /// Load the elements of a display form
    ///
    /// # Errors
    ///
    /// [`BackendError::NoData`] when the display form has no elements, or any
    /// transport error.
    async fn load_attribute_elements(&self, display_form: &str) -> Result<Vec<AttributeElement>>;

    /// Persist a dashboard, returning the new revision
    ///
    /// # Errors
    ///
    /// [`BackendError::Conflict`] when `definition.revision` is stale, or any
    /// transport error.
    async fn save_dashboard(&self, definition: DashboardDefinition) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashflow_core::FailureReason;

    #[test]
    fn test_backend_errors_map_to_failure_reasons() {
        let cases = [
            (BackendError::NotFound("dashboard d1".into()), Some(FailureReason::NotFound)),
            (
                BackendError::Conflict {
                    expected: 1,
                    actual: 2,
                },
                Some(FailureReason::InvalidState),
            ),
            (
                BackendError::Unavailable("timeout".into()),
                Some(FailureReason::CollaboratorFailed),
            ),
        ];
        for (error, reason) in cases {
            assert_eq!(HandlerError::from(error).reason(), reason);
        }
    }
}
