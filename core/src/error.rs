//! Failure taxonomy for command handlers.
//!
//! Handlers return [`HandlerError`]; the dispatcher turns every variant into
//! data (a `CommandFailed` or `Canceled` event). Nothing here is meant to
//! cross the dispatch boundary as a Rust error.

use crate::query::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable reason code carried by `CommandFailed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Payload violates an invariant (index out of range, empty title, ...)
    InvalidArguments,
    /// Payload references an entity that does not exist
    NotFound,
    /// Store is not in a state where the command applies (e.g. uninitialized)
    InvalidState,
    /// An external collaborator (backend, query worker) failed
    CollaboratorFailed,
    /// No handler is bound to the command type
    UnhandledCommand,
    /// Handler panicked or hit an unexpected condition
    #[serde(rename = "internal-error")]
    Internal,
}

impl FailureReason {
    /// Stable string form of the reason code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArguments => "invalid-arguments",
            Self::NotFound => "not-found",
            Self::InvalidState => "invalid-state",
            Self::CollaboratorFailed => "collaborator-failed",
            Self::UnhandledCommand => "unhandled-command",
            Self::Internal => "internal-error",
        }
    }

    /// Whether the failure was caused by the caller rather than the system
    #[must_use]
    pub const fn is_user_error(self) -> bool {
        matches!(self, Self::InvalidArguments | Self::NotFound | Self::InvalidState)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a command handler may return
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    /// A precondition failed; raised before any store mutation
    #[error("{message}")]
    Validation {
        /// Reason code reported to listeners
        reason: FailureReason,
        /// Human-readable explanation
        message: String,
    },

    /// A backend call failed and the handler has no fallback
    #[error("collaborator failed: {0}")]
    Collaborator(String),

    /// A cached query failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The handler's coordinated work was superseded or canceled
    #[error("canceled")]
    Canceled,

    /// Unexpected condition inside the handler
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Validation failure with [`FailureReason::InvalidArguments`]
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::Validation {
            reason: FailureReason::InvalidArguments,
            message: message.into(),
        }
    }

    /// Validation failure with [`FailureReason::NotFound`]
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Validation {
            reason: FailureReason::NotFound,
            message: message.into(),
        }
    }

    /// Validation failure with [`FailureReason::InvalidState`]
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::Validation {
            reason: FailureReason::InvalidState,
            message: message.into(),
        }
    }

    /// Reason code for the `CommandFailed` event, `None` for cancellation
    #[must_use]
    pub const fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Validation { reason, .. } => Some(*reason),
            Self::Collaborator(_) | Self::Query(_) => Some(FailureReason::CollaboratorFailed),
            Self::Canceled => None,
            Self::Internal(_) => Some(FailureReason::Internal),
        }
    }

    /// Whether this is the cancellation outcome rather than a failure
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}
