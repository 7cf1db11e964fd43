//! # Dashflow Runtime
//!
//! Runtime for the Dashflow command/event engine.
//!
//! This crate turns the vocabulary of `dashflow-core` into a running engine:
//! commands go in through [`Engine::dispatch`], handlers read and write the
//! [`Store`], call the [`QueryRegistry`] and the [`Coordinator`], and every
//! command ends in exactly one answering event delivered by the
//! [`EventEmitter`].
//!
//! ## Core Components
//!
//! - **Store**: namespaced state, written only through reducer actions, with
//!   an undo log on the side
//! - **Query cache**: memoized expensive reads, deduplicated per cache key
//! - **Coordinator**: last-request-wins execution per logical key
//! - **Event emitter**: single ordered delivery channel with per-event
//!   snapshots
//! - **Engine**: the dispatcher binding command kinds to handlers
//!
//! ## Example
//!
//! ```ignore
//! use dashflow_runtime::{Engine, EngineConfig};
//!
//! let engine = Engine::<Dashboard>::builder(DashboardState::default(), dashboard_reducer())
//!     .with_config(EngineConfig::from_env()?)
//!     .handler(RENAME_DASHBOARD, RenameDashboardHandler)?
//!     .query(MetricsAndFactsQuery::new(backend.clone()))?
//!     .build();
//!
//! let event = engine.dispatch_and_wait(DashboardCommand::rename("Sales")).await?;
//! assert!(!event.is_failure());
//! ```

/// Engine configuration
pub mod config;

/// Superseding-request coordinator
pub mod coordinator;

/// Diagnostic sink for isolated failures
pub mod diagnostics;

/// Ordered event delivery
pub mod emitter;

/// Command dispatcher, handlers and handler context
pub mod engine;

/// Component health reporting
pub mod health;

/// Prometheus metrics for observability
pub mod metrics;

/// Cached query service
pub mod query;

/// Namespaced state store
pub mod store;

/// Undo log
pub mod undo;

/// Error types for the engine runtime
pub mod error {
    use crate::config::ConfigError;
    use thiserror::Error;

    /// Errors that can occur while building or operating an engine
    ///
    /// Handler failures are never reported through this type; they become
    /// `CommandFailed` events.
    #[derive(Error, Debug)]
    pub enum EngineError {
        /// Two handlers were registered for the same command kind
        #[error("a handler is already registered for command kind {0}")]
        DuplicateHandler(&'static str),

        /// Two queries were registered under the same name
        #[error("a query is already registered under the name {0}")]
        DuplicateQuery(&'static str),

        /// Engine is shutting down and not accepting new commands
        #[error("engine is shutting down")]
        ShutdownInProgress,

        /// Timeout waiting for an event to be delivered
        ///
        /// Returned by `dispatch_and_wait` when the configured dispatch
        /// timeout expires first.
        #[error("timeout waiting for event delivery")]
        Timeout,

        /// The emitter's delivery task is gone
        #[error("event channel closed")]
        ChannelClosed,

        /// The state type cannot restore the namespace an undo targeted
        #[error("namespace {0} cannot be restored")]
        NotRestorable(String),

        /// Invalid configuration
        #[error(transparent)]
        Config(#[from] ConfigError),
    }
}

pub use config::{ConfigError, EngineConfig};
pub use coordinator::{Coordinator, RunOutcome, RunState, Transition};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsSink};
pub use emitter::{EventBodyOf, EventEmitter, EventOf, Subscription};
pub use engine::{
    CommandOutcome, Engine, EngineBuilder, FnHandler, Handler, HandlerContext, MAX_NESTING_DEPTH,
    OutcomeOf, handler_fn,
};
pub use error::EngineError;
pub use health::{Component, HealthCheck, HealthReport, HealthStatus};
pub use query::{QueryCache, QueryRegistry};
pub use store::{StateSnapshot, Store};
pub use undo::{UndoEntry, UndoLog, UndoPoint};

// Handlers implement `Handler` with this attribute and receive this token
// from coordinated runs.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
