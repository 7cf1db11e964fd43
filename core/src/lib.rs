//! # Dashflow Core
//!
//! Core traits and types for the Dashflow command/event engine.
//!
//! This crate holds the vocabulary shared by the runtime and by domain crates.
//! It performs no I/O and spawns nothing; everything here is plain data or a
//! trait describing a seam.
//!
//! ## Core Concepts
//!
//! - **Command**: a typed intent, wrapped in a [`command::CommandEnvelope`] that
//!   carries the correlation id
//! - **Event**: the immutable record that a command took effect (or failed)
//! - **Reducer**: the only code allowed to write a state namespace
//! - **Undo descriptor**: side-channel data linking a mutation to the command
//!   that caused it
//! - **Query**: an expensive read whose result the runtime memoizes per cache key
//! - **Domain**: the bundle of associated types a runtime engine is built for
//!
//! ## Example
//!
//! ```ignore
//! use dashflow_core::{Domain, reducer::Reducer};
//!
//! struct Dashboard;
//!
//! impl Domain for Dashboard {
//!     type State = DashboardState;
//!     type Action = DashboardAction;
//!     type Command = DashboardCommand;
//!     type Event = DashboardEvent;
//!     type Reducer = DashboardReducer;
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Command types and correlation ids
pub mod command;

/// Reducer composition over state namespaces
pub mod composition;

/// Handler and validation error taxonomy
pub mod error;

/// Event envelopes and reserved lifecycle events
pub mod event;

/// Cached query descriptions and cache keys
pub mod query;

/// Undo descriptors and namespace restoration
pub mod undo;

pub use command::{Command, CommandEnvelope, CorrelationId};
pub use error::{FailureReason, HandlerError};
pub use event::{CommandFailed, DomainEvent, Event, EventBody, EventContext};
pub use query::{Query, QueryError, cache_key};
pub use undo::{RestoreNamespace, UndoDescriptor};

/// Reducer module - The only path through which state is written
///
/// Reducers are synchronous and infallible. Validation happens in command
/// handlers before any action reaches a reducer, so a reducer may assume the
/// action it receives is applicable.
pub mod reducer {
    /// The Reducer trait - applies a mutation action to a state slice
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state slice this reducer owns
    /// - `Action`: The mutation actions this reducer accepts
    ///
    /// # Example
    ///
    /// ```
    /// use dashflow_core::reducer::Reducer;
    ///
    /// #[derive(Default)]
    /// struct TitleState {
    ///     title: String,
    /// }
    ///
    /// enum TitleAction {
    ///     Rename(String),
    /// }
    ///
    /// struct TitleReducer;
    ///
    /// impl Reducer for TitleReducer {
    ///     type State = TitleState;
    ///     type Action = TitleAction;
    ///
    ///     fn reduce(&self, state: &mut TitleState, action: TitleAction) {
    ///         match action {
    ///             TitleAction::Rename(title) => state.title = title,
    ///         }
    ///     }
    /// }
    ///
    /// let mut state = TitleState::default();
    /// TitleReducer.reduce(&mut state, TitleAction::Rename("Sales".into()));
    /// assert_eq!(state.title, "Sales");
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// Apply an action to the state in place
        fn reduce(&self, state: &mut Self::State, action: Self::Action);
    }

    /// Actions that belong to exactly one state namespace
    ///
    /// The runtime uses the namespace to file undo entries and the kind for
    /// logging; reducers never see either.
    pub trait Namespaced {
        /// Namespace owning the slice this action mutates (e.g. `"layout"`)
        fn namespace(&self) -> &'static str;

        /// Stable identifier of the action shape (e.g. `"layout/moveSection"`)
        fn kind(&self) -> &'static str;
    }
}

/// Environment module - Dependency injection traits
///
/// External dependencies are abstracted behind traits so tests can swap in
/// deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use dashflow_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

/// The bundle of types an engine is instantiated for
///
/// A domain crate implements this once on a marker type; the runtime is
/// generic over it instead of over five separate type parameters.
pub trait Domain: Send + Sync + 'static {
    /// Root of the namespaced state tree
    type State: Clone + RestoreNamespace + Send + Sync + 'static;

    /// Namespace-scoped mutation actions
    type Action: reducer::Namespaced + Clone + std::fmt::Debug + Send + Sync + 'static;

    /// Commands accepted by the dispatcher
    type Command: Command;

    /// Domain events produced by handlers
    type Event: DomainEvent;

    /// Root reducer for [`Self::State`]
    type Reducer: reducer::Reducer<State = Self::State, Action = Self::Action>
        + Send
        + Sync
        + 'static;
}
