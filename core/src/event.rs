//! Event envelopes and the reserved lifecycle events.
//!
//! Events are the only externally observable proof that a command was
//! processed. Domain crates define their own event enum implementing
//! [`DomainEvent`]; the engine wraps it in an [`Event`] together with the
//! correlation id and delivery context, and adds three reserved kinds of its
//! own: started, failed and canceled.
//!
//! # Example
//!
//! ```
//! use dashflow_core::event::DomainEvent;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum LayoutEvent {
//!     SectionAdded { index: usize },
//!     SectionMoved { from_index: usize, to_index: usize },
//! }
//!
//! impl DomainEvent for LayoutEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             LayoutEvent::SectionAdded { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_ADDED",
//!             LayoutEvent::SectionMoved { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_MOVED",
//!         }
//!     }
//! }
//! ```

use crate::command::{Command, CorrelationId};
use crate::error::FailureReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type id of the reserved "command started" event
pub const COMMAND_STARTED: &str = "GDC.DASH/EVT.COMMAND.STARTED";

/// Type id of the reserved "command failed" event
pub const COMMAND_FAILED: &str = "GDC.DASH/EVT.COMMAND.FAILED";

/// Type id of the reserved "command canceled" event
pub const COMMAND_CANCELED: &str = "GDC.DASH/EVT.COMMAND.CANCELED";

/// A domain event produced by a command handler
///
/// `event_type()` is part of the external contract: listeners filter on it,
/// so implementations return string literals that never change meaning.
pub trait DomainEvent: Clone + fmt::Debug + Send + Sync + 'static {
    /// Stable event type identifier
    fn event_type(&self) -> &'static str;
}

/// Reserved event emitted instead of a domain event when a handler fails
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFailed<C> {
    /// The command that failed, as dispatched
    pub command: C,

    /// Human-readable explanation
    pub message: String,

    /// Machine-readable reason code
    pub reason: FailureReason,

    /// Store mutations the handler applied before failing
    ///
    /// Zero whenever the handler validated before mutating. A non-zero value
    /// means the store kept a partial update.
    pub mutations_applied: usize,
}

/// What an [`Event`] reports
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventBody<C, E> {
    /// Processing of a command began
    Started {
        /// The command being processed
        command: C,
    },

    /// The command succeeded; the handler's primary (or nested) event
    Domain(E),

    /// The command failed
    Failed(CommandFailed<C>),

    /// The command's coordinated work was superseded or explicitly canceled
    Canceled {
        /// The command whose work was abandoned
        command: C,
    },
}

/// Delivery metadata attached by the emitter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Position in the global emission order, strictly increasing
    pub sequence: u64,

    /// Time the event was accepted by the emitter
    pub emitted_at: DateTime<Utc>,
}

/// An immutable event as seen by listeners
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event<C, E> {
    /// What happened
    pub body: EventBody<C, E>,

    /// Correlation id of the command that produced this event
    pub correlation_id: Option<CorrelationId>,

    /// Delivery metadata
    pub context: EventContext,
}

impl<C, E> Event<C, E>
where
    C: Command,
    E: DomainEvent,
{
    /// Type identifier of this event
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match &self.body {
            EventBody::Started { .. } => COMMAND_STARTED,
            EventBody::Domain(event) => event.event_type(),
            EventBody::Failed(_) => COMMAND_FAILED,
            EventBody::Canceled { .. } => COMMAND_CANCELED,
        }
    }

    /// The domain event, if this is one
    #[must_use]
    pub const fn domain(&self) -> Option<&E> {
        match &self.body {
            EventBody::Domain(event) => Some(event),
            _ => None,
        }
    }

    /// The failure, if this is a `CommandFailed`
    #[must_use]
    pub const fn failure(&self) -> Option<&CommandFailed<C>> {
        match &self.body {
            EventBody::Failed(failed) => Some(failed),
            _ => None,
        }
    }

    /// Whether this event reports a failed command
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.body, EventBody::Failed(_))
    }

    /// Whether this event reports a canceled command
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self.body, EventBody::Canceled { .. })
    }

    /// Whether this is the lifecycle "started" event
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self.body, EventBody::Started { .. })
    }

    /// Whether this event answers the command with `correlation_id`
    ///
    /// The started event does not count as an answer.
    #[must_use]
    pub fn answers(&self, correlation_id: &CorrelationId) -> bool {
        !self.is_started() && self.correlation_id.as_ref() == Some(correlation_id)
    }
}
