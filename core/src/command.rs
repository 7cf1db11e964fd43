//! Commands, correlation ids and the envelope the dispatcher receives.
//!
//! A command is an immutable description of intent. It never touches state
//! itself; the handler bound to its [`Command::kind`] does. The envelope adds
//! the routing metadata that is not part of the intent: the correlation id
//! and whether the caller accepts more than one event in answer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed request to change state
///
/// `kind()` is the stable type identifier handlers are bound by. It is part
/// of the external contract, so implementations return string literals.
pub trait Command: Clone + fmt::Debug + Send + Sync + 'static {
    /// Stable command type identifier
    fn kind(&self) -> &'static str;
}

/// Identifier linking a command to the events it produced
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wrap a caller-supplied id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id starts with `prefix`
    ///
    /// Multi-command interactions (drag then drop) share a prefix so undo can
    /// treat them as one unit.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A command plus its dispatch metadata
#[derive(Clone, Debug)]
pub struct CommandEnvelope<C> {
    /// The intent
    pub command: C,

    /// Caller-supplied correlation id; the engine generates one when absent
    pub correlation_id: Option<CorrelationId>,

    /// Emit events of nested commands in addition to the primary event
    ///
    /// Off by default: a caller sees exactly one answer per command.
    pub emit_nested_events: bool,
}

impl<C: Command> CommandEnvelope<C> {
    /// Wrap a command without a correlation id
    #[must_use]
    pub const fn new(command: C) -> Self {
        Self {
            command,
            correlation_id: None,
            emit_nested_events: false,
        }
    }

    /// Attach a correlation id
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Opt into receiving the events of nested commands as well
    #[must_use]
    pub const fn with_nested_events(mut self) -> Self {
        self.emit_nested_events = true;
        self
    }

    /// Type identifier of the wrapped command
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.command.kind()
    }
}

impl<C: Command> From<C> for CommandEnvelope<C> {
    fn from(command: C) -> Self {
        Self::new(command)
    }
}
