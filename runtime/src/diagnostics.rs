//! Diagnostic sink for failures that must not stop the engine.
//!
//! A listener that returns an error or panics, or a handler that failed after
//! it already mutated the store, is recorded here instead of being raised.
//! The sink is bounded (oldest entries dropped when full) and shared between
//! all clones of an engine.
//!
//! # Example
//!
//! ```
//! use dashflow_runtime::{DiagnosticKind, DiagnosticsSink};
//!
//! let sink = DiagnosticsSink::new(2);
//! sink.push(DiagnosticKind::ListenerFailed, "GDC.DASH/EVT.X", "boom");
//! assert_eq!(sink.len(), 1);
//!
//! for entry in sink.drain() {
//!     println!("{}: {}", entry.kind, entry.message);
//! }
//! assert!(sink.is_empty());
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A listener returned an error
    ListenerFailed,
    /// A listener panicked
    ListenerPanicked,
    /// A handler failed after applying store mutations
    PartialMutation,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListenerFailed => write!(f, "listener-failed"),
            Self::ListenerPanicked => write!(f, "listener-panicked"),
            Self::PartialMutation => write!(f, "partial-mutation"),
        }
    }
}

/// A recorded diagnostic
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// What went wrong
    pub kind: DiagnosticKind,

    /// Event type or command kind the failure happened for
    pub subject: &'static str,

    /// Error message or panic payload
    pub message: String,

    /// When the diagnostic was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Bounded, shared diagnostic sink
///
/// # Features
///
/// - Bounded queue with configurable max size
/// - FIFO ordering (oldest entries dropped when full)
/// - Thread-safe for concurrent access
#[derive(Debug)]
pub struct DiagnosticsSink {
    queue: Arc<Mutex<VecDeque<Diagnostic>>>,
    max_size: usize,
}

impl DiagnosticsSink {
    /// Create a sink holding at most `max_size` entries
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            max_size,
        }
    }

    /// Record a diagnostic
    ///
    /// If the sink is full, the oldest entry is dropped.
    pub fn push(&self, kind: DiagnosticKind, subject: &'static str, message: impl Into<String>) {
        let message = message.into();
        let mut queue = self.queue.lock();

        if queue.len() >= self.max_size {
            queue.pop_front();
            metrics::counter!("diagnostics.dropped").increment(1);
        }

        tracing::warn!(%kind, subject, message = %message, "Diagnostic recorded");
        queue.push_back(Diagnostic {
            kind,
            subject,
            message,
            recorded_at: Utc::now(),
        });

        // Queue size is bounded by max_size, well within f64's exact range
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("diagnostics.size").set(queue.len() as f64);
        metrics::counter!("diagnostics.recorded", "kind" => kind.to_string()).increment(1);
    }

    /// Current number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Check if the sink is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return all entries, oldest first
    pub fn drain(&self) -> Vec<Diagnostic> {
        let entries: Vec<_> = self.queue.lock().drain(..).collect();
        metrics::gauge!("diagnostics.size").set(0.0);
        entries
    }

    /// Copy of all entries without removing them
    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Peek at the oldest entry
    #[must_use]
    pub fn peek(&self) -> Option<Diagnostic> {
        self.queue.lock().front().cloned()
    }

    /// Maximum number of entries kept
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Clone for DiagnosticsSink {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            max_size: self.max_size,
        }
    }
}

impl Default for DiagnosticsSink {
    fn default() -> Self {
        Self::new(1000)
    }
}
