//! Superseding-request coordinator.
//!
//! [`Coordinator::run`] executes a unit of work under a logical key. Each run
//! is a new *generation* of that key with its own [`CancellationToken`].
//! Starting a run for a key that is still running cancels the previous
//! generation's token: last request wins. [`Coordinator::cancel`] does the
//! same without starting anything.
//!
//! A canceled run resolves to [`RunOutcome::Canceled`] as soon as its token
//! fires, whether or not the work itself observes the token; work that
//! cannot be interrupted keeps running in the background only until its
//! next await point, and its result is discarded.
//!
//! Per key generation exactly one terminal [`Transition`] is broadcast, and
//! the generation is removed from the bookkeeping, even if the caller drops
//! the run future early.
//!
//! # Example
//!
//! ```
//! use dashflow_runtime::{Coordinator, RunOutcome};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let coordinator = Coordinator::new(16);
//!
//! let outcome: RunOutcome<u32, String> = coordinator
//!     .run("loadElements:f1", |_token| async { Ok(42) })
//!     .await;
//!
//! assert!(matches!(outcome, RunOutcome::Succeeded(42)));
//! assert!(!coordinator.is_running("loadElements:f1"));
//! # }
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Terminal result of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T, E> {
    /// The work finished successfully and was not superseded
    Succeeded(T),
    /// The work failed and was not superseded
    Failed(E),
    /// The run was superseded or explicitly canceled
    Canceled,
}

impl<T, E> RunOutcome<T, E> {
    /// Whether the run was canceled
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Convert into a `Result`, mapping cancellation with `canceled`
    ///
    /// # Errors
    ///
    /// Returns the work's error, or `canceled()` for a canceled run.
    pub fn into_result(self, canceled: impl FnOnce() -> E) -> Result<T, E> {
        match self {
            Self::Succeeded(value) => Ok(value),
            Self::Failed(error) => Err(error),
            Self::Canceled => Err(canceled()),
        }
    }
}

/// Per-key state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Work in flight
    Running,
    /// Terminal: success
    Succeeded,
    /// Terminal: failure
    Failed,
    /// Terminal: superseded or canceled
    Canceled,
}

impl RunState {
    /// Whether this is a terminal state
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// A state change of one key generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Logical key
    pub key: String,
    /// Generation of the key the transition belongs to
    pub generation: u64,
    /// New state
    pub state: RunState,
}

struct Running {
    generation: u64,
    token: CancellationToken,
}

struct CoordinatorInner {
    running: Mutex<HashMap<String, Running>>,
    next_generation: AtomicU64,
    transitions: broadcast::Sender<Transition>,
}

impl CoordinatorInner {
    fn signal(&self, key: &str, generation: u64, state: RunState) {
        tracing::debug!(key, generation, state = state.as_str(), "Coordinator transition");
        if state.is_terminal() {
            metrics::counter!("coordinator.runs", "outcome" => state.as_str()).increment(1);
        }
        // No receivers is fine
        let _ = self.transitions.send(Transition {
            key: key.to_string(),
            generation,
            state,
        });
    }

    fn release(&self, key: &str, generation: u64) {
        let mut running = self.running.lock();
        if running.get(key).is_some_and(|r| r.generation == generation) {
            running.remove(key);
        }
    }
}

/// Releases a generation and reports it canceled if its run future is
/// dropped before reaching a terminal state
struct GenerationGuard<'a> {
    inner: &'a CoordinatorInner,
    key: &'a str,
    generation: u64,
    finished: bool,
}

impl GenerationGuard<'_> {
    fn finish(mut self, state: RunState) {
        self.finished = true;
        self.inner.release(self.key, self.generation);
        self.inner.signal(self.key, self.generation, state);
    }
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.release(self.key, self.generation);
            self.inner.signal(self.key, self.generation, RunState::Canceled);
        }
    }
}

/// Last-request-wins execution per logical key
///
/// Cloning yields another handle to the same coordinator.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

impl Coordinator {
    /// Create a coordinator whose transition broadcast buffers `capacity` signals
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (transitions, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(CoordinatorInner {
                running: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                transitions,
            }),
        }
    }

    /// Run `work` as the newest generation of `key`
    ///
    /// Any generation of `key` still running is canceled first. `work`
    /// receives this generation's token; long-running work should check it
    /// or race against `token.cancelled()` to stop early.
    pub async fn run<T, E, F, Fut>(&self, key: impl Into<String>, work: F) -> RunOutcome<T, E>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.into();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let superseded = self.inner.running.lock().insert(
            key.clone(),
            Running {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = superseded {
            tracing::debug!(
                key = %key,
                superseded = previous.generation,
                generation,
                "Superseding running generation"
            );
            previous.token.cancel();
        }

        let guard = GenerationGuard {
            inner: &self.inner,
            key: &key,
            generation,
            finished: false,
        };
        self.inner.signal(&key, generation, RunState::Running);

        let result = tokio::select! {
            biased;
            () = token.cancelled() => None,
            result = work(token.clone()) => Some(result),
        };

        // Work that completed in the same poll as its cancellation still
        // counts as canceled.
        let outcome = match result {
            Some(_) if token.is_cancelled() => RunOutcome::Canceled,
            Some(Ok(value)) => RunOutcome::Succeeded(value),
            Some(Err(error)) => RunOutcome::Failed(error),
            None => RunOutcome::Canceled,
        };

        guard.finish(match &outcome {
            RunOutcome::Succeeded(_) => RunState::Succeeded,
            RunOutcome::Failed(_) => RunState::Failed,
            RunOutcome::Canceled => RunState::Canceled,
        });
        outcome
    }

    /// Cancel the running generation of `key`
    ///
    /// Returns `false` if nothing was running under `key`.
    pub fn cancel(&self, key: &str) -> bool {
        let removed = self.inner.running.lock().remove(key);
        removed.is_some_and(|running| {
            tracing::debug!(key, generation = running.generation, "Canceling generation");
            running.token.cancel();
            true
        })
    }

    /// Cancel every running generation
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Running> = self.inner.running.lock().drain().map(|(_, r)| r).collect();
        for running in &drained {
            running.token.cancel();
        }
        drained.len()
    }

    /// Whether a generation of `key` is running
    #[must_use]
    pub fn is_running(&self, key: &str) -> bool {
        self.inner.running.lock().contains_key(key)
    }

    /// Keys with a running generation, sorted
    #[must_use]
    pub fn active(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.running.lock().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Subscribe to state transitions
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.inner.transitions.subscribe()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(256)
    }
}
