//! Event recording for engine tests
//!
//! [`EventRecorder`] subscribes to every event of an engine and keeps them,
//! together with the revision of the snapshot each was delivered with.

use dashflow_core::{CorrelationId, Domain, FailureReason};
use dashflow_runtime::{Engine, EventOf, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every delivered event of an engine
///
/// # Example
///
/// ```ignore
/// let recorder = EventRecorder::attach(&engine);
/// let outcome = engine.dispatch(command).await;
/// engine.emitter().flush().await?;
///
/// assert_eq!(recorder.answers_for(&outcome.correlation_id).len(), 1);
/// ```
pub struct EventRecorder<D: Domain> {
    events: Arc<Mutex<Vec<(EventOf<D>, u64)>>>,
    subscription: Subscription<D>,
}

impl<D: Domain> EventRecorder<D> {
    /// Subscribe a recorder to all events of `engine`
    #[must_use]
    pub fn attach(engine: &Engine<D>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = engine.subscribe(
            |_| true,
            move |event, snapshot| {
                sink.lock().push((event.clone(), snapshot.revision()));
                Ok(())
            },
        );
        Self {
            events,
            subscription,
        }
    }

    /// All recorded events, in delivery order
    #[must_use]
    pub fn events(&self) -> Vec<EventOf<D>> {
        self.events.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    /// Types of all recorded events, in delivery order
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|(e, _)| e.event_type()).collect()
    }

    /// Recorded events answering the command with `correlation_id`
    ///
    /// Lifecycle `Started` events are not answers.
    #[must_use]
    pub fn answers_for(&self, correlation_id: &CorrelationId) -> Vec<EventOf<D>> {
        self.events
            .lock()
            .iter()
            .filter(|(e, _)| e.answers(correlation_id))
            .map(|(e, _)| e.clone())
            .collect()
    }

    /// Reason codes of all recorded failures
    #[must_use]
    pub fn failure_reasons(&self) -> Vec<FailureReason> {
        self.events
            .lock()
            .iter()
            .filter_map(|(e, _)| e.failure().map(|f| f.reason))
            .collect()
    }

    /// Store revisions of the snapshots the events were delivered with
    #[must_use]
    pub fn snapshot_revisions(&self) -> Vec<u64> {
        self.events.lock().iter().map(|(_, r)| *r).collect()
    }

    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Stop recording
    pub fn detach(self) -> bool {
        self.subscription.unsubscribe()
    }
}

/// Helper assertions for recorded events
pub mod assertions {
    use super::EventOf;
    use dashflow_core::{Domain, FailureReason};

    /// Assert that `events` holds exactly one failure, with `reason`
    ///
    /// # Panics
    ///
    /// Panics if the number of failures is not one or the reason differs.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_single_failure<D: Domain>(events: &[EventOf<D>], reason: FailureReason) {
        let failures: Vec<_> = events.iter().filter_map(|e| e.failure()).collect();
        assert_eq!(
            failures.len(),
            1,
            "Expected exactly one CommandFailed, but found {}: {:?}",
            failures.len(),
            failures
        );
        assert_eq!(failures[0].reason, reason);
    }

    /// Assert that sequence numbers strictly increase
    ///
    /// # Panics
    ///
    /// Panics on the first out-of-order pair.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_in_sequence<D: Domain>(events: &[EventOf<D>]) {
        for pair in events.windows(2) {
            assert!(
                pair[0].context.sequence < pair[1].context.sequence,
                "Events out of order: {} then {}",
                pair[0].context.sequence,
                pair[1].context.sequence
            );
        }
    }
}
