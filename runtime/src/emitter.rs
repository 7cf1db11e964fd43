//! Ordered event delivery.
//!
//! Every event goes through one unbounded channel to a single delivery task.
//! The task handles events strictly in the order they were emitted: it
//! assigns the sequence number, takes one [`StateSnapshot`] of the store,
//! and runs every listener whose predicate matches, all with that same
//! snapshot, before it looks at the next event.
//!
//! Listeners are isolated from each other: an `Err` or a panic is recorded
//! in the [`DiagnosticsSink`] and delivery carries on with the next listener.
//!
//! After all listeners ran, the event is re-broadcast on a
//! `tokio::sync::broadcast` channel for anything that wants a stream of
//! delivered events ([`EventEmitter::delivered`]). A slow receiver of that
//! stream can lag and lose events, so `dispatch_and_wait` does not rely on
//! it: the answer it waits for is emitted with [`EventEmitter::emit_tracked`]
//! and handed back over its own oneshot channel.

use crate::diagnostics::{DiagnosticKind, DiagnosticsSink};
use crate::error::EngineError;
use crate::store::{StateSnapshot, Store};
use dashflow_core::environment::Clock;
use dashflow_core::{CorrelationId, Domain, Event, EventBody, EventContext};
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};

/// The event type delivered for domain `D`
pub type EventOf<D> = Event<<D as Domain>::Command, <D as Domain>::Event>;

/// Event body type for domain `D`
pub type EventBodyOf<D> = EventBody<<D as Domain>::Command, <D as Domain>::Event>;

type Predicate<D> = Arc<dyn Fn(&EventOf<D>) -> bool + Send + Sync>;
type Listener<D> =
    Arc<dyn Fn(&EventOf<D>, &StateSnapshot<<D as Domain>::State>) -> anyhow::Result<()> + Send + Sync>;

struct Registered<D: Domain> {
    id: u64,
    predicate: Predicate<D>,
    listener: Listener<D>,
}

impl<D: Domain> Clone for Registered<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            predicate: Arc::clone(&self.predicate),
            listener: Arc::clone(&self.listener),
        }
    }
}

struct Listeners<D: Domain> {
    registered: RwLock<Vec<Registered<D>>>,
    next_id: AtomicU64,
}

enum Message<D: Domain> {
    Deliver {
        body: EventBodyOf<D>,
        correlation_id: Option<CorrelationId>,
        receipt: Option<oneshot::Sender<EventOf<D>>>,
    },
    Flush(oneshot::Sender<()>),
}

/// Handle returned by [`EventEmitter::subscribe`]
///
/// Dropping it keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription<D: Domain> {
    id: u64,
    listeners: std::sync::Weak<Listeners<D>>,
}

impl<D: Domain> Subscription<D> {
    /// Remove the listener
    ///
    /// Returns `false` if it was already removed or the emitter is gone.
    /// An event already being delivered may still reach the listener.
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut registered = listeners.registered.write();
        let before = registered.len();
        registered.retain(|r| r.id != self.id);
        registered.len() != before
    }
}

impl<D: Domain> std::fmt::Debug for Subscription<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Single ordered event channel
///
/// Cloning yields another handle to the same channel. The delivery task
/// ends once every handle is dropped.
pub struct EventEmitter<D: Domain> {
    sender: mpsc::UnboundedSender<Message<D>>,
    listeners: Arc<Listeners<D>>,
    delivered: broadcast::Sender<EventOf<D>>,
    closed: Arc<AtomicBool>,
}

impl<D: Domain> Clone for EventEmitter<D> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            listeners: Arc::clone(&self.listeners),
            delivered: self.delivered.clone(),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<D: Domain> EventEmitter<D> {
    /// Create an emitter delivering snapshots of `store`
    ///
    /// Spawns the delivery task, so it must be called within a Tokio runtime.
    #[must_use]
    pub fn new(
        store: Store<D>,
        clock: Arc<dyn Clock>,
        diagnostics: DiagnosticsSink,
        broadcast_capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (delivered, _) = broadcast::channel(broadcast_capacity.max(1));
        let listeners = Arc::new(Listeners {
            registered: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        });

        let task = DeliveryTask {
            receiver,
            store,
            clock,
            diagnostics,
            listeners: Arc::clone(&listeners),
            delivered: delivered.clone(),
            sequence: 0,
        };
        tokio::spawn(task.run());

        Self {
            sender,
            listeners,
            delivered,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue an event for delivery
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ShutdownInProgress`] after [`Self::close`] and
    /// [`EngineError::ChannelClosed`] if the delivery task is gone.
    pub fn emit(
        &self,
        body: EventBodyOf<D>,
        correlation_id: Option<CorrelationId>,
    ) -> Result<(), EngineError> {
        self.send(body, correlation_id, None)
    }

    /// Queue an event and get it back once every listener has seen it
    ///
    /// # Errors
    ///
    /// Same as [`Self::emit`].
    pub fn emit_tracked(
        &self,
        body: EventBodyOf<D>,
        correlation_id: Option<CorrelationId>,
    ) -> Result<oneshot::Receiver<EventOf<D>>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(body, correlation_id, Some(tx))?;
        Ok(rx)
    }

    fn send(
        &self,
        body: EventBodyOf<D>,
        correlation_id: Option<CorrelationId>,
        receipt: Option<oneshot::Sender<EventOf<D>>>,
    ) -> Result<(), EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::ShutdownInProgress);
        }
        self.sender
            .send(Message::Deliver {
                body,
                correlation_id,
                receipt,
            })
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Register a listener for events matching `predicate`
    pub fn subscribe<P, L>(&self, predicate: P, listener: L) -> Subscription<D>
    where
        P: Fn(&EventOf<D>) -> bool + Send + Sync + 'static,
        L: Fn(&EventOf<D>, &StateSnapshot<D::State>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.registered.write().push(Registered {
            id,
            predicate: Arc::new(predicate),
            listener: Arc::new(listener),
        });
        tracing::debug!(listener = id, "Listener subscribed");

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.registered.read().len()
    }

    /// Stream of events after delivery to all listeners
    ///
    /// Only events emitted after this call are received.
    #[must_use]
    pub fn delivered(&self) -> broadcast::Receiver<EventOf<D>> {
        self.delivered.subscribe()
    }

    /// Wait until every event emitted before this call has been delivered
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChannelClosed`] if the delivery task is gone.
    pub async fn flush(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Message::Flush(tx))
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Stop accepting events; already queued events are still delivered
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether [`Self::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct DeliveryTask<D: Domain> {
    receiver: mpsc::UnboundedReceiver<Message<D>>,
    store: Store<D>,
    clock: Arc<dyn Clock>,
    diagnostics: DiagnosticsSink,
    listeners: Arc<Listeners<D>>,
    delivered: broadcast::Sender<EventOf<D>>,
    sequence: u64,
}

impl<D: Domain> DeliveryTask<D> {
    async fn run(mut self) {
        while let Some(message) = self.receiver.recv().await {
            match message {
                Message::Deliver {
                    body,
                    correlation_id,
                    receipt,
                } => {
                    let event = self.deliver(body, correlation_id);
                    if let Some(receipt) = receipt {
                        let _ = receipt.send(event);
                    }
                },
                Message::Flush(ack) => {
                    let _ = ack.send(());
                },
            }
        }
        tracing::debug!(delivered = self.sequence, "Event delivery task stopped");
    }

    fn deliver(&mut self, body: EventBodyOf<D>, correlation_id: Option<CorrelationId>) -> EventOf<D> {
        self.sequence += 1;
        let event = Event {
            body,
            correlation_id,
            context: EventContext {
                sequence: self.sequence,
                emitted_at: self.clock.now(),
            },
        };
        let event_type = event.event_type();
        let snapshot = self.store.snapshot();

        // Cloned so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Registered<D>> = self.listeners.registered.read().clone();

        let mut invoked = 0_u64;
        for registered in &listeners {
            if !(registered.predicate)(&event) {
                continue;
            }
            invoked += 1;

            match catch_unwind(AssertUnwindSafe(|| (registered.listener)(&event, &snapshot))) {
                Ok(Ok(())) => {},
                Ok(Err(error)) => {
                    metrics::counter!("emitter.listener.failures").increment(1);
                    self.diagnostics.push(
                        DiagnosticKind::ListenerFailed,
                        event_type,
                        format!("listener {}: {error:#}", registered.id),
                    );
                },
                Err(panic) => {
                    metrics::counter!("emitter.listener.failures").increment(1);
                    self.diagnostics.push(
                        DiagnosticKind::ListenerPanicked,
                        event_type,
                        format!("listener {}: {}", registered.id, panic_message(&*panic)),
                    );
                },
            }
        }

        tracing::trace!(
            event = event_type,
            sequence = self.sequence,
            revision = snapshot.revision(),
            listeners = invoked,
            "Event delivered"
        );
        metrics::counter!("emitter.events.delivered").increment(1);

        // No receivers is fine
        let _ = self.delivered.send(event.clone());
        event
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
