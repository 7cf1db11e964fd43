//! Command dispatcher, handlers and the handler context.
//!
//! An [`Engine`] binds every command kind to exactly one [`Handler`]. A
//! handler is a cooperative routine: it reads the store, suspends on the
//! query cache, the coordinator or a backend, writes the store through
//! reducer actions, and returns the one primary event of its command.
//!
//! The handler runs in the task that called [`Engine::dispatch`]; many
//! dispatches can be in flight at once, and only their store writes are
//! serialized. Whatever a handler does, dispatch resolves to an event body:
//!
//! | Handler result | Emitted |
//! |---|---|
//! | `Ok(event)` | `EventBody::Domain(event)` |
//! | `Err(HandlerError::Canceled)` | `EventBody::Canceled` |
//! | any other `Err` | `EventBody::Failed` with the error's reason code |
//! | panic | `EventBody::Failed` with `internal-error` |
//! | no handler bound | `EventBody::Failed` with `unhandled-command` |
//!
//! # Example
//!
//! ```ignore
//! use dashflow_runtime::{Engine, handler_fn};
//!
//! let engine = Engine::<Dashboard>::builder(DashboardState::default(), dashboard_reducer())
//!     .handler(RENAME_DASHBOARD, handler_fn(|ctx, command| async move {
//!         // validate, then put
//!         Ok(DashboardEvent::Renamed { .. })
//!     }))?
//!     .build();
//!
//! let outcome = engine.dispatch(DashboardCommand::rename("Sales")).await;
//! ```

use crate::config::EngineConfig;
use crate::coordinator::{Coordinator, RunOutcome};
use crate::diagnostics::{DiagnosticKind, DiagnosticsSink};
use crate::emitter::{EventBodyOf, EventEmitter, EventOf, Subscription, panic_message};
use crate::error::EngineError;
use crate::health::{Component, HealthCheck, HealthReport, HealthStatus};
use crate::query::QueryRegistry;
use crate::store::{StateSnapshot, Store};
use crate::undo::UndoPoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashflow_core::environment::{Clock, SystemClock};
use dashflow_core::query::QueryOutput;
use dashflow_core::{
    Command, CommandEnvelope, CommandFailed, CorrelationId, Domain, DomainEvent, EventBody,
    FailureReason, HandlerError, Query, UndoDescriptor,
};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Maximum depth of nested command composition
pub const MAX_NESTING_DEPTH: usize = 8;

/// A command handler
///
/// # Example
///
/// ```ignore
/// struct RenameDashboardHandler;
///
/// #[async_trait]
/// impl Handler<Dashboard> for RenameDashboardHandler {
///     async fn handle(
///         &self,
///         ctx: HandlerContext<Dashboard>,
///         command: DashboardCommand,
///     ) -> Result<DashboardEvent, HandlerError> {
///         let DashboardCommand::RenameDashboard { title } = command else {
///             return Err(HandlerError::Internal("unexpected command".into()));
///         };
///         let before = ctx.select(|s| s.meta.title.clone());
///         ctx.put(DashboardAction::Meta(MetaAction::Rename(title.clone())));
///         Ok(DashboardEvent::DashboardRenamed { before, after: title })
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<D: Domain>: Send + Sync + 'static {
    /// Process `command` and return its primary event
    ///
    /// Validate every precondition before the first `ctx.put`.
    async fn handle(
        &self,
        ctx: HandlerContext<D>,
        command: D::Command,
    ) -> Result<D::Event, HandlerError>;
}

/// Handler built from an async closure; see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

/// Build a handler from an async closure
#[must_use]
pub const fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler { f }
}

#[async_trait]
impl<D, F, Fut> Handler<D> for FnHandler<F>
where
    D: Domain,
    F: Fn(HandlerContext<D>, D::Command) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<D::Event, HandlerError>> + Send + 'static,
{
    async fn handle(
        &self,
        ctx: HandlerContext<D>,
        command: D::Command,
    ) -> Result<D::Event, HandlerError> {
        (self.f)(ctx, command).await
    }
}

/// What a dispatched command resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome<C, E> {
    /// Correlation id the answering event carries
    pub correlation_id: CorrelationId,
    /// The answering event's body
    pub body: EventBody<C, E>,
}

impl<C, E> CommandOutcome<C, E> {
    /// The domain event, if the command succeeded
    #[must_use]
    pub const fn domain(&self) -> Option<&E> {
        match &self.body {
            EventBody::Domain(event) => Some(event),
            _ => None,
        }
    }

    /// The failure, if the command failed
    #[must_use]
    pub const fn failure(&self) -> Option<&CommandFailed<C>> {
        match &self.body {
            EventBody::Failed(failed) => Some(failed),
            _ => None,
        }
    }

    /// Whether the command failed
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.body, EventBody::Failed(_))
    }

    /// Whether the command was canceled
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self.body, EventBody::Canceled { .. })
    }
}

/// Outcome type for domain `D`
pub type OutcomeOf<D> = CommandOutcome<<D as Domain>::Command, <D as Domain>::Event>;

struct EngineInner<D: Domain> {
    handlers: HashMap<&'static str, Arc<dyn Handler<D>>>,
    store: Store<D>,
    queries: QueryRegistry,
    coordinator: Coordinator,
    emitter: EventEmitter<D>,
    diagnostics: DiagnosticsSink,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    shutdown: AtomicBool,
}

/// The command/event engine
///
/// Cloning yields another handle to the same engine.
pub struct Engine<D: Domain> {
    inner: Arc<EngineInner<D>>,
}

impl<D: Domain> Clone for Engine<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder<D: Domain> {
    initial_state: D::State,
    reducer: D::Reducer,
    handlers: HashMap<&'static str, Arc<dyn Handler<D>>>,
    queries: QueryRegistry,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl<D: Domain> EngineBuilder<D> {
    /// Use a custom configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom clock for event timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bind `handler` to command kind `kind`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateHandler`] if `kind` is already bound.
    pub fn handler(mut self, kind: &'static str, handler: impl Handler<D>) -> Result<Self, EngineError> {
        if self.handlers.contains_key(kind) {
            return Err(EngineError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, Arc::new(handler));
        Ok(self)
    }

    /// Register a cached query
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateQuery`] if the query name is taken.
    pub fn query<Q: Query>(mut self, query: Q) -> Result<Self, EngineError> {
        self.queries.register(query)?;
        Ok(self)
    }

    /// Build the engine
    ///
    /// Spawns the event delivery task, so it must be called within a Tokio
    /// runtime.
    #[must_use]
    pub fn build(self) -> Engine<D> {
        let config = self.config;
        let store = Store::new(self.initial_state, self.reducer, config.undo_capacity);
        let diagnostics = DiagnosticsSink::new(config.diagnostics_capacity);
        let emitter = EventEmitter::new(
            store.clone(),
            Arc::clone(&self.clock),
            diagnostics.clone(),
            config.delivery_broadcast_capacity,
        );
        let coordinator = Coordinator::new(config.delivery_broadcast_capacity);

        tracing::info!(
            handlers = self.handlers.len(),
            queries = ?self.queries.names(),
            "Engine built"
        );

        Engine {
            inner: Arc::new(EngineInner {
                handlers: self.handlers,
                store,
                queries: self.queries,
                coordinator,
                emitter,
                diagnostics,
                clock: self.clock,
                config,
                shutdown: AtomicBool::new(false),
            }),
        }
    }
}

impl<D: Domain> Engine<D> {
    /// Start building an engine around the initial state and root reducer
    #[must_use]
    pub fn builder(initial_state: D::State, reducer: D::Reducer) -> EngineBuilder<D> {
        EngineBuilder {
            initial_state,
            reducer,
            handlers: HashMap::new(),
            queries: QueryRegistry::new(),
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Dispatch a command with a generated correlation id
    pub async fn dispatch(&self, command: D::Command) -> OutcomeOf<D> {
        self.dispatch_envelope(CommandEnvelope::new(command)).await
    }

    /// Dispatch a command envelope
    ///
    /// Resolves once the handler finished and its answering event was queued
    /// for delivery. Never fails: every problem becomes a `Failed` body.
    pub async fn dispatch_envelope(&self, envelope: CommandEnvelope<D::Command>) -> OutcomeOf<D> {
        self.process(envelope, false).await.0
    }

    /// Run a command to its answer; with `track`, also return a receiver
    /// for the answer once it was delivered
    #[tracing::instrument(
        skip_all,
        fields(command = envelope.kind(), correlation_id = tracing::field::Empty)
    )]
    async fn process(
        &self,
        envelope: CommandEnvelope<D::Command>,
        track: bool,
    ) -> (OutcomeOf<D>, Option<oneshot::Receiver<EventOf<D>>>) {
        let CommandEnvelope {
            command,
            correlation_id,
            emit_nested_events,
        } = envelope;
        let correlation_id = correlation_id.unwrap_or_else(CorrelationId::generate);
        tracing::Span::current().record("correlation_id", tracing::field::display(&correlation_id));

        let kind = command.kind();
        let started = Instant::now();
        metrics::counter!("engine.commands.total", "command" => kind).increment(1);

        if self.is_shut_down() {
            tracing::warn!("Command rejected, engine is shutting down");
            let outcome = CommandOutcome {
                correlation_id,
                body: EventBody::Failed(CommandFailed {
                    command,
                    message: "engine is shutting down".to_string(),
                    reason: FailureReason::InvalidState,
                    mutations_applied: 0,
                }),
            };
            return (outcome, None);
        }

        if self.inner.config.emit_command_started {
            self.emit(
                EventBody::Started {
                    command: command.clone(),
                },
                &correlation_id,
            );
        }

        let body = match self.inner.handlers.get(kind).cloned() {
            None => {
                tracing::error!("No handler registered for command");
                EventBody::Failed(CommandFailed {
                    message: format!("no handler registered for command {kind}"),
                    command,
                    reason: FailureReason::UnhandledCommand,
                    mutations_applied: 0,
                })
            },
            Some(handler) => {
                let ctx = HandlerContext {
                    engine: self.clone(),
                    command: command.clone(),
                    correlation_id: correlation_id.clone(),
                    emit_nested_events,
                    depth: 0,
                    mutations: Arc::new(AtomicUsize::new(0)),
                };
                let mutations = Arc::clone(&ctx.mutations);
                let result = AssertUnwindSafe(handler.handle(ctx, command.clone()))
                    .catch_unwind()
                    .await;
                self.settle(command, result, mutations.load(Ordering::Acquire))
            },
        };

        metrics::histogram!("engine.command.duration_seconds", "command" => kind)
            .record(started.elapsed().as_secs_f64());
        if let EventBody::Failed(failed) = &body {
            metrics::counter!(
                "engine.commands.failed",
                "command" => kind,
                "reason" => failed.reason.as_str()
            )
            .increment(1);
        }

        let receipt = if track {
            self.emit_tracked(body.clone(), &correlation_id)
        } else {
            self.emit(body.clone(), &correlation_id);
            None
        };
        let outcome = CommandOutcome {
            correlation_id,
            body,
        };
        (outcome, receipt)
    }

    /// Dispatch a command and wait until its answering event was delivered
    /// to every listener
    ///
    /// # Errors
    ///
    /// - [`EngineError::ShutdownInProgress`] after [`Self::shutdown`]
    /// - [`EngineError::Timeout`] when handler and delivery together take
    ///   longer than the configured dispatch timeout; the handler is then
    ///   dropped at its current suspension point
    /// - [`EngineError::ChannelClosed`] when the answer could not be queued
    ///   or the delivery task is gone
    pub async fn dispatch_and_wait(&self, command: D::Command) -> Result<EventOf<D>, EngineError> {
        self.dispatch_envelope_and_wait(CommandEnvelope::new(command))
            .await
    }

    /// Envelope form of [`Self::dispatch_and_wait`]
    ///
    /// # Errors
    ///
    /// Same as [`Self::dispatch_and_wait`].
    pub async fn dispatch_envelope_and_wait(
        &self,
        envelope: CommandEnvelope<D::Command>,
    ) -> Result<EventOf<D>, EngineError> {
        if self.is_shut_down() {
            return Err(EngineError::ShutdownInProgress);
        }

        let wait = async {
            let (_, receipt) = self.process(envelope, true).await;
            receipt
                .ok_or(EngineError::ChannelClosed)?
                .await
                .map_err(|_| EngineError::ChannelClosed)
        };

        tokio::time::timeout(self.inner.config.dispatch_timeout, wait)
            .await
            .map_err(|_| EngineError::Timeout)?
    }

    /// Register a listener for events matching `predicate`
    pub fn subscribe<P, L>(&self, predicate: P, listener: L) -> Subscription<D>
    where
        P: Fn(&EventOf<D>) -> bool + Send + Sync + 'static,
        L: Fn(&EventOf<D>, &StateSnapshot<D::State>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.emitter.subscribe(predicate, listener)
    }

    /// Register a listener for one event type
    pub fn subscribe_to<L>(&self, event_type: &'static str, listener: L) -> Subscription<D>
    where
        L: Fn(&EventOf<D>, &StateSnapshot<D::State>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(move |event| event.event_type() == event_type, listener)
    }

    /// The store
    #[must_use]
    pub fn store(&self) -> &Store<D> {
        &self.inner.store
    }

    /// The query caches
    #[must_use]
    pub fn queries(&self) -> &QueryRegistry {
        &self.inner.queries
    }

    /// The coordinator
    #[must_use]
    pub fn coordinator(&self) -> &Coordinator {
        &self.inner.coordinator
    }

    /// The event emitter
    #[must_use]
    pub fn emitter(&self) -> &EventEmitter<D> {
        &self.inner.emitter
    }

    /// The diagnostics sink
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticsSink {
        &self.inner.diagnostics
    }

    /// The configuration the engine was built with
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Whether `kind` has a handler
    #[must_use]
    pub fn handles(&self, kind: &str) -> bool {
        self.inner.handlers.contains_key(kind)
    }

    /// Whether [`Self::shutdown`] was called
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting commands
    ///
    /// Cancels every coordinated run, waits for queued events to be
    /// delivered, then closes the emitter. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChannelClosed`] if the delivery task is gone.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let canceled = self.inner.coordinator.cancel_all();
        tracing::info!(canceled_runs = canceled, "Engine shutting down");

        let flushed = self.inner.emitter.flush().await;
        self.inner.emitter.close();
        flushed
    }

    /// Health of the engine's components
    ///
    /// Shut down engines and closed emitters are unhealthy; the diagnostics
    /// sink is judged on how full it is.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let inner = &self.inner;
        let mut emitter = HealthCheck::new(Component::Emitter)
            .gauge("listeners", inner.emitter.listener_count());
        if inner.emitter.is_closed() {
            emitter = emitter.escalate(HealthStatus::Unhealthy, "emitter closed");
        }
        let mut coordinator = HealthCheck::new(Component::Coordinator)
            .gauge("active", inner.coordinator.active().len());
        if self.is_shut_down() {
            coordinator = coordinator.escalate(HealthStatus::Unhealthy, "engine shut down");
        }

        HealthReport::new(vec![
            HealthCheck::new(Component::Store).gauge("revision", inner.store.revision()),
            coordinator,
            emitter,
            HealthCheck::capacity(
                Component::Diagnostics,
                inner.diagnostics.len(),
                inner.diagnostics.max_size(),
            ),
        ])
    }

    fn emit(&self, body: EventBodyOf<D>, correlation_id: &CorrelationId) {
        if let Err(error) = self.inner.emitter.emit(body, Some(correlation_id.clone())) {
            tracing::warn!(%error, "Event dropped");
        }
    }

    fn emit_tracked(
        &self,
        body: EventBodyOf<D>,
        correlation_id: &CorrelationId,
    ) -> Option<oneshot::Receiver<EventOf<D>>> {
        self.inner
            .emitter
            .emit_tracked(body, Some(correlation_id.clone()))
            .inspect_err(|error| tracing::warn!(%error, "Event dropped"))
            .ok()
    }

    fn settle(
        &self,
        command: D::Command,
        result: Result<Result<D::Event, HandlerError>, Box<dyn std::any::Any + Send>>,
        mutations: usize,
    ) -> EventBodyOf<D> {
        match result {
            Ok(Ok(event)) => {
                tracing::debug!(event = event.event_type(), mutations, "Command succeeded");
                EventBody::Domain(event)
            },
            Ok(Err(HandlerError::Canceled)) => {
                tracing::debug!(mutations, "Command canceled");
                EventBody::Canceled { command }
            },
            Ok(Err(error)) => {
                let reason = error.reason().unwrap_or(FailureReason::Internal);
                self.failed(command, error.to_string(), reason, mutations)
            },
            Err(panic) => {
                let message = format!("handler panicked: {}", panic_message(&*panic));
                tracing::error!(%message, "Handler panicked");
                self.failed(command, message, FailureReason::Internal, mutations)
            },
        }
    }

    fn failed(
        &self,
        command: D::Command,
        message: String,
        reason: FailureReason,
        mutations_applied: usize,
    ) -> EventBodyOf<D> {
        if reason.is_user_error() {
            tracing::info!(%reason, %message, "Command rejected");
        } else {
            tracing::warn!(%reason, %message, "Command failed");
        }
        if mutations_applied > 0 {
            tracing::warn!(
                mutations_applied,
                "Command failed after mutating the store; partial update kept"
            );
            self.inner.diagnostics.push(
                DiagnosticKind::PartialMutation,
                command.kind(),
                format!("{mutations_applied} mutation(s) applied before failure: {message}"),
            );
        }
        EventBody::Failed(CommandFailed {
            command,
            message,
            reason,
            mutations_applied,
        })
    }
}

/// What a handler can do
///
/// Passed by value to every handler invocation; cheap to clone.
pub struct HandlerContext<D: Domain> {
    engine: Engine<D>,
    command: D::Command,
    correlation_id: CorrelationId,
    emit_nested_events: bool,
    depth: usize,
    mutations: Arc<AtomicUsize>,
}

impl<D: Domain> Clone for HandlerContext<D> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            command: self.command.clone(),
            correlation_id: self.correlation_id.clone(),
            emit_nested_events: self.emit_nested_events,
            depth: self.depth,
            mutations: Arc::clone(&self.mutations),
        }
    }
}

impl<D: Domain> HandlerContext<D> {
    /// The command being handled
    #[must_use]
    pub const fn command(&self) -> &D::Command {
        &self.command
    }

    /// Correlation id of the external command
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Nesting depth; 0 for the external command
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Store mutations issued so far by this command, nested commands included
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::Acquire)
    }

    /// Current time from the engine clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.engine.inner.clock.now()
    }

    /// Read a value from the current state
    pub fn select<T>(&self, f: impl FnOnce(&D::State) -> T) -> T {
        self.engine.inner.store.select(f)
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot<D::State> {
        self.engine.inner.store.snapshot()
    }

    /// Apply a mutation action
    pub fn put(&self, action: D::Action) -> u64 {
        self.mutations.fetch_add(1, Ordering::AcqRel);
        self.engine.inner.store.put(action)
    }

    /// Apply a mutation action and link it to the current command for undo
    pub fn put_with_undo(&self, action: D::Action) -> u64 {
        self.mutations.fetch_add(1, Ordering::AcqRel);
        let descriptor =
            UndoDescriptor::new(self.command.clone(), Some(self.correlation_id.clone()));
        self.engine.inner.store.put_with_undo(action, descriptor)
    }

    /// Revert `namespace` to before the commands selected by `point`
    ///
    /// Returns the descriptors of the reverted mutations, oldest first; empty
    /// when there was nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Internal`] when the namespace is not restorable.
    pub fn undo(
        &self,
        namespace: &str,
        point: &UndoPoint,
    ) -> Result<Vec<UndoDescriptor<D::Command>>, HandlerError> {
        let reverted = self
            .engine
            .inner
            .store
            .undo(namespace, point)
            .map_err(|e| HandlerError::Internal(e.to_string()))?;
        if !reverted.is_empty() {
            self.mutations.fetch_add(1, Ordering::AcqRel);
        }
        Ok(reverted.into_iter().map(|entry| entry.descriptor).collect())
    }

    /// Forget the undo history of `namespace`
    ///
    /// For commands that replace the namespace wholesale: earlier entries
    /// would restore state from before the replacement.
    pub fn clear_undo(&self, namespace: &str) -> usize {
        self.engine.inner.store.clear_undo(namespace)
    }

    /// Number of undoable mutations recorded for `namespace`
    #[must_use]
    pub fn undo_depth(&self, namespace: &str) -> usize {
        self.engine.inner.store.undo_history(namespace).len()
    }

    /// Run cached query `Q`
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Query`] when the query fails or is unknown.
    pub async fn query<Q: Query>(&self, params: Q::Params) -> Result<QueryOutput<Q>, HandlerError> {
        Ok(self.engine.inner.queries.query::<Q>(params).await?)
    }

    /// Drop the cache entry of query `Q` for `params`
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Query`] when the query is unknown or the
    /// parameters cannot form a cache key.
    pub fn invalidate_query<Q: Query>(&self, params: &Q::Params) -> Result<bool, HandlerError> {
        Ok(self.engine.inner.queries.cache::<Q>()?.invalidate(params)?)
    }

    /// Drop every cache entry of the named query
    pub fn reset_query(&self, name: &str) -> bool {
        self.engine.inner.queries.reset(name)
    }

    /// Run `work` under coordinator key `key`, superseding any running
    /// generation of it
    pub async fn run<T, E, F, Fut>(&self, key: impl Into<String>, work: F) -> RunOutcome<T, E>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.engine.inner.coordinator.run(key, work).await
    }

    /// Cancel the running generation of coordinator key `key`
    pub fn cancel(&self, key: &str) -> bool {
        self.engine.inner.coordinator.cancel(key)
    }

    /// Emit an additional event for the current command
    ///
    /// Only delivered when the caller opted into nested events; returns
    /// whether the event was queued.
    pub fn emit(&self, event: D::Event) -> bool {
        if !self.emit_nested_events {
            tracing::trace!(event = event.event_type(), "Additional event suppressed");
            return false;
        }
        self.engine.emit(EventBody::Domain(event), &self.correlation_id);
        true
    }

    /// Run the handler of `command` as a step of the current command
    ///
    /// The nested command shares this command's correlation id and mutation
    /// count. Its event is returned rather than emitted, unless the caller
    /// opted into nested events.
    ///
    /// # Errors
    ///
    /// Returns the nested handler's error, or [`HandlerError::Internal`] when
    /// no handler is bound or the nesting is too deep.
    pub async fn dispatch_nested(&self, command: D::Command) -> Result<D::Event, HandlerError> {
        let kind = command.kind();
        if self.depth + 1 >= MAX_NESTING_DEPTH {
            return Err(HandlerError::Internal(format!(
                "nesting depth {MAX_NESTING_DEPTH} exceeded by {kind}"
            )));
        }
        let handler = self
            .engine
            .inner
            .handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| {
                HandlerError::Internal(format!("no handler registered for nested command {kind}"))
            })?;

        tracing::debug!(parent = self.command.kind(), nested = kind, "Dispatching nested command");
        let child = Self {
            engine: self.engine.clone(),
            command: command.clone(),
            correlation_id: self.correlation_id.clone(),
            emit_nested_events: self.emit_nested_events,
            depth: self.depth + 1,
            mutations: Arc::clone(&self.mutations),
        };
        let before = self.mutations();
        let result = handler.handle(child, command.clone()).await;

        if self.emit_nested_events {
            let body = match &result {
                Ok(event) => EventBody::Domain(event.clone()),
                Err(HandlerError::Canceled) => EventBody::Canceled { command },
                Err(error) => EventBody::Failed(CommandFailed {
                    command,
                    message: error.to_string(),
                    reason: error.reason().unwrap_or(FailureReason::Internal),
                    mutations_applied: self.mutations().saturating_sub(before),
                }),
            };
            self.engine.emit(body, &self.correlation_id);
        }
        result
    }
}
