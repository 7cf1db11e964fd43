//! Prometheus metrics for observability and monitoring.
//!
//! The runtime records through the `metrics` facade; nothing is exported
//! until a recorder is installed. [`MetricsRecorder`] installs the Prometheus
//! recorder and renders the scrape text.
//!
//! Metric families:
//! - Dispatch: `engine.commands.total`, `engine.commands.failed`,
//!   `engine.command.duration_seconds`
//! - Store: `store.actions.applied`, `store.undo.applied`
//! - Query cache: `query.cache.hits`, `query.cache.misses`, `query.failures`
//! - Coordinator: `coordinator.runs` (labelled by outcome)
//! - Emitter: `emitter.events.delivered`, `emitter.listener.failures`
//! - Diagnostics: `diagnostics.recorded`, `diagnostics.dropped`, `diagnostics.size`
//!
//! # Example
//!
//! ```rust,no_run
//! use dashflow_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... run the engine ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Process-wide Prometheus recorder
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that is not installed yet
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe all metrics and install the Prometheus recorder globally.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this
    /// logs a warning and leaves [`Self::render`] returning `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                describe_metrics();
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was not the one installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions with the installed recorder.
pub fn describe_metrics() {
    // Dispatch
    describe_counter!("engine.commands.total", "Total number of commands dispatched");
    describe_counter!(
        "engine.commands.failed",
        "Commands answered with CommandFailed, by reason"
    );
    describe_histogram!(
        "engine.command.duration_seconds",
        "Time from dispatch to the answering event being queued"
    );

    // Store
    describe_counter!("store.actions.applied", "Reducer actions applied to the store");
    describe_counter!("store.undo.applied", "Undo operations applied to the store");

    // Query cache
    describe_counter!("query.cache.hits", "Query calls served by an existing entry");
    describe_counter!("query.cache.misses", "Query calls that started a worker");
    describe_counter!("query.failures", "Query workers that failed");

    // Coordinator
    describe_counter!("coordinator.runs", "Terminal coordinator transitions, by outcome");

    // Emitter
    describe_counter!("emitter.events.delivered", "Events delivered to listeners");
    describe_counter!(
        "emitter.listener.failures",
        "Listener invocations that failed or panicked"
    );

    // Diagnostics
    describe_counter!("diagnostics.recorded", "Diagnostics recorded, by kind");
    describe_counter!("diagnostics.dropped", "Diagnostics dropped at capacity");
    describe_gauge!("diagnostics.size", "Current number of stored diagnostics");
}
