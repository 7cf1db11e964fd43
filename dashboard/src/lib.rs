//! # Dashflow Dashboard
//!
//! The dashboard domain on top of the Dashflow engine: a filter context, a
//! fluid layout with undo, a workspace catalog and per-filter attribute
//! elements.
//!
//! ## Example
//!
//! ```ignore
//! use dashflow_dashboard::{DashboardCommand, dashboard_engine, mock::MockBackend};
//! use dashflow_runtime::EngineConfig;
//! use std::sync::Arc;
//!
//! let engine = dashboard_engine(Arc::new(MockBackend::new()), EngineConfig::default())?;
//! let event = engine
//!     .dispatch_and_wait(DashboardCommand::add_attribute_filter("region.name"))
//!     .await?;
//! assert!(!event.is_failure());
//! ```

/// Backend trait and errors
pub mod backend;

/// Dashboard commands
pub mod commands;

/// Dashboard events
pub mod events;

/// Command handlers
pub mod handlers;

/// In-memory backend
pub mod mock;

/// State tree and reducers
pub mod model;

/// Cached queries
pub mod queries;

pub use backend::{Backend, BackendError};
pub use commands::DashboardCommand;
pub use events::{CatalogSource, DashboardEvent};
pub use model::{Dashboard, DashboardState, dashboard_reducer};
pub use queries::{MetricsAndFactsParams, MetricsAndFactsQuery};

use dashflow_runtime::{Engine, EngineBuilder, EngineConfig, EngineError};
use metrics::describe_counter;
use std::sync::Arc;

/// Builder for a dashboard engine with every handler and query bound
///
/// Add a clock or further handlers before calling `build`.
///
/// # Errors
///
/// Returns [`EngineError`] when a handler or query is bound twice.
pub fn dashboard_builder(
    backend: Arc<dyn Backend>,
    config: EngineConfig,
) -> Result<EngineBuilder<Dashboard>, EngineError> {
    let builder = Engine::<Dashboard>::builder(DashboardState::default(), dashboard_reducer())
        .with_config(config);
    handlers::register(builder, backend)
}

/// Dashboard engine with every handler and query bound
///
/// # Errors
///
/// Returns [`EngineError`] when a handler or query is bound twice.
pub fn dashboard_engine(
    backend: Arc<dyn Backend>,
    config: EngineConfig,
) -> Result<Engine<Dashboard>, EngineError> {
    Ok(dashboard_builder(backend, config)?.build())
}

/// Register descriptions of the dashboard's own metrics
pub fn describe_metrics() {
    describe_counter!(
        "dashboard.elements.loaded",
        "Attribute element loads that reached the store"
    );
}
