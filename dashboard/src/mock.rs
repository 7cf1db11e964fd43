//! In-memory backend for tests and the demo binary.
//!
//! Responses wait on `tokio::time::sleep`, so tests running on a paused
//! clock control latency exactly.

use crate::backend::{Backend, BackendError, Result};
use crate::model::{AttributeElement, Catalog, DashboardDefinition};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Backend operations, for call counting and failure injection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Backend::load_dashboard`]
    LoadDashboard,
    /// [`Backend::load_catalog`]
    LoadCatalog,
    /// [`Backend::load_attribute_elements`]
    LoadAttributeElements,
    /// [`Backend::save_dashboard`]
    SaveDashboard,
}

/// A scripted answer to one element load
#[derive(Clone, Debug)]
struct ScriptedElements {
    latency: Duration,
    result: Result<Vec<AttributeElement>>,
}

#[derive(Debug, Default)]
struct Inner {
    dashboards: HashMap<String, DashboardDefinition>,
    catalog: Catalog,
    elements: HashMap<String, Vec<AttributeElement>>,
    scripted: HashMap<String, VecDeque<ScriptedElements>>,
    failures: HashMap<Operation, VecDeque<BackendError>>,
    calls: HashMap<Operation, usize>,
}

/// Mock backend.
///
/// Cloning shares the underlying data, so a test can keep a handle for
/// assertions after handing one to the engine.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
    latency: Duration,
}

impl MockBackend {
    /// Create an empty mock backend without latency
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Store a dashboard definition
    #[must_use]
    pub fn with_dashboard(self, definition: DashboardDefinition) -> Self {
        self.inner
            .lock()
            .dashboards
            .insert(definition.id.clone(), definition);
        self
    }

    /// Serve `catalog` from [`Backend::load_catalog`]
    #[must_use]
    pub fn with_catalog(self, catalog: Catalog) -> Self {
        self.inner.lock().catalog = catalog;
        self
    }

    /// Serve `elements` for `display_form`
    #[must_use]
    pub fn with_elements(
        self,
        display_form: impl Into<String>,
        elements: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let elements = elements
            .into_iter()
            .map(AttributeElement::titled)
            .collect();
        self.inner
            .lock()
            .elements
            .insert(display_form.into(), elements);
        self
    }

    /// Answer the next element load of `display_form` with `result` after
    /// `latency`, ahead of the configured elements
    ///
    /// Scripted answers are consumed in the order they were queued.
    pub fn script_elements(
        &self,
        display_form: impl Into<String>,
        latency: Duration,
        result: Result<Vec<AttributeElement>>,
    ) {
        self.inner
            .lock()
            .scripted
            .entry(display_form.into())
            .or_default()
            .push_back(ScriptedElements { latency, result });
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        self.inner
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Number of calls made to `operation`
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.inner.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Stored definition of `dashboard_id`
    #[must_use]
    pub fn dashboard(&self, dashboard_id: &str) -> Option<DashboardDefinition> {
        self.inner.lock().dashboards.get(dashboard_id).cloned()
    }

    /// Count the call and pop an injected failure, if any
    fn begin(&self, operation: Operation) -> Result<()> {
        let mut inner = self.inner.lock();
        *inner.calls.entry(operation).or_insert(0) += 1;
        match inner.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => {
                tracing::debug!(?operation, %error, "Injected backend failure");
                Err(error)
            },
            None => Ok(()),
        }
    }

    async fn delay(latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn load_dashboard(&self, dashboard_id: &str) -> Result<DashboardDefinition> {
        Self::delay(self.latency).await;
        self.begin(Operation::LoadDashboard)?;
        self.dashboard(dashboard_id)
            .ok_or_else(|| BackendError::NotFound(format!("dashboard {dashboard_id}")))
    }

    async fn load_catalog(&self) -> Result<Catalog> {
        Self::delay(self.latency).await;
        self.begin(Operation::LoadCatalog)?;
        Ok(self.inner.lock().catalog.clone())
    }

    async fn load_attribute_elements(&self, display_form: &str) -> Result<Vec<AttributeElement>> {
        self.begin(Operation::LoadAttributeElements)?;
        let scripted = self
            .inner
            .lock()
            .scripted
            .get_mut(display_form)
            .and_then(VecDeque::pop_front);
        if let Some(ScriptedElements { latency, result }) = scripted {
            Self::delay(latency).await;
            return result;
        }

        Self::delay(self.latency).await;
        self.inner
            .lock()
            .elements
            .get(display_form)
            .cloned()
            .ok_or(BackendError::NoData)
    }

    async fn save_dashboard(&self, definition: DashboardDefinition) -> Result<u64> {
        Self::delay(self.latency).await;
        self.begin(Operation::SaveDashboard)?;
        let mut inner = self.inner.lock();
        let stored = inner
            .dashboards
            .get(&definition.id)
            .map_or(0, |d| d.revision);
        if stored != definition.revision {
            return Err(BackendError::Conflict {
                expected: definition.revision,
                actual: stored,
            });
        }
        let revision = stored + 1;
        inner.dashboards.insert(
            definition.id.clone(),
            DashboardDefinition {
                revision,
                ..definition
            },
        );
        Ok(revision)
    }
}
