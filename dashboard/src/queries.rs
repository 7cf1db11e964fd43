//! Cached queries over the backend.

use crate::backend::{Backend, BackendError};
use crate::model::Catalog;
use dashflow_core::query::{Query, QueryError};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;

/// Parameters of [`MetricsAndFactsQuery`]; the catalog is workspace-wide,
/// so there is a single cache entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsAndFactsParams {}

/// Loads the workspace catalog (metrics, facts and attributes)
#[derive(Clone)]
pub struct MetricsAndFactsQuery {
    backend: Arc<dyn Backend>,
}

impl MetricsAndFactsQuery {
    /// Query reading through `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

impl Query for MetricsAndFactsQuery {
    const NAME: &'static str = "metricsAndFacts";
    type Params = MetricsAndFactsParams;
    type Output = Catalog;

    fn execute(&self, _params: MetricsAndFactsParams) -> BoxFuture<'static, Result<Catalog, QueryError>> {
        let backend = Arc::clone(&self.backend);
        async move {
            match backend.load_catalog().await {
                Ok(catalog) => Ok(catalog),
                Err(BackendError::NoData) => Ok(Catalog::default()),
                Err(error) => Err(QueryError::Failed(error.to_string())),
            }
        }
        .boxed()
    }
}
