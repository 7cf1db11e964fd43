//! Dashboard lifecycle: initialize, rename, save, catalog.

use super::unexpected;
use crate::backend::Backend;
use crate::commands::DashboardCommand;
use crate::events::{CatalogSource, DashboardEvent};
use crate::model::{
    CatalogAction, Dashboard, DashboardDefinition, ElementsAction, FilterContextAction, LAYOUT,
    LayoutAction, MetaAction,
};
use crate::queries::{MetricsAndFactsParams, MetricsAndFactsQuery};
use dashflow_core::{HandlerError, Query};
use dashflow_runtime::{Handler, HandlerContext, async_trait};
use std::sync::Arc;

/// Loads a dashboard from the backend and replaces the state with it
pub struct InitializeDashboardHandler {
    backend: Arc<dyn Backend>,
}

impl InitializeDashboardHandler {
    /// Handler loading through `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Handler<Dashboard> for InitializeDashboardHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Dashboard>,
        command: DashboardCommand,
    ) -> Result<DashboardEvent, HandlerError> {
        let DashboardCommand::InitializeDashboard { dashboard_id } = command else {
            return Err(unexpected(&command));
        };
        if dashboard_id.trim().is_empty() {
            return Err(HandlerError::invalid_arguments("dashboard id must not be empty"));
        }

        let definition = self.backend.load_dashboard(&dashboard_id).await?;
        tracing::info!(
            dashboard_id = %definition.id,
            revision = definition.revision,
            "Dashboard loaded"
        );

        let loaded_filters = ctx.select(|s| s.elements.by_filter.keys().cloned().collect::<Vec<_>>());
        for local_id in &loaded_filters {
            ctx.cancel(&super::elements::load_key(local_id));
        }

        ctx.put(
            MetaAction::Initialize {
                id: definition.id.clone(),
                title: definition.title.clone(),
                revision: definition.revision,
            }
            .into(),
        );
        ctx.put(FilterContextAction::Replace(definition.filter_context).into());
        ctx.put(LayoutAction::Replace(definition.layout).into());
        // Entries from the previous dashboard would restore its layout.
        let dropped = ctx.clear_undo(LAYOUT);
        if !loaded_filters.is_empty() {
            ctx.put(ElementsAction::Remove(loaded_filters).into());
        }
        tracing::debug!(undo_entries_dropped = dropped, "Dashboard state replaced");

        Ok(DashboardEvent::DashboardInitialized {
            dashboard_id: definition.id,
            title: definition.title,
            revision: definition.revision,
        })
    }
}

/// Handle [`DashboardCommand::RenameDashboard`]
///
/// # Errors
///
/// `invalid-arguments` for a blank title.
pub async fn rename_dashboard(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::RenameDashboard { title } = command else {
        return Err(unexpected(&command));
    };
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(HandlerError::invalid_arguments("title must not be blank"));
    }

    let previous_title = ctx.select(|s| s.meta.title.clone());
    ctx.put(MetaAction::Rename(title.clone()).into());
    Ok(DashboardEvent::DashboardRenamed {
        previous_title,
        title,
    })
}

/// Persists the current filters and layout
pub struct SaveDashboardHandler {
    backend: Arc<dyn Backend>,
}

impl SaveDashboardHandler {
    /// Handler saving through `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Handler<Dashboard> for SaveDashboardHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Dashboard>,
        command: DashboardCommand,
    ) -> Result<DashboardEvent, HandlerError> {
        if !matches!(command, DashboardCommand::SaveDashboard) {
            return Err(unexpected(&command));
        }
        let definition = ctx
            .select(DashboardDefinition::from_state)
            .ok_or_else(|| HandlerError::invalid_state("dashboard is not initialized"))?;
        let dashboard_id = definition.id.clone();

        let revision = self.backend.save_dashboard(definition).await?;
        ctx.put(
            MetaAction::MarkSaved {
                revision,
                at: ctx.now(),
            }
            .into(),
        );
        tracing::info!(%dashboard_id, revision, "Dashboard saved");
        Ok(DashboardEvent::DashboardSaved {
            dashboard_id,
            revision,
        })
    }
}

/// Handle [`DashboardCommand::LoadCatalog`]
///
/// Answers from the store when the catalog is already loaded. Otherwise runs
/// the `metricsAndFacts` query, stores its result and drops the query cache,
/// leaving the store as the only copy.
///
/// # Errors
///
/// `collaborator-failed` when the query fails.
pub async fn load_catalog(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    if !matches!(command, DashboardCommand::LoadCatalog) {
        return Err(unexpected(&command));
    }

    let (source, catalog) = match ctx.select(|s| s.catalog.clone()) {
        Some(catalog) => (CatalogSource::Store, catalog),
        None => {
            let catalog = ctx
                .query::<MetricsAndFactsQuery>(MetricsAndFactsParams {})
                .await?;
            let catalog = (*catalog).clone();
            ctx.put(CatalogAction::Set(catalog.clone()).into());
            ctx.reset_query(MetricsAndFactsQuery::NAME);
            (CatalogSource::Backend, catalog)
        },
    };
    tracing::debug!(?source, "Catalog available");

    Ok(DashboardEvent::CatalogLoaded {
        source,
        metrics: catalog.metrics.len(),
        facts: catalog.facts.len(),
        attributes: catalog.attributes.len(),
    })
}
