//! Attribute element loading.
//!
//! Loads run under the coordinator key `loadElements:<localId>`: a newer
//! load for the same filter supersedes a running one, and only the newest
//! result reaches the store.

use super::unexpected;
use crate::backend::{Backend, BackendError};
use crate::commands::DashboardCommand;
use crate::events::DashboardEvent;
use crate::model::{Dashboard, ElementsAction};
use dashflow_core::HandlerError;
use dashflow_runtime::{Handler, HandlerContext, async_trait};
use std::sync::Arc;

/// Coordinator key of the element load for `local_id`
#[must_use]
pub fn load_key(local_id: &str) -> String {
    format!("loadElements:{local_id}")
}

/// Loads the elements of one attribute filter
pub struct LoadAttributeElementsHandler {
    backend: Arc<dyn Backend>,
}

impl LoadAttributeElementsHandler {
    /// Handler loading through `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Handler<Dashboard> for LoadAttributeElementsHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Dashboard>,
        command: DashboardCommand,
    ) -> Result<DashboardEvent, HandlerError> {
        let DashboardCommand::LoadAttributeElements { local_id } = command else {
            return Err(unexpected(&command));
        };
        let display_form = ctx
            .select(|s| {
                s.filter_context
                    .find(&local_id)
                    .map(|(_, f)| f.display_form.clone())
            })
            .ok_or_else(|| {
                HandlerError::not_found(format!("attribute filter {local_id} does not exist"))
            })?;

        let backend = Arc::clone(&self.backend);
        let elements = ctx
            .run(load_key(&local_id), |_token| async move {
                match backend.load_attribute_elements(&display_form).await {
                    Ok(elements) => Ok(elements),
                    Err(BackendError::NoData) => Ok(Vec::new()),
                    Err(error) => Err(HandlerError::from(error)),
                }
            })
            .await
            .into_result(|| HandlerError::Canceled)?;

        if ctx.select(|s| s.filter_context.find(&local_id).is_none()) {
            return Err(HandlerError::not_found(format!(
                "attribute filter {local_id} was removed while its elements loaded"
            )));
        }

        let count = elements.len();
        ctx.put(
            ElementsAction::Set {
                local_id: local_id.clone(),
                elements,
            }
            .into(),
        );
        metrics::counter!("dashboard.elements.loaded").increment(1);
        tracing::debug!(%local_id, count, "Attribute elements loaded");
        Ok(DashboardEvent::AttributeElementsLoaded { local_id, count })
    }
}

/// Handle [`DashboardCommand::CancelAttributeElementsLoad`]
///
/// Succeeds whether or not a load was running; the event says which.
///
/// # Errors
///
/// Only for a misrouted command.
pub async fn cancel_attribute_elements_load(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::CancelAttributeElementsLoad { local_id } = command else {
        return Err(unexpected(&command));
    };
    let was_running = ctx.cancel(&load_key(&local_id));
    Ok(DashboardEvent::AttributeElementsLoadCanceled {
        local_id,
        was_running,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_key() {
        assert_eq!(load_key("f1"), "loadElements:f1");
    }
}
