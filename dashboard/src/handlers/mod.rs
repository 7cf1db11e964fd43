//! Command handlers.
//!
//! Every handler validates its command against the current state before the
//! first store mutation, so a rejected command leaves the store untouched.
//! Layout handlers put their mutations with undo descriptors.

pub mod dashboard;
pub mod elements;
pub mod filters;
pub mod layout;

use crate::backend::Backend;
use crate::commands::{DashboardCommand, kinds};
use crate::model::Dashboard;
use crate::queries::MetricsAndFactsQuery;
use dashflow_core::{Command, HandlerError};
use dashflow_runtime::{EngineBuilder, EngineError, handler_fn};
use std::sync::Arc;

/// Bind every dashboard handler and query to `builder`
///
/// # Errors
///
/// Returns [`EngineError::DuplicateHandler`] or
/// [`EngineError::DuplicateQuery`] when `builder` already binds one of them.
pub fn register(
    builder: EngineBuilder<Dashboard>,
    backend: Arc<dyn Backend>,
) -> Result<EngineBuilder<Dashboard>, EngineError> {
    builder
        .query(MetricsAndFactsQuery::new(Arc::clone(&backend)))?
        .handler(
            kinds::INITIALIZE,
            dashboard::InitializeDashboardHandler::new(Arc::clone(&backend)),
        )?
        .handler(kinds::RENAME, handler_fn(dashboard::rename_dashboard))?
        .handler(kinds::SAVE, dashboard::SaveDashboardHandler::new(Arc::clone(&backend)))?
        .handler(kinds::CATALOG_LOAD, handler_fn(dashboard::load_catalog))?
        .handler(kinds::ATTRIBUTE_FILTER_ADD, handler_fn(filters::add_attribute_filter))?
        .handler(kinds::ATTRIBUTE_FILTERS_REMOVE, handler_fn(filters::remove_attribute_filters))?
        .handler(kinds::ATTRIBUTE_FILTER_MOVE, handler_fn(filters::move_attribute_filter))?
        .handler(
            kinds::ATTRIBUTE_FILTER_CHANGE_SELECTION,
            handler_fn(filters::change_attribute_selection),
        )?
        .handler(
            kinds::DATE_FILTER_CHANGE_SELECTION,
            handler_fn(filters::change_date_filter_selection),
        )?
        .handler(
            kinds::ATTRIBUTE_ELEMENTS_LOAD,
            elements::LoadAttributeElementsHandler::new(backend),
        )?
        .handler(
            kinds::ATTRIBUTE_ELEMENTS_CANCEL_LOAD,
            handler_fn(elements::cancel_attribute_elements_load),
        )?
        .handler(kinds::SECTION_ADD, handler_fn(layout::add_section))?
        .handler(kinds::SECTION_MOVE, handler_fn(layout::move_section))?
        .handler(kinds::SECTION_REMOVE, handler_fn(layout::remove_section))?
        .handler(kinds::SECTION_CHANGE_HEADER, handler_fn(layout::change_section_header))?
        .handler(kinds::ITEM_ADD, handler_fn(layout::add_item))?
        .handler(kinds::ITEM_MOVE, handler_fn(layout::move_item))?
        .handler(kinds::ITEM_REMOVE, handler_fn(layout::remove_item))?
        .handler(kinds::ITEM_MOVE_TO_NEW_SECTION, handler_fn(layout::move_item_to_new_section))?
        .handler(kinds::LAYOUT_UNDO, handler_fn(layout::undo_layout_changes))
}

/// Error for a command routed to the wrong handler
pub(crate) fn unexpected(command: &DashboardCommand) -> HandlerError {
    HandlerError::Internal(format!("unexpected command {}", command.kind()))
}

/// Resolve an insertion position among `len` elements; `-1` appends
///
/// Valid positions are `0..=len`.
pub(crate) fn insertion_index(index: i64, len: usize, what: &str) -> Result<usize, HandlerError> {
    if index == -1 {
        return Ok(len);
    }
    usize::try_from(index)
        .ok()
        .filter(|i| *i <= len)
        .ok_or_else(|| {
            HandlerError::invalid_arguments(format!(
                "{what} index {index} is out of range; expected -1 or 0..={len}"
            ))
        })
}

/// Resolve the target of a move among `len` elements; `-1` is the last
/// position
///
/// Valid positions are `0..len`.
pub(crate) fn move_index(index: i64, len: usize, what: &str) -> Result<usize, HandlerError> {
    let out_of_range = || {
        HandlerError::invalid_arguments(format!(
            "{what} index {index} is out of range for {len} element(s)"
        ))
    };
    if index == -1 {
        return len.checked_sub(1).ok_or_else(out_of_range);
    }
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(out_of_range)
}

/// Check that `index` addresses one of `len` elements
pub(crate) fn existing_index(index: usize, len: usize, what: &str) -> Result<usize, HandlerError> {
    if index < len {
        Ok(index)
    } else {
        Err(HandlerError::invalid_arguments(format!(
            "{what} index {index} is out of range for {len} element(s)"
        )))
    }
}
