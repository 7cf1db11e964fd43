//! Filter context handlers.

use super::{insertion_index, move_index, unexpected};
use crate::commands::DashboardCommand;
use crate::events::DashboardEvent;
use crate::model::{
    AttributeFilter, AttributeSelection, Dashboard, ElementsAction, FilterContextAction,
};
use dashflow_core::HandlerError;
use dashflow_runtime::HandlerContext;
use uuid::Uuid;

fn missing_filter(local_id: &str) -> HandlerError {
    HandlerError::not_found(format!("attribute filter {local_id} does not exist"))
}

/// Handle [`DashboardCommand::AddAttributeFilter`]
///
/// The new filter gets a generated local id, reported in the event.
///
/// # Errors
///
/// - `invalid-arguments` for a blank or already filtered display form, or a
///   bad index
/// - `not-found` when a loaded catalog does not know the display form
pub async fn add_attribute_filter(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::AddAttributeFilter {
        display_form,
        index,
        initial_selection,
    } = command
    else {
        return Err(unexpected(&command));
    };
    if display_form.trim().is_empty() {
        return Err(HandlerError::invalid_arguments("display form must not be empty"));
    }

    let (len, duplicate, known) = ctx.select(|s| {
        (
            s.filter_context.attribute_filters.len(),
            s.filter_context.has_display_form(&display_form),
            s.catalog
                .as_ref()
                .is_none_or(|c| c.has_display_form(&display_form)),
        )
    });
    if duplicate {
        return Err(HandlerError::invalid_arguments(format!(
            "an attribute filter for {display_form} already exists"
        )));
    }
    if !known {
        return Err(HandlerError::not_found(format!(
            "display form {display_form} is not in the catalog"
        )));
    }
    let index = insertion_index(index, len, "attribute filter")?;

    let filter = AttributeFilter {
        local_id: format!("af_{}", Uuid::new_v4().simple()),
        display_form,
        selection: initial_selection.unwrap_or_else(AttributeSelection::all),
    };
    ctx.put(
        FilterContextAction::AddAttributeFilter {
            index,
            filter: filter.clone(),
        }
        .into(),
    );
    Ok(DashboardEvent::AttributeFilterAdded { filter, index })
}

/// Handle [`DashboardCommand::RemoveAttributeFilters`]
///
/// Also drops loaded elements of the removed filters and cancels their
/// running loads.
///
/// # Errors
///
/// - `invalid-arguments` for an empty id list
/// - `not-found` when any id does not exist; nothing is removed then
pub async fn remove_attribute_filters(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::RemoveAttributeFilters { local_ids } = command else {
        return Err(unexpected(&command));
    };
    if local_ids.is_empty() {
        return Err(HandlerError::invalid_arguments("no attribute filters to remove"));
    }

    let (removed, has_elements) = ctx.select(|s| {
        let removed: Vec<AttributeFilter> = s
            .filter_context
            .attribute_filters
            .iter()
            .filter(|f| local_ids.contains(&f.local_id))
            .cloned()
            .collect();
        let has_elements = local_ids.iter().any(|id| s.elements.get(id).is_some());
        (removed, has_elements)
    });
    if let Some(missing) = local_ids
        .iter()
        .find(|id| !removed.iter().any(|f| &f.local_id == *id))
    {
        return Err(missing_filter(missing));
    }

    for local_id in &local_ids {
        ctx.cancel(&super::elements::load_key(local_id));
    }
    ctx.put(FilterContextAction::RemoveAttributeFilters(local_ids.clone()).into());
    if has_elements {
        ctx.put(ElementsAction::Remove(local_ids).into());
    }
    Ok(DashboardEvent::AttributeFiltersRemoved { removed })
}

/// Handle [`DashboardCommand::MoveAttributeFilter`]
///
/// # Errors
///
/// - `not-found` for an unknown local id
/// - `invalid-arguments` for an index outside `-1..len`
pub async fn move_attribute_filter(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::MoveAttributeFilter { local_id, index } = command else {
        return Err(unexpected(&command));
    };

    let (from_index, len) = ctx.select(|s| {
        (
            s.filter_context.find(&local_id).map(|(i, _)| i),
            s.filter_context.attribute_filters.len(),
        )
    });
    let from_index = from_index.ok_or_else(|| missing_filter(&local_id))?;
    let to_index = move_index(index, len, "attribute filter")?;

    ctx.put(
        FilterContextAction::MoveAttributeFilter {
            local_id: local_id.clone(),
            index: to_index,
        }
        .into(),
    );
    Ok(DashboardEvent::AttributeFilterMoved {
        local_id,
        from_index,
        to_index,
    })
}

/// Handle [`DashboardCommand::ChangeAttributeFilterSelection`]
///
/// # Errors
///
/// `not-found` for an unknown local id.
pub async fn change_attribute_selection(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::ChangeAttributeFilterSelection {
        local_id,
        selection,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let previous = ctx
        .select(|s| s.filter_context.find(&local_id).map(|(_, f)| f.selection.clone()))
        .ok_or_else(|| missing_filter(&local_id))?;
    ctx.put(
        FilterContextAction::ChangeAttributeSelection {
            local_id: local_id.clone(),
            selection: selection.clone(),
        }
        .into(),
    );
    Ok(DashboardEvent::AttributeFilterSelectionChanged {
        local_id,
        previous,
        selection,
    })
}

/// Handle [`DashboardCommand::ChangeDateFilterSelection`]
///
/// # Errors
///
/// `invalid-arguments` when the range ends before it starts.
pub async fn change_date_filter_selection(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::ChangeDateFilterSelection { selection } = command else {
        return Err(unexpected(&command));
    };
    if !selection.is_valid() {
        return Err(HandlerError::invalid_arguments(
            "date filter range must not end before it starts",
        ));
    }

    let previous = ctx.select(|s| s.filter_context.date_filter.clone());
    ctx.put(FilterContextAction::ChangeDateFilter(selection.clone()).into());
    Ok(DashboardEvent::DateFilterSelectionChanged {
        previous,
        selection,
    })
}
