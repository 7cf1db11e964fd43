//! Fluid layout handlers.
//!
//! Every mutation here is put with an undo descriptor, so
//! [`undo_layout_changes`] can revert it.

use super::{existing_index, insertion_index, move_index, unexpected};
use crate::commands::DashboardCommand;
use crate::events::DashboardEvent;
use crate::model::{
    Dashboard, LAYOUT, LayoutAction, LayoutItem, LayoutSection, LayoutState, SectionHeader,
};
use dashflow_core::HandlerError;
use dashflow_runtime::HandlerContext;

/// Widest an item can be, in grid columns
const GRID_COLUMNS: u8 = 12;

fn check_items(layout: &LayoutState, items: &[LayoutItem]) -> Result<(), HandlerError> {
    for (i, item) in items.iter().enumerate() {
        if item.widget_id.trim().is_empty() {
            return Err(HandlerError::invalid_arguments("widget id must not be empty"));
        }
        if item.width == 0 || item.width > GRID_COLUMNS {
            return Err(HandlerError::invalid_arguments(format!(
                "widget {} width {} is outside 1..={GRID_COLUMNS}",
                item.widget_id, item.width
            )));
        }
        if layout.contains_widget(&item.widget_id)
            || items[..i].iter().any(|o| o.widget_id == item.widget_id)
        {
            return Err(HandlerError::invalid_arguments(format!(
                "widget {} is already placed",
                item.widget_id
            )));
        }
    }
    Ok(())
}

fn signed(index: usize) -> Result<i64, HandlerError> {
    i64::try_from(index).map_err(|_| HandlerError::Internal(format!("index {index} overflows")))
}

/// Handle [`DashboardCommand::AddLayoutSection`]
///
/// # Errors
///
/// `invalid-arguments` for a bad index or an item that cannot be placed.
pub async fn add_section(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::AddLayoutSection {
        index,
        header,
        items,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let layout = ctx.select(|s| s.layout.clone());
    let index = insertion_index(index, layout.sections.len(), "section")?;
    check_items(&layout, &items)?;

    let section = LayoutSection { header, items };
    ctx.put_with_undo(
        LayoutAction::AddSection {
            index,
            section: section.clone(),
        }
        .into(),
    );
    Ok(DashboardEvent::LayoutSectionAdded { section, index })
}

/// Handle [`DashboardCommand::MoveLayoutSection`]
///
/// # Errors
///
/// `invalid-arguments` when either index is out of range.
pub async fn move_section(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::MoveLayoutSection {
        section_index,
        to_index,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let len = ctx.select(|s| s.layout.sections.len());
    let from_index = existing_index(section_index, len, "section")?;
    let to_index = move_index(to_index, len, "target section")?;

    ctx.put_with_undo(
        LayoutAction::MoveSection {
            from: from_index,
            to: to_index,
        }
        .into(),
    );
    Ok(DashboardEvent::LayoutSectionMoved {
        from_index,
        to_index,
    })
}

/// Handle [`DashboardCommand::RemoveLayoutSection`]
///
/// # Errors
///
/// `invalid-arguments` when the index is out of range.
pub async fn remove_section(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::RemoveLayoutSection { index } = command else {
        return Err(unexpected(&command));
    };

    let section = ctx
        .select(|s| s.layout.sections.get(index).cloned())
        .ok_or_else(|| {
            HandlerError::invalid_arguments(format!("section index {index} is out of range"))
        })?;
    ctx.put_with_undo(LayoutAction::RemoveSection(index).into());
    Ok(DashboardEvent::LayoutSectionRemoved { section, index })
}

/// Handle [`DashboardCommand::ChangeLayoutSectionHeader`]
///
/// # Errors
///
/// `invalid-arguments` when the index is out of range.
pub async fn change_section_header(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::ChangeLayoutSectionHeader {
        index,
        header,
        merge,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let previous = ctx
        .select(|s| s.layout.sections.get(index).map(|section| section.header.clone()))
        .ok_or_else(|| {
            HandlerError::invalid_arguments(format!("section index {index} is out of range"))
        })?;
    let header = if merge {
        previous.merged(&header)
    } else {
        header
    };

    ctx.put_with_undo(
        LayoutAction::ChangeSectionHeader {
            index,
            header: header.clone(),
        }
        .into(),
    );
    Ok(DashboardEvent::LayoutSectionHeaderChanged {
        index,
        previous,
        header,
    })
}

/// Handle [`DashboardCommand::AddSectionItem`]
///
/// # Errors
///
/// `invalid-arguments` for a bad index or an item that cannot be placed.
pub async fn add_item(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::AddSectionItem {
        section_index,
        item_index,
        item,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let layout = ctx.select(|s| s.layout.clone());
    let section_index = existing_index(section_index, layout.sections.len(), "section")?;
    let item_index = insertion_index(
        item_index,
        layout.sections[section_index].items.len(),
        "item",
    )?;
    check_items(&layout, std::slice::from_ref(&item))?;

    ctx.put_with_undo(
        LayoutAction::AddItems {
            section: section_index,
            index: item_index,
            items: vec![item.clone()],
        }
        .into(),
    );
    Ok(DashboardEvent::LayoutItemAdded {
        section_index,
        item_index,
        item,
    })
}

/// Handle [`DashboardCommand::MoveSectionItem`]
///
/// The target item index counts positions after the item left its source,
/// so within one section `-1` moves the item to the end.
///
/// # Errors
///
/// `invalid-arguments` when any index is out of range.
pub async fn move_item(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::MoveSectionItem {
        section_index,
        item_index,
        to_section_index,
        to_item_index,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let layout = ctx.select(|s| s.layout.clone());
    let sections = &layout.sections;
    let from_section = existing_index(section_index, sections.len(), "section")?;
    let from_item = existing_index(item_index, sections[from_section].items.len(), "item")?;
    let to_section = move_index(to_section_index, sections.len(), "target section")?;
    let target_len = if to_section == from_section {
        sections[to_section].items.len() - 1
    } else {
        sections[to_section].items.len()
    };
    let to_item = insertion_index(to_item_index, target_len, "target item")?;

    let item = sections[from_section].items[from_item].clone();
    ctx.put_with_undo(
        LayoutAction::MoveItem {
            section: from_section,
            item: from_item,
            to_section,
            to_item,
        }
        .into(),
    );
    Ok(DashboardEvent::LayoutItemMoved {
        item,
        from_section_index: from_section,
        from_item_index: from_item,
        to_section_index: to_section,
        to_item_index: to_item,
    })
}

/// Handle [`DashboardCommand::RemoveSectionItem`]
///
/// With `eager`, removing the only item of a section removes the section.
///
/// # Errors
///
/// `invalid-arguments` when either index is out of range.
pub async fn remove_item(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::RemoveSectionItem {
        section_index,
        item_index,
        eager,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let section = ctx
        .select(|s| s.layout.sections.get(section_index).cloned())
        .ok_or_else(|| {
            HandlerError::invalid_arguments(format!(
                "section index {section_index} is out of range"
            ))
        })?;
    let item_index = existing_index(item_index, section.items.len(), "item")?;
    let item = section.items[item_index].clone();
    let section_removed = eager && section.items.len() == 1;

    if section_removed {
        ctx.put_with_undo(LayoutAction::RemoveSection(section_index).into());
    } else {
        ctx.put_with_undo(
            LayoutAction::RemoveItem {
                section: section_index,
                item: item_index,
            }
            .into(),
        );
    }
    Ok(DashboardEvent::LayoutItemRemoved {
        item,
        section_index,
        item_index,
        section_removed,
    })
}

/// Handle [`DashboardCommand::MoveSectionItemToNewSection`]
///
/// Composed of an [`DashboardCommand::AddLayoutSection`] and a
/// [`DashboardCommand::MoveSectionItem`] dispatched as nested steps; both
/// share this command's correlation id and are undone together.
///
/// # Errors
///
/// `invalid-arguments` when any index is out of range; checked before the
/// first step runs.
pub async fn move_item_to_new_section(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::MoveSectionItemToNewSection {
        section_index,
        item_index,
        to_section_index,
    } = command
    else {
        return Err(unexpected(&command));
    };

    let layout = ctx.select(|s| s.layout.clone());
    let from_section = existing_index(section_index, layout.sections.len(), "section")?;
    let from_item = existing_index(
        item_index,
        layout.sections[from_section].items.len(),
        "item",
    )?;
    let to_section = insertion_index(to_section_index, layout.sections.len(), "target section")?;
    let item = layout.sections[from_section].items[from_item].clone();

    ctx.dispatch_nested(DashboardCommand::AddLayoutSection {
        index: signed(to_section)?,
        header: SectionHeader::default(),
        items: Vec::new(),
    })
    .await?;
    let shifted_source = if to_section <= from_section {
        from_section + 1
    } else {
        from_section
    };
    ctx.dispatch_nested(DashboardCommand::MoveSectionItem {
        section_index: shifted_source,
        item_index: from_item,
        to_section_index: signed(to_section)?,
        to_item_index: 0,
    })
    .await?;

    Ok(DashboardEvent::LayoutItemMovedToNewSection {
        item,
        from_section_index: from_section,
        from_item_index: from_item,
        to_section_index: to_section,
    })
}

/// Handle [`DashboardCommand::UndoLayoutChanges`]
///
/// # Errors
///
/// `invalid-arguments` when the undo point selects nothing.
pub async fn undo_layout_changes(
    ctx: HandlerContext<Dashboard>,
    command: DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    let DashboardCommand::UndoLayoutChanges { undo_point } = command else {
        return Err(unexpected(&command));
    };

    let reverted = ctx.undo(LAYOUT, &undo_point)?;
    if reverted.is_empty() {
        return Err(HandlerError::invalid_arguments("nothing to undo"));
    }
    tracing::debug!(reverted = reverted.len(), ?undo_point, "Layout changes undone");
    Ok(DashboardEvent::LayoutChangesUndone {
        undone: reverted.into_iter().map(|descriptor| descriptor.cmd).collect(),
    })
}
