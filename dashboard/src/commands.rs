//! Dashboard commands.
//!
//! On the wire a command is `{"type": "GDC.DASH/CMD.…", "payload": {…}}`.
//! Positional arguments that accept `-1` mean "at the end".

use crate::model::{AttributeSelection, DateFilterSelection, LayoutItem, SectionHeader};
use dashflow_core::Command;
use dashflow_runtime::UndoPoint;
use serde::{Deserialize, Serialize};

/// Command type identifiers
pub mod kinds {
    /// [`super::DashboardCommand::InitializeDashboard`]
    pub const INITIALIZE: &str = "GDC.DASH/CMD.INITIALIZE";
    /// [`super::DashboardCommand::RenameDashboard`]
    pub const RENAME: &str = "GDC.DASH/CMD.RENAME";
    /// [`super::DashboardCommand::SaveDashboard`]
    pub const SAVE: &str = "GDC.DASH/CMD.SAVE";
    /// [`super::DashboardCommand::LoadCatalog`]
    pub const CATALOG_LOAD: &str = "GDC.DASH/CMD.CATALOG.LOAD";
    /// [`super::DashboardCommand::AddAttributeFilter`]
    pub const ATTRIBUTE_FILTER_ADD: &str = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADD";
    /// [`super::DashboardCommand::RemoveAttributeFilters`]
    pub const ATTRIBUTE_FILTERS_REMOVE: &str = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTERS.REMOVE";
    /// [`super::DashboardCommand::MoveAttributeFilter`]
    pub const ATTRIBUTE_FILTER_MOVE: &str = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVE";
    /// [`super::DashboardCommand::ChangeAttributeFilterSelection`]
    pub const ATTRIBUTE_FILTER_CHANGE_SELECTION: &str =
        "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.CHANGE_SELECTION";
    /// [`super::DashboardCommand::ChangeDateFilterSelection`]
    pub const DATE_FILTER_CHANGE_SELECTION: &str =
        "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.CHANGE_SELECTION";
    /// [`super::DashboardCommand::LoadAttributeElements`]
    pub const ATTRIBUTE_ELEMENTS_LOAD: &str = "GDC.DASH/CMD.ATTRIBUTE_ELEMENTS.LOAD";
    /// [`super::DashboardCommand::CancelAttributeElementsLoad`]
    pub const ATTRIBUTE_ELEMENTS_CANCEL_LOAD: &str = "GDC.DASH/CMD.ATTRIBUTE_ELEMENTS.CANCEL_LOAD";
    /// [`super::DashboardCommand::AddLayoutSection`]
    pub const SECTION_ADD: &str = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_SECTION";
    /// [`super::DashboardCommand::MoveLayoutSection`]
    pub const SECTION_MOVE: &str = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_SECTION";
    /// [`super::DashboardCommand::RemoveLayoutSection`]
    pub const SECTION_REMOVE: &str = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_SECTION";
    /// [`super::DashboardCommand::ChangeLayoutSectionHeader`]
    pub const SECTION_CHANGE_HEADER: &str = "GDC.DASH/CMD.FLUID_LAYOUT.CHANGE_SECTION_HEADER";
    /// [`super::DashboardCommand::AddSectionItem`]
    pub const ITEM_ADD: &str = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_ITEMS";
    /// [`super::DashboardCommand::MoveSectionItem`]
    pub const ITEM_MOVE: &str = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_ITEM";
    /// [`super::DashboardCommand::RemoveSectionItem`]
    pub const ITEM_REMOVE: &str = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_ITEM";
    /// [`super::DashboardCommand::MoveSectionItemToNewSection`]
    pub const ITEM_MOVE_TO_NEW_SECTION: &str = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_ITEM_TO_NEW_SECTION";
    /// [`super::DashboardCommand::UndoLayoutChanges`]
    pub const LAYOUT_UNDO: &str = "GDC.DASH/CMD.FLUID_LAYOUT.UNDO";
}

/// Every command the dashboard accepts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DashboardCommand {
    /// Load a dashboard from the backend and replace the state with it
    #[serde(rename = "GDC.DASH/CMD.INITIALIZE", rename_all = "camelCase")]
    InitializeDashboard {
        /// Backend identifier
        dashboard_id: String,
    },

    /// Change the title
    #[serde(rename = "GDC.DASH/CMD.RENAME", rename_all = "camelCase")]
    RenameDashboard {
        /// New title, not blank
        title: String,
    },

    /// Persist the current filters and layout
    #[serde(rename = "GDC.DASH/CMD.SAVE")]
    SaveDashboard,

    /// Make the catalog available in the store
    #[serde(rename = "GDC.DASH/CMD.CATALOG.LOAD")]
    LoadCatalog,

    /// Add an attribute filter for a display form
    #[serde(
        rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADD",
        rename_all = "camelCase"
    )]
    AddAttributeFilter {
        /// Display form to filter by
        display_form: String,
        /// Position among the attribute filters, `-1` for the end
        index: i64,
        /// Selection to start with, "all" when absent
        #[serde(default)]
        initial_selection: Option<AttributeSelection>,
    },

    /// Remove attribute filters
    #[serde(
        rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTERS.REMOVE",
        rename_all = "camelCase"
    )]
    RemoveAttributeFilters {
        /// Filters to remove
        local_ids: Vec<String>,
    },

    /// Move an attribute filter
    #[serde(
        rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVE",
        rename_all = "camelCase"
    )]
    MoveAttributeFilter {
        /// Filter to move
        local_id: String,
        /// Position after the move, `-1` for the end
        index: i64,
    },

    /// Change the selection of an attribute filter
    #[serde(
        rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.CHANGE_SELECTION",
        rename_all = "camelCase"
    )]
    ChangeAttributeFilterSelection {
        /// Filter to change
        local_id: String,
        /// New selection
        selection: AttributeSelection,
    },

    /// Change the date filter
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.CHANGE_SELECTION")]
    ChangeDateFilterSelection {
        /// New selection
        selection: DateFilterSelection,
    },

    /// Load the elements of an attribute filter; a newer load for the same
    /// filter supersedes a running one
    #[serde(rename = "GDC.DASH/CMD.ATTRIBUTE_ELEMENTS.LOAD", rename_all = "camelCase")]
    LoadAttributeElements {
        /// Filter whose elements to load
        local_id: String,
    },

    /// Cancel a running element load
    #[serde(
        rename = "GDC.DASH/CMD.ATTRIBUTE_ELEMENTS.CANCEL_LOAD",
        rename_all = "camelCase"
    )]
    CancelAttributeElementsLoad {
        /// Filter whose load to cancel
        local_id: String,
    },

    /// Insert a section
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_SECTION", rename_all = "camelCase")]
    AddLayoutSection {
        /// Position, `-1` for the end
        index: i64,
        /// Header of the new section
        #[serde(default)]
        header: SectionHeader,
        /// Items to start with
        #[serde(default)]
        items: Vec<LayoutItem>,
    },

    /// Move a section
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_SECTION", rename_all = "camelCase")]
    MoveLayoutSection {
        /// Section to move
        section_index: usize,
        /// Position after the move, `-1` for the end
        to_index: i64,
    },

    /// Remove a section with all its items
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_SECTION")]
    RemoveLayoutSection {
        /// Section to remove
        index: usize,
    },

    /// Change a section header
    #[serde(
        rename = "GDC.DASH/CMD.FLUID_LAYOUT.CHANGE_SECTION_HEADER",
        rename_all = "camelCase"
    )]
    ChangeLayoutSectionHeader {
        /// Section to change
        index: usize,
        /// New header
        header: SectionHeader,
        /// Keep fields of the current header that `header` leaves unset
        #[serde(default)]
        merge: bool,
    },

    /// Insert an item into a section
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_ITEMS", rename_all = "camelCase")]
    AddSectionItem {
        /// Target section
        section_index: usize,
        /// Position in the section, `-1` for the end
        item_index: i64,
        /// Item to add
        item: LayoutItem,
    },

    /// Move an item within or across sections
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_ITEM", rename_all = "camelCase")]
    MoveSectionItem {
        /// Source section
        section_index: usize,
        /// Source item
        item_index: usize,
        /// Target section, `-1` for the last one
        to_section_index: i64,
        /// Target position, `-1` for the end
        to_item_index: i64,
    },

    /// Remove an item
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_ITEM", rename_all = "camelCase")]
    RemoveSectionItem {
        /// Section of the item
        section_index: usize,
        /// Item to remove
        item_index: usize,
        /// Also remove the section when the item was its only one
        #[serde(default)]
        eager: bool,
    },

    /// Move an item into a section created for it
    #[serde(
        rename = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_ITEM_TO_NEW_SECTION",
        rename_all = "camelCase"
    )]
    MoveSectionItemToNewSection {
        /// Source section
        section_index: usize,
        /// Source item
        item_index: usize,
        /// Position of the new section, `-1` for the end
        to_section_index: i64,
    },

    /// Revert layout changes
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.UNDO", rename_all = "camelCase")]
    UndoLayoutChanges {
        /// Which commands to revert
        #[serde(default = "last")]
        undo_point: UndoPoint,
    },
}

const fn last() -> UndoPoint {
    UndoPoint::Last
}

impl DashboardCommand {
    /// [`Self::RenameDashboard`]
    #[must_use]
    pub fn rename(title: impl Into<String>) -> Self {
        Self::RenameDashboard {
            title: title.into(),
        }
    }

    /// [`Self::AddAttributeFilter`] appending a filter with everything selected
    #[must_use]
    pub fn add_attribute_filter(display_form: impl Into<String>) -> Self {
        Self::AddAttributeFilter {
            display_form: display_form.into(),
            index: -1,
            initial_selection: None,
        }
    }

    /// [`Self::MoveAttributeFilter`]
    #[must_use]
    pub fn move_attribute_filter(local_id: impl Into<String>, index: i64) -> Self {
        Self::MoveAttributeFilter {
            local_id: local_id.into(),
            index,
        }
    }

    /// [`Self::LoadAttributeElements`]
    #[must_use]
    pub fn load_elements(local_id: impl Into<String>) -> Self {
        Self::LoadAttributeElements {
            local_id: local_id.into(),
        }
    }

    /// [`Self::AddLayoutSection`] appending a section
    #[must_use]
    pub fn add_section(header: SectionHeader, items: Vec<LayoutItem>) -> Self {
        Self::AddLayoutSection {
            index: -1,
            header,
            items,
        }
    }

    /// [`Self::MoveSectionItem`]
    #[must_use]
    pub const fn move_item(
        section_index: usize,
        item_index: usize,
        to_section_index: i64,
        to_item_index: i64,
    ) -> Self {
        Self::MoveSectionItem {
            section_index,
            item_index,
            to_section_index,
            to_item_index,
        }
    }

    /// [`Self::UndoLayoutChanges`]
    #[must_use]
    pub const fn undo_layout(undo_point: UndoPoint) -> Self {
        Self::UndoLayoutChanges { undo_point }
    }
}

impl Command for DashboardCommand {
    fn kind(&self) -> &'static str {
        match self {
            Self::InitializeDashboard { .. } => kinds::INITIALIZE,
            Self::RenameDashboard { .. } => kinds::RENAME,
            Self::SaveDashboard => kinds::SAVE,
            Self::LoadCatalog => kinds::CATALOG_LOAD,
            Self::AddAttributeFilter { .. } => kinds::ATTRIBUTE_FILTER_ADD,
            Self::RemoveAttributeFilters { .. } => kinds::ATTRIBUTE_FILTERS_REMOVE,
            Self::MoveAttributeFilter { .. } => kinds::ATTRIBUTE_FILTER_MOVE,
            Self::ChangeAttributeFilterSelection { .. } => kinds::ATTRIBUTE_FILTER_CHANGE_SELECTION,
            Self::ChangeDateFilterSelection { .. } => kinds::DATE_FILTER_CHANGE_SELECTION,
            Self::LoadAttributeElements { .. } => kinds::ATTRIBUTE_ELEMENTS_LOAD,
            Self::CancelAttributeElementsLoad { .. } => kinds::ATTRIBUTE_ELEMENTS_CANCEL_LOAD,
            Self::AddLayoutSection { .. } => kinds::SECTION_ADD,
            Self::MoveLayoutSection { .. } => kinds::SECTION_MOVE,
            Self::RemoveLayoutSection { .. } => kinds::SECTION_REMOVE,
            Self::ChangeLayoutSectionHeader { .. } => kinds::SECTION_CHANGE_HEADER,
            Self::AddSectionItem { .. } => kinds::ITEM_ADD,
            Self::MoveSectionItem { .. } => kinds::ITEM_MOVE,
            Self::RemoveSectionItem { .. } => kinds::ITEM_REMOVE,
            Self::MoveSectionItemToNewSection { .. } => kinds::ITEM_MOVE_TO_NEW_SECTION,
            Self::UndoLayoutChanges { .. } => kinds::LAYOUT_UNDO,
        }
    }
}
