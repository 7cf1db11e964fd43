//! Dashboard events.
//!
//! Every command has one primary event. Events carry enough of the state
//! before and after the change for a listener to react without diffing
//! snapshots.

use crate::commands::DashboardCommand;
use crate::model::{
    AttributeFilter, AttributeSelection, DateFilterSelection, LayoutItem, LayoutSection,
    SectionHeader,
};
use dashflow_core::DomainEvent;
use serde::{Deserialize, Serialize};

/// Where a loaded catalog came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogSource {
    /// Already present in the store
    Store,
    /// Fetched through the `metricsAndFacts` query
    Backend,
}

/// Every event the dashboard emits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DashboardEvent {
    /// A dashboard was loaded into the store
    #[serde(rename = "GDC.DASH/EVT.INITIALIZED", rename_all = "camelCase")]
    DashboardInitialized {
        /// Backend identifier
        dashboard_id: String,
        /// Loaded title
        title: String,
        /// Loaded revision
        revision: u64,
    },

    /// The title changed
    #[serde(rename = "GDC.DASH/EVT.RENAMED", rename_all = "camelCase")]
    DashboardRenamed {
        /// Title before
        previous_title: String,
        /// Title after
        title: String,
    },

    /// The dashboard was persisted
    #[serde(rename = "GDC.DASH/EVT.SAVED", rename_all = "camelCase")]
    DashboardSaved {
        /// Backend identifier
        dashboard_id: String,
        /// Revision assigned by the backend
        revision: u64,
    },

    /// The catalog is available in the store
    #[serde(rename = "GDC.DASH/EVT.CATALOG.LOADED", rename_all = "camelCase")]
    CatalogLoaded {
        /// Where it came from
        source: CatalogSource,
        /// Number of metrics
        metrics: usize,
        /// Number of facts
        facts: usize,
        /// Number of attributes
        attributes: usize,
    },

    /// An attribute filter was added
    #[serde(
        rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADDED",
        rename_all = "camelCase"
    )]
    AttributeFilterAdded {
        /// The new filter
        filter: AttributeFilter,
        /// Its position
        index: usize,
    },

    /// Attribute filters were removed
    #[serde(
        rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTERS.REMOVED",
        rename_all = "camelCase"
    )]
    AttributeFiltersRemoved {
        /// The removed filters, in their former order
        removed: Vec<AttributeFilter>,
    },

    /// An attribute filter moved
    #[serde(
        rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVED",
        rename_all = "camelCase"
    )]
    AttributeFilterMoved {
        /// The moved filter
        local_id: String,
        /// Position before
        from_index: usize,
        /// Position after
        to_index: usize,
    },

    /// An attribute filter selection changed
    #[serde(
        rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.SELECTION_CHANGED",
        rename_all = "camelCase"
    )]
    AttributeFilterSelectionChanged {
        /// The changed filter
        local_id: String,
        /// Selection before
        previous: AttributeSelection,
        /// Selection after
        selection: AttributeSelection,
    },

    /// The date filter changed
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.DATE_FILTER.SELECTION_CHANGED")]
    DateFilterSelectionChanged {
        /// Selection before
        previous: DateFilterSelection,
        /// Selection after
        selection: DateFilterSelection,
    },

    /// Elements of an attribute filter were loaded into the store
    #[serde(rename = "GDC.DASH/EVT.ATTRIBUTE_ELEMENTS.LOADED", rename_all = "camelCase")]
    AttributeElementsLoaded {
        /// Filter the elements belong to
        local_id: String,
        /// Number of elements
        count: usize,
    },

    /// A cancel request for an element load was processed
    #[serde(
        rename = "GDC.DASH/EVT.ATTRIBUTE_ELEMENTS.LOAD_CANCELED",
        rename_all = "camelCase"
    )]
    AttributeElementsLoadCanceled {
        /// Filter whose load was targeted
        local_id: String,
        /// Whether a load was running
        was_running: bool,
    },

    /// A section was added
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_ADDED", rename_all = "camelCase")]
    LayoutSectionAdded {
        /// The new section
        section: LayoutSection,
        /// Its position
        index: usize,
    },

    /// A section moved
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_MOVED", rename_all = "camelCase")]
    LayoutSectionMoved {
        /// Position before
        from_index: usize,
        /// Position after
        to_index: usize,
    },

    /// A section was removed
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_REMOVED", rename_all = "camelCase")]
    LayoutSectionRemoved {
        /// The removed section
        section: LayoutSection,
        /// Its former position
        index: usize,
    },

    /// A section header changed
    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_HEADER_CHANGED",
        rename_all = "camelCase"
    )]
    LayoutSectionHeaderChanged {
        /// Section position
        index: usize,
        /// Header before
        previous: SectionHeader,
        /// Header after
        header: SectionHeader,
    },

    /// An item was added
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEMS_ADDED", rename_all = "camelCase")]
    LayoutItemAdded {
        /// Section position
        section_index: usize,
        /// Item position
        item_index: usize,
        /// The new item
        item: LayoutItem,
    },

    /// An item moved
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_MOVED", rename_all = "camelCase")]
    LayoutItemMoved {
        /// The moved item
        item: LayoutItem,
        /// Source section
        from_section_index: usize,
        /// Source position
        from_item_index: usize,
        /// Target section
        to_section_index: usize,
        /// Target position
        to_item_index: usize,
    },

    /// An item was removed
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REMOVED", rename_all = "camelCase")]
    LayoutItemRemoved {
        /// The removed item
        item: LayoutItem,
        /// Section position
        section_index: usize,
        /// Former item position
        item_index: usize,
        /// Whether the emptied section was removed as well
        section_removed: bool,
    },

    /// An item moved into a new section
    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_MOVED_TO_NEW_SECTION",
        rename_all = "camelCase"
    )]
    LayoutItemMovedToNewSection {
        /// The moved item
        item: LayoutItem,
        /// Source section, as numbered before the move
        from_section_index: usize,
        /// Source position
        from_item_index: usize,
        /// Position of the new section
        to_section_index: usize,
    },

    /// Layout changes were reverted
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.CHANGES_UNDONE", rename_all = "camelCase")]
    LayoutChangesUndone {
        /// Reverted commands, oldest first; steps of a composed command are
        /// listed individually
        undone: Vec<DashboardCommand>,
    },
}

impl DomainEvent for DashboardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::DashboardInitialized { .. } => "GDC.DASH/EVT.INITIALIZED",
            Self::DashboardRenamed { .. } => "GDC.DASH/EVT.RENAMED",
            Self::DashboardSaved { .. } => "GDC.DASH/EVT.SAVED",
            Self::CatalogLoaded { .. } => "GDC.DASH/EVT.CATALOG.LOADED",
            Self::AttributeFilterAdded { .. } => {
                "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADDED"
            },
            Self::AttributeFiltersRemoved { .. } => {
                "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTERS.REMOVED"
            },
            Self::AttributeFilterMoved { .. } => {
                "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVED"
            },
            Self::AttributeFilterSelectionChanged { .. } => {
                "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.SELECTION_CHANGED"
            },
            Self::DateFilterSelectionChanged { .. } => {
                "GDC.DASH/EVT.FILTER_CONTEXT.DATE_FILTER.SELECTION_CHANGED"
            },
            Self::AttributeElementsLoaded { .. } => "GDC.DASH/EVT.ATTRIBUTE_ELEMENTS.LOADED",
            Self::AttributeElementsLoadCanceled { .. } => {
                "GDC.DASH/EVT.ATTRIBUTE_ELEMENTS.LOAD_CANCELED"
            },
            Self::LayoutSectionAdded { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_ADDED",
            Self::LayoutSectionMoved { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_MOVED",
            Self::LayoutSectionRemoved { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_REMOVED",
            Self::LayoutSectionHeaderChanged { .. } => {
                "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_HEADER_CHANGED"
            },
            Self::LayoutItemAdded { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.ITEMS_ADDED",
            Self::LayoutItemMoved { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_MOVED",
            Self::LayoutItemRemoved { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REMOVED",
            Self::LayoutItemMovedToNewSection { .. } => {
                "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_MOVED_TO_NEW_SECTION"
            },
            Self::LayoutChangesUndone { .. } => "GDC.DASH/EVT.FLUID_LAYOUT.CHANGES_UNDONE",
        }
    }
}
