//! Dashboard state tree and its reducers.
//!
//! The root state is split into five namespaces, each owned by one reducer:
//!
//! | namespace        | slice                  | undoable |
//! |------------------|------------------------|----------|
//! | `meta`           | [`MetaState`]          | no       |
//! | `filter_context` | [`FilterContextState`] | no       |
//! | `layout`         | [`LayoutState`]        | yes      |
//! | `catalog`        | `Option<Catalog>`      | no       |
//! | `elements`       | [`ElementsState`]      | no       |

pub mod catalog;
pub mod elements;
pub mod filter_context;
pub mod layout;
pub mod meta;

pub use catalog::{Catalog, CatalogAction, CatalogAttribute, CatalogItem, CatalogReducer};
pub use elements::{AttributeElement, ElementsAction, ElementsReducer, ElementsState};
pub use filter_context::{
    AttributeFilter, AttributeSelection, DateFilterSelection, DateGranularity,
    FilterContextAction, FilterContextReducer, FilterContextState,
};
pub use layout::{
    LayoutAction, LayoutItem, LayoutReducer, LayoutSection, LayoutState, SectionHeader, WidgetKind,
};
pub use meta::{MetaAction, MetaReducer, MetaState};

use crate::commands::DashboardCommand;
use crate::events::DashboardEvent;
use dashflow_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use dashflow_core::reducer::Namespaced;
use dashflow_core::{Domain, RestoreNamespace};
use serde::{Deserialize, Serialize};

/// Namespace of [`MetaState`]
pub const META: &str = "meta";
/// Namespace of [`FilterContextState`]
pub const FILTER_CONTEXT: &str = "filter_context";
/// Namespace of [`LayoutState`]
pub const LAYOUT: &str = "layout";
/// Namespace of the catalog
pub const CATALOG: &str = "catalog";
/// Namespace of [`ElementsState`]
pub const ELEMENTS: &str = "elements";

/// Root of the dashboard state tree
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    /// Identity and save bookkeeping
    pub meta: MetaState,
    /// Date and attribute filters
    pub filter_context: FilterContextState,
    /// Sections and widgets
    pub layout: LayoutState,
    /// Catalog, `None` until loaded
    pub catalog: Option<Catalog>,
    /// Attribute elements per filter
    pub elements: ElementsState,
}

impl RestoreNamespace for DashboardState {
    fn restore_namespace(&mut self, namespace: &str, earlier: &Self) -> bool {
        match namespace {
            LAYOUT => {
                self.layout.clone_from(&earlier.layout);
                true
            },
            _ => false,
        }
    }
}

/// A mutation of exactly one namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardAction {
    /// `meta` mutation
    Meta(MetaAction),
    /// `filter_context` mutation
    FilterContext(FilterContextAction),
    /// `layout` mutation
    Layout(LayoutAction),
    /// `catalog` mutation
    Catalog(CatalogAction),
    /// `elements` mutation
    Elements(ElementsAction),
}

impl Namespaced for DashboardAction {
    fn namespace(&self) -> &'static str {
        match self {
            Self::Meta(_) => META,
            Self::FilterContext(_) => FILTER_CONTEXT,
            Self::Layout(_) => LAYOUT,
            Self::Catalog(_) => CATALOG,
            Self::Elements(_) => ELEMENTS,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Meta(MetaAction::Initialize { .. }) => "meta/initialize",
            Self::Meta(MetaAction::Rename(_)) => "meta/rename",
            Self::Meta(MetaAction::MarkSaved { .. }) => "meta/markSaved",
            Self::FilterContext(action) => match action {
                FilterContextAction::Replace(_) => "filterContext/replace",
                FilterContextAction::AddAttributeFilter { .. } => "filterContext/addAttributeFilter",
                FilterContextAction::RemoveAttributeFilters(_) => {
                    "filterContext/removeAttributeFilters"
                },
                FilterContextAction::MoveAttributeFilter { .. } => {
                    "filterContext/moveAttributeFilter"
                },
                FilterContextAction::ChangeAttributeSelection { .. } => {
                    "filterContext/changeAttributeSelection"
                },
                FilterContextAction::ChangeDateFilter(_) => "filterContext/changeDateFilter",
            },
            Self::Layout(action) => match action {
                LayoutAction::Replace(_) => "layout/replace",
                LayoutAction::AddSection { .. } => "layout/addSection",
                LayoutAction::MoveSection { .. } => "layout/moveSection",
                LayoutAction::RemoveSection(_) => "layout/removeSection",
                LayoutAction::ChangeSectionHeader { .. } => "layout/changeSectionHeader",
                LayoutAction::AddItems { .. } => "layout/addItems",
                LayoutAction::MoveItem { .. } => "layout/moveItem",
                LayoutAction::RemoveItem { .. } => "layout/removeItem",
            },
            Self::Catalog(CatalogAction::Set(_)) => "catalog/set",
            Self::Catalog(CatalogAction::Clear) => "catalog/clear",
            Self::Elements(ElementsAction::Set { .. }) => "elements/set",
            Self::Elements(ElementsAction::Remove(_)) => "elements/remove",
        }
    }
}

impl From<MetaAction> for DashboardAction {
    fn from(action: MetaAction) -> Self {
        Self::Meta(action)
    }
}

impl From<FilterContextAction> for DashboardAction {
    fn from(action: FilterContextAction) -> Self {
        Self::FilterContext(action)
    }
}

impl From<LayoutAction> for DashboardAction {
    fn from(action: LayoutAction) -> Self {
        Self::Layout(action)
    }
}

impl From<CatalogAction> for DashboardAction {
    fn from(action: CatalogAction) -> Self {
        Self::Catalog(action)
    }
}

impl From<ElementsAction> for DashboardAction {
    fn from(action: ElementsAction) -> Self {
        Self::Elements(action)
    }
}

/// Root reducer type of the dashboard
pub type DashboardReducer = CombinedReducer<DashboardState, DashboardAction>;

/// Build the root reducer out of the namespace reducers
#[must_use]
pub fn dashboard_reducer() -> DashboardReducer {
    combine_reducers::<DashboardState, DashboardAction>(vec![
        Box::new(scope_reducer(
            MetaReducer,
            |s: &mut DashboardState| &mut s.meta,
            |a: DashboardAction| match a {
                DashboardAction::Meta(a) => Some(a),
                _ => None,
            },
        )),
        Box::new(scope_reducer(
            FilterContextReducer,
            |s: &mut DashboardState| &mut s.filter_context,
            |a: DashboardAction| match a {
                DashboardAction::FilterContext(a) => Some(a),
                _ => None,
            },
        )),
        Box::new(scope_reducer(
            LayoutReducer,
            |s: &mut DashboardState| &mut s.layout,
            |a: DashboardAction| match a {
                DashboardAction::Layout(a) => Some(a),
                _ => None,
            },
        )),
        Box::new(scope_reducer(
            CatalogReducer,
            |s: &mut DashboardState| &mut s.catalog,
            |a: DashboardAction| match a {
                DashboardAction::Catalog(a) => Some(a),
                _ => None,
            },
        )),
        Box::new(scope_reducer(
            ElementsReducer,
            |s: &mut DashboardState| &mut s.elements,
            |a: DashboardAction| match a {
                DashboardAction::Elements(a) => Some(a),
                _ => None,
            },
        )),
    ])
}

/// Marker binding the dashboard types to the engine
#[derive(Debug, Clone, Copy)]
pub struct Dashboard;

impl Domain for Dashboard {
    type State = DashboardState;
    type Action = DashboardAction;
    type Command = DashboardCommand;
    type Event = DashboardEvent;
    type Reducer = DashboardReducer;
}

/// Persisted form of a dashboard, as exchanged with the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDefinition {
    /// Backend identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Revision the definition was read at or written as
    pub revision: u64,
    /// Filters
    pub filter_context: FilterContextState,
    /// Layout
    pub layout: LayoutState,
}

impl DashboardDefinition {
    /// Definition describing the current state of `state`
    ///
    /// Returns `None` for an uninitialized dashboard.
    #[must_use]
    pub fn from_state(state: &DashboardState) -> Option<Self> {
        Some(Self {
            id: state.meta.id.clone()?,
            title: state.meta.title.clone(),
            revision: state.meta.saved_revision.unwrap_or_default(),
            filter_context: state.filter_context.clone(),
            layout: state.layout.clone(),
        })
    }
}
