//! Filter context: the date filter and the ordered attribute filters.
//!
//! Reducers here assume the handler already validated indices and local ids;
//! an action referring to a missing filter is ignored.

use chrono::NaiveDate;
use dashflow_core::reducer::Reducer;
use serde::{Deserialize, Serialize};

/// Time granularity of a relative date filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateGranularity {
    /// Days
    Day,
    /// Weeks
    Week,
    /// Months
    Month,
    /// Quarters
    Quarter,
    /// Years
    Year,
}

/// Selection of the dashboard date filter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DateFilterSelection {
    /// No date restriction
    AllTime,
    /// Offsets relative to today, in `granularity` units (`0` is the current period)
    Relative {
        /// Unit of `from` and `to`
        granularity: DateGranularity,
        /// Start offset
        from: i32,
        /// End offset
        to: i32,
    },
    /// Fixed calendar range, both ends inclusive
    Absolute {
        /// First day
        from: NaiveDate,
        /// Last day
        to: NaiveDate,
    },
}

impl DateFilterSelection {
    /// Whether the range is well-formed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::AllTime => true,
            Self::Relative { from, to, .. } => from <= to,
            Self::Absolute { from, to } => from <= to,
        }
    }
}

/// Selected elements of an attribute filter
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSelection {
    /// Element titles
    pub elements: Vec<String>,
    /// When true the filter excludes `elements`; an empty negative
    /// selection means "all"
    pub negative: bool,
}

impl AttributeSelection {
    /// Select everything
    #[must_use]
    pub const fn all() -> Self {
        Self {
            elements: Vec::new(),
            negative: true,
        }
    }

    /// Select exactly `elements`
    #[must_use]
    pub fn only(elements: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            elements: elements.into_iter().map(Into::into).collect(),
            negative: false,
        }
    }
}

/// One attribute filter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    /// Identifier of the filter within this dashboard
    pub local_id: String,
    /// Display form the filter applies to
    pub display_form: String,
    /// Current selection
    pub selection: AttributeSelection,
}

/// The `filter_context` namespace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterContextState {
    /// Date filter selection
    pub date_filter: DateFilterSelection,
    /// Attribute filters in display order
    pub attribute_filters: Vec<AttributeFilter>,
}

impl Default for FilterContextState {
    fn default() -> Self {
        Self {
            date_filter: DateFilterSelection::AllTime,
            attribute_filters: Vec::new(),
        }
    }
}

impl FilterContextState {
    /// Position and filter with `local_id`
    #[must_use]
    pub fn find(&self, local_id: &str) -> Option<(usize, &AttributeFilter)> {
        self.attribute_filters
            .iter()
            .enumerate()
            .find(|(_, f)| f.local_id == local_id)
    }

    /// Whether a filter for `display_form` exists
    #[must_use]
    pub fn has_display_form(&self, display_form: &str) -> bool {
        self.attribute_filters
            .iter()
            .any(|f| f.display_form == display_form)
    }

    /// Local ids in display order
    #[must_use]
    pub fn local_ids(&self) -> Vec<&str> {
        self.attribute_filters
            .iter()
            .map(|f| f.local_id.as_str())
            .collect()
    }
}

/// Mutations of the `filter_context` namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterContextAction {
    /// Replace the whole filter context after a load
    Replace(FilterContextState),
    /// Insert a filter at a position
    AddAttributeFilter {
        /// Insertion position
        index: usize,
        /// The new filter
        filter: AttributeFilter,
    },
    /// Remove filters by local id
    RemoveAttributeFilters(Vec<String>),
    /// Move a filter to a position
    MoveAttributeFilter {
        /// Filter to move
        local_id: String,
        /// Position after the move
        index: usize,
    },
    /// Change a filter's selection
    ChangeAttributeSelection {
        /// Filter to change
        local_id: String,
        /// New selection
        selection: AttributeSelection,
    },
    /// Change the date filter selection
    ChangeDateFilter(DateFilterSelection),
}

/// Reducer for the `filter_context` namespace
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterContextReducer;

impl Reducer for FilterContextReducer {
    type State = FilterContextState;
    type Action = FilterContextAction;

    fn reduce(&self, state: &mut FilterContextState, action: FilterContextAction) {
        match action {
            FilterContextAction::Replace(filter_context) => *state = filter_context,
            FilterContextAction::AddAttributeFilter { index, filter } => {
                let index = index.min(state.attribute_filters.len());
                state.attribute_filters.insert(index, filter);
            },
            FilterContextAction::RemoveAttributeFilters(local_ids) => {
                state
                    .attribute_filters
                    .retain(|f| !local_ids.contains(&f.local_id));
            },
            FilterContextAction::MoveAttributeFilter { local_id, index } => {
                if let Some((from, _)) = state.find(&local_id) {
                    let filter = state.attribute_filters.remove(from);
                    let index = index.min(state.attribute_filters.len());
                    state.attribute_filters.insert(index, filter);
                }
            },
            FilterContextAction::ChangeAttributeSelection {
                local_id,
                selection,
            } => {
                if let Some(filter) = state
                    .attribute_filters
                    .iter_mut()
                    .find(|f| f.local_id == local_id)
                {
                    filter.selection = selection;
                }
            },
            FilterContextAction::ChangeDateFilter(selection) => state.date_filter = selection,
        }
    }
}
