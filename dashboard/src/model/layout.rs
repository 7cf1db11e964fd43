//! Fluid layout: ordered sections, each holding ordered widget items.
//!
//! Every layout mutation is undoable; the `layout` namespace is restored as
//! a whole from the undo log.

use dashflow_core::reducer::Reducer;
use serde::{Deserialize, Serialize};

/// Kind of widget placed in the layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    /// Visualization of a saved insight
    Insight,
    /// Single key performance indicator
    Kpi,
    /// Static text
    RichText,
}

/// One widget in a section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    /// Widget identifier, unique within the dashboard
    pub widget_id: String,
    /// Widget kind
    pub kind: WidgetKind,
    /// Title shown above the widget
    pub title: String,
    /// Width in grid columns (1..=12)
    pub width: u8,
}

impl LayoutItem {
    /// Full-width widget
    #[must_use]
    pub fn new(widget_id: impl Into<String>, kind: WidgetKind, title: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
            kind,
            title: title.into(),
            width: 12,
        }
    }
}

/// Optional title and description of a section
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHeader {
    /// Section title
    pub title: Option<String>,
    /// Section description
    pub description: Option<String>,
}

impl SectionHeader {
    /// Header with only a title
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    /// `self` with every field `update` sets replaced
    #[must_use]
    pub fn merged(&self, update: &Self) -> Self {
        Self {
            title: update.title.clone().or_else(|| self.title.clone()),
            description: update
                .description
                .clone()
                .or_else(|| self.description.clone()),
        }
    }
}

/// One row of the layout
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSection {
    /// Header
    pub header: SectionHeader,
    /// Items in display order
    pub items: Vec<LayoutItem>,
}

/// The `layout` namespace
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    /// Sections in display order
    pub sections: Vec<LayoutSection>,
}

impl LayoutState {
    /// Item at `section`/`item`
    #[must_use]
    pub fn item(&self, section: usize, item: usize) -> Option<&LayoutItem> {
        self.sections.get(section)?.items.get(item)
    }

    /// Whether any section holds a widget with `widget_id`
    #[must_use]
    pub fn contains_widget(&self, widget_id: &str) -> bool {
        self.sections
            .iter()
            .flat_map(|s| &s.items)
            .any(|i| i.widget_id == widget_id)
    }

    /// Widget ids per section, for compact assertions and logs
    #[must_use]
    pub fn widget_ids(&self) -> Vec<Vec<&str>> {
        self.sections
            .iter()
            .map(|s| s.items.iter().map(|i| i.widget_id.as_str()).collect())
            .collect()
    }
}

/// Mutations of the `layout` namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutAction {
    /// Replace the whole layout after a load
    Replace(LayoutState),
    /// Insert a section
    AddSection {
        /// Insertion position
        index: usize,
        /// The new section
        section: LayoutSection,
    },
    /// Move a section
    MoveSection {
        /// Current position
        from: usize,
        /// Position after the move
        to: usize,
    },
    /// Remove a section
    RemoveSection(usize),
    /// Replace a section header
    ChangeSectionHeader {
        /// Section position
        index: usize,
        /// New header
        header: SectionHeader,
    },
    /// Insert items into a section
    AddItems {
        /// Section position
        section: usize,
        /// Position of the first inserted item
        index: usize,
        /// Items to insert, in order
        items: Vec<LayoutItem>,
    },
    /// Move an item within or across sections
    MoveItem {
        /// Source section
        section: usize,
        /// Source item position
        item: usize,
        /// Target section
        to_section: usize,
        /// Target item position, counted after removal from the source
        to_item: usize,
    },
    /// Remove an item
    RemoveItem {
        /// Section position
        section: usize,
        /// Item position
        item: usize,
    },
}

/// Reducer for the `layout` namespace
#[derive(Clone, Copy, Debug, Default)]
pub struct LayoutReducer;

impl Reducer for LayoutReducer {
    type State = LayoutState;
    type Action = LayoutAction;

    fn reduce(&self, state: &mut LayoutState, action: LayoutAction) {
        let sections = &mut state.sections;
        match action {
            LayoutAction::Replace(layout) => *state = layout,
            LayoutAction::AddSection { index, section } => {
                sections.insert(index.min(sections.len()), section);
            },
            LayoutAction::MoveSection { from, to } => {
                if from < sections.len() {
                    let section = sections.remove(from);
                    sections.insert(to.min(sections.len()), section);
                }
            },
            LayoutAction::RemoveSection(index) => {
                if index < sections.len() {
                    sections.remove(index);
                }
            },
            LayoutAction::ChangeSectionHeader { index, header } => {
                if let Some(section) = sections.get_mut(index) {
                    section.header = header;
                }
            },
            LayoutAction::AddItems {
                section,
                index,
                items,
            } => {
                if let Some(section) = sections.get_mut(section) {
                    let index = index.min(section.items.len());
                    section.items.splice(index..index, items);
                }
            },
            LayoutAction::MoveItem {
                section,
                item,
                to_section,
                to_item,
            } => {
                if to_section >= sections.len() {
                    return;
                }
                let Some(source) = sections.get_mut(section) else {
                    return;
                };
                if item >= source.items.len() {
                    return;
                }
                let moved = source.items.remove(item);
                let target = &mut sections[to_section].items;
                target.insert(to_item.min(target.len()), moved);
            },
            LayoutAction::RemoveItem { section, item } => {
                if let Some(section) = sections.get_mut(section)
                    && item < section.items.len()
                {
                    section.items.remove(item);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashflow_testing::ReducerTest;

    fn section(ids: &[&str]) -> LayoutSection {
        LayoutSection {
            header: SectionHeader::default(),
            items: ids
                .iter()
                .map(|id| LayoutItem::new(*id, WidgetKind::Insight, *id))
                .collect(),
        }
    }

    fn layout(sections: &[&[&str]]) -> LayoutState {
        LayoutState {
            sections: sections.iter().map(|ids| section(ids)).collect(),
        }
    }

    #[test]
    fn test_move_item_across_sections() {
        ReducerTest::new(LayoutReducer)
            .given_state(layout(&[&["a", "b"], &["c"]]))
            .when_action(LayoutAction::MoveItem {
                section: 0,
                item: 0,
                to_section: 1,
                to_item: 1,
            })
            .then_state(|state| {
                assert_eq!(state.widget_ids(), vec![vec!["b"], vec!["c", "a"]]);
            })
            .run();
    }

    #[test]
    fn test_move_item_within_section() {
        ReducerTest::new(LayoutReducer)
            .given_state(layout(&[&["a", "b", "c"]]))
            .when_action(LayoutAction::MoveItem {
                section: 0,
                item: 0,
                to_section: 0,
                to_item: 2,
            })
            .then_state(|state| {
                assert_eq!(state.widget_ids(), vec![vec!["b", "c", "a"]]);
            })
            .run();
    }

    #[test]
    fn test_sections_add_move_remove() {
        ReducerTest::new(LayoutReducer)
            .given_state(layout(&[&["a"], &["b"]]))
            .when_action(LayoutAction::AddSection {
                index: 1,
                section: section(&["new"]),
            })
            .when_action(LayoutAction::MoveSection { from: 0, to: 2 })
            .when_action(LayoutAction::RemoveSection(1))
            .then_state(|state| {
                assert_eq!(state.widget_ids(), vec![vec!["new"], vec!["a"]]);
            })
            .run();
    }

    #[test]
    fn test_add_items_keeps_order() {
        ReducerTest::new(LayoutReducer)
            .given_state(layout(&[&["a", "d"]]))
            .when_action(LayoutAction::AddItems {
                section: 0,
                index: 1,
                items: section(&["b", "c"]).items,
            })
            .then_state(|state| {
                assert_eq!(state.widget_ids(), vec![vec!["a", "b", "c", "d"]]);
                assert!(state.contains_widget("c"));
                assert_eq!(state.item(0, 3).map(|i| i.widget_id.as_str()), Some("d"));
            })
            .run();
    }

    #[test]
    fn test_header_merge() {
        let current = SectionHeader {
            title: Some("KPIs".into()),
            description: Some("Top line".into()),
        };
        let update = SectionHeader {
            title: None,
            description: Some("Quarterly".into()),
        };
        assert_eq!(
            current.merged(&update),
            SectionHeader {
                title: Some("KPIs".into()),
                description: Some("Quarterly".into()),
            }
        );
    }
}
