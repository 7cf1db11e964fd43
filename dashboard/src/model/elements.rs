//! Loaded attribute elements, keyed by the local id of the filter that
//! requested them.

use dashflow_core::reducer::Reducer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value of an attribute
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeElement {
    /// Display title
    pub title: String,
    /// Backend reference, absent for computed elements
    pub uri: Option<String>,
}

impl AttributeElement {
    /// Element without a backend reference
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: None,
        }
    }
}

/// The `elements` namespace
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementsState {
    /// Elements per filter local id
    pub by_filter: BTreeMap<String, Vec<AttributeElement>>,
}

impl ElementsState {
    /// Elements loaded for `local_id`
    #[must_use]
    pub fn get(&self, local_id: &str) -> Option<&[AttributeElement]> {
        self.by_filter.get(local_id).map(Vec::as_slice)
    }
}

/// Mutations of the `elements` namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementsAction {
    /// Replace the elements of one filter
    Set {
        /// Filter the elements belong to
        local_id: String,
        /// Loaded elements
        elements: Vec<AttributeElement>,
    },
    /// Drop the elements of removed filters
    Remove(Vec<String>),
}

/// Reducer for the `elements` namespace
#[derive(Clone, Copy, Debug, Default)]
pub struct ElementsReducer;

impl Reducer for ElementsReducer {
    type State = ElementsState;
    type Action = ElementsAction;

    fn reduce(&self, state: &mut ElementsState, action: ElementsAction) {
        match action {
            ElementsAction::Set { local_id, elements } => {
                state.by_filter.insert(local_id, elements);
            },
            ElementsAction::Remove(local_ids) => {
                for local_id in &local_ids {
                    state.by_filter.remove(local_id);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashflow_testing::ReducerTest;

    #[test]
    fn test_set_replaces_and_remove_drops() {
        ReducerTest::new(ElementsReducer)
            .given_state(ElementsState::default())
            .when_action(ElementsAction::Set {
                local_id: "f1".into(),
                elements: vec![AttributeElement::titled("East")],
            })
            .when_action(ElementsAction::Set {
                local_id: "f1".into(),
                elements: vec![
                    AttributeElement::titled("North"),
                    AttributeElement::titled("South"),
                ],
            })
            .when_action(ElementsAction::Set {
                local_id: "f2".into(),
                elements: Vec::new(),
            })
            .when_action(ElementsAction::Remove(vec!["f2".into()]))
            .then_state(|state| {
                assert_eq!(state.get("f1").map(<[_]>::len), Some(2));
                assert!(state.get("f2").is_none());
            })
            .run();
    }
}
