//! Workspace catalog: the metrics, facts and attributes a dashboard can use.

use dashflow_core::reducer::Reducer;
use serde::{Deserialize, Serialize};

/// A metric or fact
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Identifier
    pub id: String,
    /// Display title
    pub title: String,
}

impl CatalogItem {
    /// Create an item
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// An attribute with its display forms
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAttribute {
    /// Identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Display forms an attribute filter can reference
    pub display_forms: Vec<String>,
}

/// Metrics, facts and attributes available to a dashboard
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Metrics
    pub metrics: Vec<CatalogItem>,
    /// Facts
    pub facts: Vec<CatalogItem>,
    /// Attributes
    pub attributes: Vec<CatalogAttribute>,
}

impl Catalog {
    /// Whether any attribute offers `display_form`
    #[must_use]
    pub fn has_display_form(&self, display_form: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.display_forms.iter().any(|d| d == display_form))
    }
}

/// Mutations of the `catalog` namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogAction {
    /// Store a loaded catalog
    Set(Catalog),
    /// Forget the catalog
    Clear,
}

/// Reducer for the `catalog` namespace; the slice is `None` until loaded
#[derive(Clone, Copy, Debug, Default)]
pub struct CatalogReducer;

impl Reducer for CatalogReducer {
    type State = Option<Catalog>;
    type Action = CatalogAction;

    fn reduce(&self, state: &mut Option<Catalog>, action: CatalogAction) {
        *state = match action {
            CatalogAction::Set(catalog) => Some(catalog),
            CatalogAction::Clear => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashflow_testing::ReducerTest;

    #[test]
    fn test_set_then_clear() {
        let catalog = Catalog {
            metrics: vec![CatalogItem::new("m1", "Revenue")],
            ..Catalog::default()
        };
        ReducerTest::new(CatalogReducer)
            .given_state(None)
            .when_action(CatalogAction::Set(catalog))
            .then_state(|state| {
                assert_eq!(state.as_ref().map(|c| c.metrics.len()), Some(1));
            })
            .run();

        ReducerTest::new(CatalogReducer)
            .given_state(Some(Catalog::default()))
            .when_action(CatalogAction::Clear)
            .then_state(|state| assert!(state.is_none()))
            .run();
    }

    #[test]
    fn test_display_form_lookup() {
        let catalog = Catalog {
            attributes: vec![CatalogAttribute {
                id: "region".into(),
                title: "Region".into(),
                display_forms: vec!["region.name".into(), "region.code".into()],
            }],
            ..Catalog::default()
        };
        assert!(catalog.has_display_form("region.code"));
        assert!(!catalog.has_display_form("product.name"));
    }
}
