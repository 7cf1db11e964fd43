//! Shared fixtures for dashboard integration tests

#![allow(dead_code)] // Each test binary uses a subset of the fixtures

use dashflow_dashboard::commands::DashboardCommand;
use dashflow_dashboard::events::DashboardEvent;
use dashflow_dashboard::mock::MockBackend;
use dashflow_dashboard::model::{
    Catalog, CatalogAttribute, CatalogItem, DashboardDefinition, FilterContextState, LayoutItem,
    LayoutSection, LayoutState, SectionHeader, WidgetKind,
};
use dashflow_dashboard::{Dashboard, dashboard_builder};
use dashflow_runtime::{Engine, EngineConfig};
use dashflow_testing::test_clock;
use std::sync::Arc;

pub const DASHBOARD_ID: &str = "sales-overview";

pub fn catalog() -> Catalog {
    Catalog {
        metrics: vec![
            CatalogItem::new("revenue", "Revenue"),
            CatalogItem::new("margin", "Margin"),
        ],
        facts: vec![CatalogItem::new("amount", "Amount")],
        attributes: ["region", "product", "channel", "segment"]
            .into_iter()
            .map(|id| CatalogAttribute {
                id: id.into(),
                title: id.to_uppercase(),
                display_forms: vec![format!("{id}.name")],
            })
            .collect(),
    }
}

pub fn item(widget_id: &str) -> LayoutItem {
    LayoutItem::new(widget_id, WidgetKind::Insight, widget_id)
}

pub fn section(title: &str, widget_ids: &[&str]) -> LayoutSection {
    LayoutSection {
        header: SectionHeader::titled(title),
        items: widget_ids.iter().map(|id| item(id)).collect(),
    }
}

/// Two sections: `[a, b]` and `[c]`
pub fn layout() -> LayoutState {
    LayoutState {
        sections: vec![section("Top", &["a", "b"]), section("Bottom", &["c"])],
    }
}

pub fn definition() -> DashboardDefinition {
    DashboardDefinition {
        id: DASHBOARD_ID.into(),
        title: "Sales overview".into(),
        revision: 1,
        filter_context: FilterContextState::default(),
        layout: layout(),
    }
}

pub fn backend() -> MockBackend {
    MockBackend::new()
        .with_dashboard(definition())
        .with_catalog(catalog())
        .with_elements("region.name", ["East", "West"])
        .with_elements("product.name", ["Laptop", "Phone", "Tablet"])
        .with_elements("channel.name", ["Online"])
}

/// Engine over `backend` with a fixed clock
pub fn engine_with(backend: &MockBackend) -> Engine<Dashboard> {
    dashboard_builder(Arc::new(backend.clone()), EngineConfig::default())
        .expect("dashboard handlers are bound once")
        .with_clock(Arc::new(test_clock()))
        .build()
}

/// Engine over `backend` with the fixture dashboard loaded
pub async fn initialized(backend: &MockBackend) -> Engine<Dashboard> {
    let engine = engine_with(backend);
    let outcome = engine
        .dispatch(DashboardCommand::InitializeDashboard {
            dashboard_id: DASHBOARD_ID.into(),
        })
        .await;
    assert!(!outcome.is_failure(), "initialize failed: {outcome:?}");
    engine
}

/// Add filters for `display_forms` in order and return their local ids
pub async fn add_filters(engine: &Engine<Dashboard>, display_forms: &[&str]) -> Vec<String> {
    let mut local_ids = Vec::new();
    for display_form in display_forms {
        let outcome = engine
            .dispatch(DashboardCommand::add_attribute_filter(*display_form))
            .await;
        let Some(DashboardEvent::AttributeFilterAdded { filter, .. }) = outcome.domain() else {
            panic!("adding {display_form} failed: {outcome:?}");
        };
        local_ids.push(filter.local_id.clone());
    }
    local_ids
}

/// Widget ids per section of the current layout
pub fn widget_ids(engine: &Engine<Dashboard>) -> Vec<Vec<String>> {
    engine.store().select(|s| {
        s.layout
            .widget_ids()
            .into_iter()
            .map(|ids| ids.into_iter().map(String::from).collect())
            .collect()
    })
}
