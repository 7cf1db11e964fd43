//! Dashflow demo - a scripted dashboard editing session
//!
//! Runs the dashboard engine against the in-memory backend and prints the
//! Prometheus metrics the session produced.
//!
//! # Running the Demo
//!
//! ```bash
//! RUST_LOG=info,dashflow_runtime=debug cargo run --bin dashflow-demo
//! ```
//!
//! Engine settings come from `DASHFLOW_*` environment variables.

#![allow(missing_docs)]

use dashflow_core::Command;
use dashflow_dashboard::commands::DashboardCommand;
use dashflow_dashboard::mock::MockBackend;
use dashflow_dashboard::model::{
    AttributeSelection, Catalog, CatalogAttribute, CatalogItem, DashboardDefinition,
    FilterContextState, LayoutItem, LayoutSection, LayoutState, SectionHeader, WidgetKind,
};
use dashflow_dashboard::{Dashboard, dashboard_engine};
use dashflow_runtime::metrics::MetricsRecorder;
use dashflow_runtime::{Engine, EngineConfig, UndoPoint};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn demo_backend() -> MockBackend {
    let layout = LayoutState {
        sections: vec![LayoutSection {
            header: SectionHeader::titled("Overview"),
            items: vec![
                LayoutItem::new("kpi-revenue", WidgetKind::Kpi, "Revenue"),
                LayoutItem::new("insight-trend", WidgetKind::Insight, "Revenue trend"),
            ],
        }],
    };
    MockBackend::new()
        .with_latency(Duration::from_millis(20))
        .with_dashboard(DashboardDefinition {
            id: "sales-overview".into(),
            title: "Sales overview".into(),
            revision: 1,
            filter_context: FilterContextState::default(),
            layout,
        })
        .with_catalog(Catalog {
            metrics: vec![CatalogItem::new("revenue", "Revenue")],
            facts: vec![CatalogItem::new("amount", "Amount")],
            attributes: vec![CatalogAttribute {
                id: "region".into(),
                title: "Region".into(),
                display_forms: vec!["region.name".into()],
            }],
        })
        .with_elements("region.name", ["East", "West", "North", "South"])
}

/// Dispatch `command`, logging how it was answered
async fn step(engine: &Engine<Dashboard>, command: DashboardCommand) -> anyhow::Result<()> {
    let kind = command.kind();
    let event = engine.dispatch_and_wait(command).await?;
    match event.failure() {
        Some(failed) => {
            tracing::warn!(kind, reason = %failed.reason, message = %failed.message, "Step failed");
        },
        None => tracing::info!(kind, answer = event.event_type(), "Step done"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dashflow_runtime=info,dashflow_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dashflow demo");

    // 2. Install Prometheus recorder
    let mut recorder = MetricsRecorder::new();
    recorder.install()?;
    dashflow_dashboard::describe_metrics();

    // 3. Build the engine
    let backend = demo_backend();
    let engine = dashboard_engine(Arc::new(backend.clone()), EngineConfig::from_env()?)?;
    let _log = engine.subscribe(
        |event| event.domain().is_some(),
        |event, snapshot| {
            tracing::debug!(
                event = event.event_type(),
                sequence = event.context.sequence,
                revision = snapshot.revision(),
                "Delivered"
            );
            Ok(())
        },
    );

    // 4. Scripted session
    step(&engine, DashboardCommand::InitializeDashboard {
        dashboard_id: "sales-overview".into(),
    })
    .await?;
    step(&engine, DashboardCommand::LoadCatalog).await?;
    step(&engine, DashboardCommand::LoadCatalog).await?;

    step(&engine, DashboardCommand::add_attribute_filter("region.name")).await?;
    let local_id = engine
        .store()
        .select(|s| s.filter_context.local_ids().first().map(ToString::to_string))
        .unwrap_or_default();

    // A second load supersedes the first; only its elements reach the store
    let (first, second) = tokio::join!(
        engine.dispatch(DashboardCommand::load_elements(local_id.clone())),
        engine.dispatch(DashboardCommand::load_elements(local_id.clone())),
    );
    tracing::info!(
        first_canceled = first.is_canceled(),
        second_canceled = second.is_canceled(),
        "Concurrent element loads finished"
    );

    step(&engine, DashboardCommand::ChangeAttributeFilterSelection {
        local_id: local_id.clone(),
        selection: AttributeSelection::only(["East", "West"]),
    })
    .await?;
    step(&engine, DashboardCommand::move_attribute_filter(local_id, 5)).await?;

    step(
        &engine,
        DashboardCommand::add_section(SectionHeader::titled("Details"), Vec::new()),
    )
    .await?;
    step(&engine, DashboardCommand::MoveSectionItemToNewSection {
        section_index: 0,
        item_index: 1,
        to_section_index: -1,
    })
    .await?;
    let layout = engine.store().select(|s| {
        s.layout
            .widget_ids()
            .iter()
            .map(|ids| ids.join(","))
            .collect::<Vec<_>>()
    });
    tracing::info!(?layout, "Layout before undo");
    step(&engine, DashboardCommand::undo_layout(UndoPoint::Last)).await?;
    step(&engine, DashboardCommand::SaveDashboard).await?;

    // 5. Report
    let health = engine.health();
    tracing::info!(status = %health.status, "Final health check");
    for check in health.problems() {
        tracing::warn!(component = %check.component, message = ?check.message, "Component needs attention");
    }
    tracing::info!(
        saved_revision = backend.dashboard("sales-overview").map(|d| d.revision),
        diagnostics = engine.diagnostics().entries().len(),
        "Session finished"
    );

    if let Some(text) = recorder.render() {
        println!("{text}");
    }

    engine.shutdown().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
