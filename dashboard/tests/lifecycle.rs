//! Integration tests for initialize, rename and save

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{DASHBOARD_ID, add_filters, backend, definition, engine_with, initialized, widget_ids};
use dashflow_core::FailureReason;
use dashflow_core::environment::Clock;
use dashflow_dashboard::backend::BackendError;
use dashflow_dashboard::commands::DashboardCommand;
use dashflow_dashboard::events::DashboardEvent;
use dashflow_dashboard::mock::Operation;
use dashflow_dashboard::model::{AttributeSelection, DashboardDefinition, SectionHeader};
use dashflow_runtime::UndoPoint;
use dashflow_testing::{EventRecorder, test_clock};

#[tokio::test]
async fn test_initialize_replaces_state() {
    let backend = backend();
    let engine = engine_with(&backend);
    add_filters(&engine, &["region.name"]).await;

    let outcome = engine
        .dispatch(DashboardCommand::InitializeDashboard {
            dashboard_id: DASHBOARD_ID.into(),
        })
        .await;

    assert_eq!(
        outcome.domain(),
        Some(&DashboardEvent::DashboardInitialized {
            dashboard_id: DASHBOARD_ID.into(),
            title: "Sales overview".into(),
            revision: 1,
        })
    );
    assert!(
        engine
            .store()
            .select(|s| s.filter_context.attribute_filters.is_empty())
    );
    assert_eq!(widget_ids(&engine).len(), 2);
    assert_eq!(engine.store().select(|s| s.meta.saved_revision), Some(1));
}

#[tokio::test]
async fn test_initialize_starts_a_fresh_undo_history() {
    let backend = backend();
    let engine = engine_with(&backend);
    let draft = engine
        .dispatch(DashboardCommand::add_section(SectionHeader::titled("Draft"), vec![]))
        .await;
    assert!(!draft.is_failure());

    engine
        .dispatch(DashboardCommand::InitializeDashboard {
            dashboard_id: DASHBOARD_ID.into(),
        })
        .await;
    let revision = engine.store().revision();
    let undo = engine
        .dispatch(DashboardCommand::undo_layout(UndoPoint::Last))
        .await;

    assert_eq!(
        undo.failure().map(|f| f.reason),
        Some(FailureReason::InvalidArguments)
    );
    assert_eq!(widget_ids(&engine), vec![vec!["a", "b"], vec!["c"]]);
    assert_eq!(engine.store().revision(), revision);
}

#[tokio::test]
async fn test_initialize_unknown_dashboard_is_not_found() {
    let engine = engine_with(&backend());

    let missing = engine
        .dispatch(DashboardCommand::InitializeDashboard {
            dashboard_id: "nope".into(),
        })
        .await;
    let blank = engine
        .dispatch(DashboardCommand::InitializeDashboard {
            dashboard_id: "  ".into(),
        })
        .await;

    assert_eq!(
        missing.failure().map(|f| f.reason),
        Some(FailureReason::NotFound)
    );
    assert_eq!(
        blank.failure().map(|f| f.reason),
        Some(FailureReason::InvalidArguments)
    );
    assert!(engine.store().select(|s| s.meta.id.is_none()));
}

#[tokio::test]
async fn test_rename_trims_and_rejects_blank() {
    let engine = initialized(&backend()).await;

    let renamed = engine
        .dispatch(DashboardCommand::rename("  Sales by region "))
        .await;
    let blank = engine.dispatch(DashboardCommand::rename("   ")).await;

    assert_eq!(
        renamed.domain(),
        Some(&DashboardEvent::DashboardRenamed {
            previous_title: "Sales overview".into(),
            title: "Sales by region".into(),
        })
    );
    assert_eq!(
        blank.failure().map(|f| f.reason),
        Some(FailureReason::InvalidArguments)
    );
    assert_eq!(
        engine.store().select(|s| s.meta.title.clone()),
        "Sales by region"
    );
}

#[tokio::test]
async fn test_save_persists_filters_and_layout() {
    let backend = backend();
    let engine = initialized(&backend).await;
    let ids = add_filters(&engine, &["region.name"]).await;
    engine
        .dispatch(DashboardCommand::ChangeAttributeFilterSelection {
            local_id: ids[0].clone(),
            selection: AttributeSelection::only(["West"]),
        })
        .await;

    let outcome = engine.dispatch(DashboardCommand::SaveDashboard).await;

    assert_eq!(
        outcome.domain(),
        Some(&DashboardEvent::DashboardSaved {
            dashboard_id: DASHBOARD_ID.into(),
            revision: 2,
        })
    );
    let stored = backend.dashboard(DASHBOARD_ID).unwrap();
    assert_eq!(stored.revision, 2);
    assert_eq!(stored.filter_context.attribute_filters.len(), 1);
    assert_eq!(
        stored.filter_context.attribute_filters[0].selection,
        AttributeSelection::only(["West"])
    );
    let (revision, saved_at) = engine
        .store()
        .select(|s| (s.meta.saved_revision, s.meta.saved_at));
    assert_eq!(revision, Some(2));
    assert_eq!(saved_at, Some(test_clock().now()));

    // a second save builds on the new revision
    let again = engine.dispatch(DashboardCommand::SaveDashboard).await;
    assert!(!again.is_failure());
    assert_eq!(backend.dashboard(DASHBOARD_ID).map(|d| d.revision), Some(3));
}

#[tokio::test]
async fn test_save_before_initialize_is_invalid_state() {
    let backend = backend();
    let engine = engine_with(&backend);

    let outcome = engine.dispatch(DashboardCommand::SaveDashboard).await;

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::InvalidState)
    );
    assert_eq!(backend.calls(Operation::SaveDashboard), 0);
}

#[tokio::test]
async fn test_stale_save_is_invalid_state() {
    let backend = backend();
    let engine = initialized(&backend).await;
    // someone else saved in the meantime
    let _ = backend.clone().with_dashboard(definition_at(4));

    let outcome = engine.dispatch(DashboardCommand::SaveDashboard).await;

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::InvalidState)
    );
    assert_eq!(engine.store().select(|s| s.meta.saved_revision), Some(1));
}

#[tokio::test]
async fn test_backend_outage_is_collaborator_failed() {
    let backend = backend();
    let engine = initialized(&backend).await;
    let recorder = EventRecorder::attach(&engine);
    backend.fail_next(
        Operation::SaveDashboard,
        BackendError::Unavailable("503".into()),
    );

    let outcome = engine.dispatch(DashboardCommand::SaveDashboard).await;
    engine.emitter().flush().await.unwrap();

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.reason, FailureReason::CollaboratorFailed);
    assert_eq!(failure.command, DashboardCommand::SaveDashboard);
    assert_eq!(failure.mutations_applied, 0);
    assert_eq!(
        recorder.failure_reasons(),
        vec![FailureReason::CollaboratorFailed]
    );
}

fn definition_at(revision: u64) -> DashboardDefinition {
    DashboardDefinition {
        revision,
        ..definition()
    }
}
