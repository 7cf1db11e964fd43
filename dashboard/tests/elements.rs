//! Integration tests for attribute element loading and supersession

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{add_filters, backend, engine_with};
use dashflow_core::FailureReason;
use dashflow_dashboard::backend::BackendError;
use dashflow_dashboard::commands::DashboardCommand;
use dashflow_dashboard::events::DashboardEvent;
use dashflow_dashboard::handlers::elements::load_key;
use dashflow_dashboard::mock::Operation;
use dashflow_dashboard::model::AttributeElement;
use dashflow_testing::EventRecorder;
use std::time::Duration;

const LOADED: &str = "GDC.DASH/EVT.ATTRIBUTE_ELEMENTS.LOADED";

fn titles(elements: Option<Vec<AttributeElement>>) -> Option<Vec<String>> {
    elements.map(|e| e.into_iter().map(|element| element.title).collect())
}

#[tokio::test(start_paused = true)]
async fn test_newer_load_supersedes_slower_one() {
    let backend = backend();
    let engine = engine_with(&backend);
    let local_id = add_filters(&engine, &["region.name"]).await.remove(0);
    backend.script_elements(
        "region.name",
        Duration::from_millis(100),
        Ok(vec![AttributeElement::titled("A")]),
    );
    backend.script_elements(
        "region.name",
        Duration::from_millis(20),
        Ok(vec![AttributeElement::titled("B")]),
    );
    let recorder = EventRecorder::attach(&engine);

    let (first, second) = tokio::join!(
        engine.dispatch(DashboardCommand::load_elements(local_id.clone())),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine
                .dispatch(DashboardCommand::load_elements(local_id.clone()))
                .await
        },
    );
    engine.emitter().flush().await.unwrap();

    assert!(first.is_canceled(), "first load should be superseded: {first:?}");
    assert_eq!(
        second.domain(),
        Some(&DashboardEvent::AttributeElementsLoaded {
            local_id: local_id.clone(),
            count: 1,
        })
    );
    let stored = engine
        .store()
        .select(|s| s.elements.get(&local_id).map(<[_]>::to_vec));
    assert_eq!(titles(stored), Some(vec!["B".to_string()]));
    assert_eq!(
        recorder
            .event_types()
            .into_iter()
            .filter(|t| *t == LOADED)
            .count(),
        1
    );
    assert!(!engine.coordinator().is_running(&load_key(&local_id)));
    assert_eq!(backend.calls(Operation::LoadAttributeElements), 2);
}

#[tokio::test]
async fn test_no_data_loads_empty_list() {
    let backend = backend();
    let engine = engine_with(&backend);
    let local_id = add_filters(&engine, &["segment.name"]).await.remove(0);

    let outcome = engine
        .dispatch(DashboardCommand::load_elements(local_id.clone()))
        .await;

    assert_eq!(
        outcome.domain(),
        Some(&DashboardEvent::AttributeElementsLoaded {
            local_id: local_id.clone(),
            count: 0,
        })
    );
    assert_eq!(
        engine.store().select(|s| s.elements.get(&local_id).map(<[_]>::len)),
        Some(0)
    );
}

#[tokio::test]
async fn test_backend_failure_is_collaborator_failed() {
    let backend = backend();
    let engine = engine_with(&backend);
    let local_id = add_filters(&engine, &["region.name"]).await.remove(0);
    backend.fail_next(
        Operation::LoadAttributeElements,
        BackendError::Unavailable("timeout".into()),
    );

    let outcome = engine
        .dispatch(DashboardCommand::load_elements(local_id.clone()))
        .await;

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::CollaboratorFailed)
    );
    assert!(engine.store().select(|s| s.elements.get(&local_id).is_none()));
}

#[tokio::test]
async fn test_load_of_unknown_filter_is_not_found() {
    let engine = engine_with(&backend());

    let outcome = engine
        .dispatch(DashboardCommand::load_elements("af_missing"))
        .await;

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::NotFound)
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_command_reports_running_load() {
    let backend = backend();
    let engine = engine_with(&backend);
    let local_id = add_filters(&engine, &["region.name"]).await.remove(0);
    backend.script_elements(
        "region.name",
        Duration::from_millis(50),
        Ok(vec![AttributeElement::titled("East")]),
    );

    let (load, cancel) = tokio::join!(
        engine.dispatch(DashboardCommand::load_elements(local_id.clone())),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine
                .dispatch(DashboardCommand::CancelAttributeElementsLoad {
                    local_id: local_id.clone(),
                })
                .await
        },
    );

    assert!(load.is_canceled());
    assert_eq!(
        cancel.domain(),
        Some(&DashboardEvent::AttributeElementsLoadCanceled {
            local_id: local_id.clone(),
            was_running: true,
        })
    );
    assert!(engine.store().select(|s| s.elements.get(&local_id).is_none()));

    let idle = engine
        .dispatch(DashboardCommand::CancelAttributeElementsLoad {
            local_id: local_id.clone(),
        })
        .await;
    assert_eq!(
        idle.domain(),
        Some(&DashboardEvent::AttributeElementsLoadCanceled {
            local_id,
            was_running: false,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_removing_filter_cancels_its_load() {
    let backend = backend();
    let engine = engine_with(&backend);
    let local_id = add_filters(&engine, &["region.name"]).await.remove(0);
    backend.script_elements(
        "region.name",
        Duration::from_millis(50),
        Ok(vec![AttributeElement::titled("East")]),
    );

    let (load, removed) = tokio::join!(
        engine.dispatch(DashboardCommand::load_elements(local_id.clone())),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine
                .dispatch(DashboardCommand::RemoveAttributeFilters {
                    local_ids: vec![local_id.clone()],
                })
                .await
        },
    );

    assert!(load.is_canceled());
    assert!(!removed.is_failure());
    assert!(engine.store().select(|s| s.elements.get(&local_id).is_none()));
}

#[tokio::test]
async fn test_remove_drops_loaded_elements() {
    let engine = engine_with(&backend());
    let ids = add_filters(&engine, &["region.name", "product.name"]).await;
    for local_id in &ids {
        engine
            .dispatch(DashboardCommand::load_elements(local_id.clone()))
            .await;
    }

    engine
        .dispatch(DashboardCommand::RemoveAttributeFilters {
            local_ids: vec![ids[0].clone()],
        })
        .await;

    let loaded = engine.store().select(|s| {
        ids.iter()
            .map(|id| s.elements.get(id).map(<[_]>::len))
            .collect::<Vec<_>>()
    });
    assert_eq!(loaded, vec![None, Some(3)]);
}
