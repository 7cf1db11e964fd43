//! Integration tests for filter context commands

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{add_filters, backend, engine_with};
use dashflow_core::FailureReason;
use dashflow_dashboard::commands::DashboardCommand;
use dashflow_dashboard::events::DashboardEvent;
use dashflow_dashboard::model::{AttributeSelection, DateFilterSelection, DateGranularity};
use dashflow_testing::{EventRecorder, assertions};

#[tokio::test]
async fn test_move_out_of_range_leaves_order_unchanged() {
    let engine = engine_with(&backend());
    add_filters(&engine, &["region.name", "product.name", "channel.name"]).await;
    let recorder = EventRecorder::attach(&engine);
    let before = engine.store().select(|s| s.filter_context.clone());
    let revision = engine.store().revision();
    let moved = before.attribute_filters[0].local_id.clone();

    let outcome = engine
        .dispatch(DashboardCommand::move_attribute_filter(moved, 5))
        .await;
    engine.emitter().flush().await.unwrap();

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::InvalidArguments)
    );
    assert_eq!(outcome.failure().map(|f| f.mutations_applied), Some(0));
    assert_eq!(engine.store().select(|s| s.filter_context.clone()), before);
    assert_eq!(engine.store().revision(), revision);
    assertions::assert_single_failure::<dashflow_dashboard::Dashboard>(
        &recorder.events(),
        FailureReason::InvalidArguments,
    );
}

#[tokio::test]
async fn test_move_to_end_with_minus_one() {
    let engine = engine_with(&backend());
    let ids = add_filters(&engine, &["region.name", "product.name", "channel.name"]).await;

    let outcome = engine
        .dispatch(DashboardCommand::move_attribute_filter(ids[0].clone(), -1))
        .await;

    assert_eq!(
        outcome.domain(),
        Some(&DashboardEvent::AttributeFilterMoved {
            local_id: ids[0].clone(),
            from_index: 0,
            to_index: 2,
        })
    );
    let order = engine.store().select(|s| {
        s.filter_context
            .local_ids()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    });
    assert_eq!(order, vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]);
}

#[tokio::test]
async fn test_move_unknown_filter_is_not_found() {
    let engine = engine_with(&backend());
    add_filters(&engine, &["region.name"]).await;

    let outcome = engine
        .dispatch(DashboardCommand::move_attribute_filter("af_missing", 0))
        .await;

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::NotFound)
    );
}

#[tokio::test]
async fn test_add_rejects_duplicates_and_bad_indices() {
    let engine = engine_with(&backend());
    add_filters(&engine, &["region.name"]).await;

    let duplicate = engine
        .dispatch(DashboardCommand::add_attribute_filter("region.name"))
        .await;
    let bad_index = engine
        .dispatch(DashboardCommand::AddAttributeFilter {
            display_form: "product.name".into(),
            index: 4,
            initial_selection: None,
        })
        .await;

    for outcome in [duplicate, bad_index] {
        assert_eq!(
            outcome.failure().map(|f| f.reason),
            Some(FailureReason::InvalidArguments)
        );
    }
    assert_eq!(
        engine
            .store()
            .select(|s| s.filter_context.attribute_filters.len()),
        1
    );
}

#[tokio::test]
async fn test_add_checks_loaded_catalog() {
    let engine = engine_with(&backend());
    engine.dispatch(DashboardCommand::LoadCatalog).await;

    let outcome = engine
        .dispatch(DashboardCommand::add_attribute_filter("weather.name"))
        .await;

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::NotFound)
    );
}

#[tokio::test]
async fn test_add_at_index_with_initial_selection() {
    let engine = engine_with(&backend());
    let ids = add_filters(&engine, &["region.name", "product.name"]).await;

    let outcome = engine
        .dispatch(DashboardCommand::AddAttributeFilter {
            display_form: "channel.name".into(),
            index: 1,
            initial_selection: Some(AttributeSelection::only(["Online"])),
        })
        .await;

    let Some(DashboardEvent::AttributeFilterAdded { filter, index }) = outcome.domain() else {
        panic!("expected a filter, got {outcome:?}");
    };
    assert_eq!(*index, 1);
    assert!(!filter.selection.negative);
    let order = engine.store().select(|s| {
        s.filter_context
            .local_ids()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    });
    assert_eq!(order, vec![ids[0].clone(), filter.local_id.clone(), ids[1].clone()]);
}

#[tokio::test]
async fn test_remove_is_all_or_nothing() {
    let engine = engine_with(&backend());
    let ids = add_filters(&engine, &["region.name", "product.name"]).await;

    let partial = engine
        .dispatch(DashboardCommand::RemoveAttributeFilters {
            local_ids: vec![ids[0].clone(), "af_missing".into()],
        })
        .await;
    assert_eq!(
        partial.failure().map(|f| f.reason),
        Some(FailureReason::NotFound)
    );
    assert_eq!(
        engine
            .store()
            .select(|s| s.filter_context.attribute_filters.len()),
        2
    );

    let removed = engine
        .dispatch(DashboardCommand::RemoveAttributeFilters {
            local_ids: vec![ids[0].clone()],
        })
        .await;
    let Some(DashboardEvent::AttributeFiltersRemoved { removed }) = removed.domain() else {
        panic!("expected removal, got {removed:?}");
    };
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].display_form, "region.name");
}

#[tokio::test]
async fn test_change_selection_reports_previous() {
    let engine = engine_with(&backend());
    let ids = add_filters(&engine, &["region.name"]).await;

    let outcome = engine
        .dispatch(DashboardCommand::ChangeAttributeFilterSelection {
            local_id: ids[0].clone(),
            selection: AttributeSelection::only(["East"]),
        })
        .await;

    assert_eq!(
        outcome.domain(),
        Some(&DashboardEvent::AttributeFilterSelectionChanged {
            local_id: ids[0].clone(),
            previous: AttributeSelection::all(),
            selection: AttributeSelection::only(["East"]),
        })
    );
}

#[tokio::test]
async fn test_date_filter_validation() {
    let engine = engine_with(&backend());
    let valid = DateFilterSelection::Relative {
        granularity: DateGranularity::Month,
        from: -11,
        to: 0,
    };

    let inverted = engine
        .dispatch(DashboardCommand::ChangeDateFilterSelection {
            selection: DateFilterSelection::Relative {
                granularity: DateGranularity::Month,
                from: 0,
                to: -11,
            },
        })
        .await;
    let accepted = engine
        .dispatch(DashboardCommand::ChangeDateFilterSelection {
            selection: valid.clone(),
        })
        .await;

    assert_eq!(
        inverted.failure().map(|f| f.reason),
        Some(FailureReason::InvalidArguments)
    );
    assert_eq!(
        accepted.domain(),
        Some(&DashboardEvent::DateFilterSelectionChanged {
            previous: DateFilterSelection::AllTime,
            selection: valid.clone(),
        })
    );
    assert_eq!(engine.store().select(|s| s.filter_context.date_filter.clone()), valid);
}
