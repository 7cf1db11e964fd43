//! Integration tests for the cached catalog query

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{backend, engine_with};
use dashflow_core::{FailureReason, Query};
use dashflow_dashboard::backend::BackendError;
use dashflow_dashboard::commands::DashboardCommand;
use dashflow_dashboard::events::{CatalogSource, DashboardEvent};
use dashflow_dashboard::mock::Operation;
use dashflow_dashboard::{MetricsAndFactsParams, MetricsAndFactsQuery};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

#[tokio::test(start_paused = true)]
async fn test_concurrent_queries_share_one_backend_call() {
    let backend = backend().with_latency(Duration::from_millis(50));
    let engine = engine_with(&backend);
    let cache = engine.queries().cache::<MetricsAndFactsQuery>().unwrap();

    let (first, second) = tokio::join!(
        cache.query(MetricsAndFactsParams {}),
        cache.query(MetricsAndFactsParams {}),
    );
    let (first, second) = (assert_ok!(first), assert_ok!(second));

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.attributes.len(), 4);
    assert_eq!(backend.calls(Operation::LoadCatalog), 1);
    assert_eq!(engine.queries().len(MetricsAndFactsQuery::NAME), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_load_commands_dedupe() {
    let backend = backend().with_latency(Duration::from_millis(50));
    let engine = engine_with(&backend);

    let (first, second) = tokio::join!(
        engine.dispatch(DashboardCommand::LoadCatalog),
        engine.dispatch(DashboardCommand::LoadCatalog),
    );

    assert!(!first.is_failure() && !second.is_failure());
    assert_eq!(backend.calls(Operation::LoadCatalog), 1);
    assert!(engine.store().select(|s| s.catalog.is_some()));
}

#[tokio::test]
async fn test_second_load_reads_store() {
    let backend = backend();
    let engine = engine_with(&backend);

    let first = engine.dispatch(DashboardCommand::LoadCatalog).await;
    let second = engine.dispatch(DashboardCommand::LoadCatalog).await;

    let expected = |source| DashboardEvent::CatalogLoaded {
        source,
        metrics: 2,
        facts: 1,
        attributes: 4,
    };
    assert_eq!(first.domain(), Some(&expected(CatalogSource::Backend)));
    assert_eq!(second.domain(), Some(&expected(CatalogSource::Store)));
    assert_eq!(backend.calls(Operation::LoadCatalog), 1);
    // the store holds the only copy
    assert_eq!(engine.queries().len(MetricsAndFactsQuery::NAME), Some(0));
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let backend = backend();
    let engine = engine_with(&backend);
    backend.fail_next(
        Operation::LoadCatalog,
        BackendError::Unavailable("workspace offline".into()),
    );

    let failed = engine.dispatch(DashboardCommand::LoadCatalog).await;
    assert_eq!(
        failed.failure().map(|f| f.reason),
        Some(FailureReason::CollaboratorFailed)
    );
    assert!(engine.store().select(|s| s.catalog.is_none()));

    let retried = engine.dispatch(DashboardCommand::LoadCatalog).await;
    assert!(matches!(
        retried.domain(),
        Some(DashboardEvent::CatalogLoaded {
            source: CatalogSource::Backend,
            ..
        })
    ));
    assert_eq!(backend.calls(Operation::LoadCatalog), 2);
}

#[tokio::test]
async fn test_empty_workspace_is_an_empty_catalog() {
    let backend = backend();
    let engine = engine_with(&backend);
    backend.fail_next(Operation::LoadCatalog, BackendError::NoData);

    let outcome = engine.dispatch(DashboardCommand::LoadCatalog).await;

    assert_eq!(
        outcome.domain(),
        Some(&DashboardEvent::CatalogLoaded {
            source: CatalogSource::Backend,
            metrics: 0,
            facts: 0,
            attributes: 0,
        })
    );
}
