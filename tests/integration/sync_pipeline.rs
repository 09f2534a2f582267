//! Integration tests for the one-request-per-item path

use super::test_utils::*;
use catalog_enricher::catalog::{CatalogStore, ProcessingState};
use catalog_enricher::orchestrator::{RunMode, Selection};
use catalog_enricher::types::CatalogId;

#[tokio::test]
async fn test_sync_run_mixed_outcomes() {
    let service = FakeService::default();
    *service.completions.lock() = vec![
        Ok(r#"{"titel": "Eins", "Verkaufstext": "Gut."}"#.to_string()),
        Err("slow down".to_string()),
        Ok("Leider keine Daten.".to_string()),
    ]
    .into();
    let items = vec![pending_item(1, 3), pending_item(2, 2), pending_item(3, 1)];
    let h = harness(&items, Some("Beschreibe {name}"), service);

    let summary = h
        .orchestrator
        .run(RunMode::Sync, Selection::Default)
        .await
        .unwrap();

    assert_eq!(summary.job_id, None);
    assert_eq!(
        (summary.submitted, summary.processed, summary.stamped, summary.failed),
        (3, 1, 2, 0)
    );
    // the transport failure never produced anything to decode
    assert_eq!(summary.decoded, 2);
    // only the transport failure triggers the backoff pause
    assert_eq!(h.clock.sleeps(), vec![BACKOFF]);

    let prompts = h.service.prompts.lock();
    assert_eq!(
        prompts[0],
        "Beschreibe Bremsscheibe 1, weitere Herstellernummer: 4000000000001 "
    );

    let first = h.store().fetch_item(CatalogId(1)).unwrap().unwrap();
    assert_eq!(first.state, ProcessingState::Processed);
    assert_eq!(first.content.title, "Eins");

    for id in [2, 3] {
        let item = h.store().fetch_item(CatalogId(id)).unwrap().unwrap();
        assert_eq!(item.state, ProcessingState::Unprocessed);
        assert!(item.last_attempt_at.is_some());
    }
}

#[tokio::test]
async fn test_single_item_ignores_processing_state() {
    let mut item = pending_item(5, 1);
    item.state = ProcessingState::Processed;
    item.marketplace_active = true;
    let service = FakeService::default();
    *service.completions.lock() = vec![Ok(r#"{"titel": "Neu"}"#.to_string())].into();
    let h = harness(&[item, pending_item(6, 9)], Some("{name}"), service);

    let summary = h
        .orchestrator
        .run(RunMode::Sync, Selection::Item(CatalogId(5)))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(h.service.prompts.lock().len(), 1);
    let stored = h.store().fetch_item(CatalogId(5)).unwrap().unwrap();
    assert_eq!(stored.content.title, "Neu");
    assert!(stored.marketplace_revise);
    assert!(h.store().fetch_item(CatalogId(6)).unwrap().unwrap().last_attempt_at.is_none());
}

#[tokio::test]
async fn test_unknown_single_item_is_an_error() {
    let h = harness(&[pending_item(1, 1)], Some("{name}"), FakeService::default());
    let result = h
        .orchestrator
        .run(RunMode::Sync, Selection::Item(CatalogId(404)))
        .await;
    assert!(result.is_err());
    assert!(h.service.prompts.lock().is_empty());
}

#[tokio::test]
async fn test_rerun_does_not_duplicate_generated_block() {
    let payload = r#"{"titel": "Gleich", "Verkaufstext": "Immer gleich."}"#;
    let service = FakeService::default();
    *service.completions.lock() = vec![Ok(payload.to_string()), Ok(payload.to_string())].into();
    let h = harness(&[pending_item(1, 1)], Some("{name}"), service);

    for _ in 0..2 {
        h.orchestrator
            .run(RunMode::Sync, Selection::Item(CatalogId(1)))
            .await
            .unwrap();
    }

    let stored = h.store().fetch_item(CatalogId(1)).unwrap().unwrap();
    assert_eq!(stored.content.description.matches("addedTextAi").count(), 1);
}
