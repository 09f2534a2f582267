//! Integration tests for the bulk submit, monitor and reconcile flow

use super::test_utils::*;
use catalog_enricher::catalog::{CatalogStore, ProcessingState};
use catalog_enricher::clock::Clock;
use catalog_enricher::error::EnrichError;
use catalog_enricher::orchestrator::{RunMode, RunSummary, Selection};
use catalog_enricher::types::CatalogId;

const FULL_PAYLOAD: &str = r#"{"titel": "Bremsscheibe belüftet", "SEO": "bremsscheibe", "Kurzbeschreibung": "Vorne", "Verkaufstext": "Stark. Leise.", "OE-Nummer": ["4F0615301"], "Quelle": ["Herstellerkatalog"], "kompatibilität": [{"marke": "Audi", "modell": "A6", "baujahr_von": 2004, "baujahr_bis": 2011, "motorvarianten": ["2.0 TDI"], "bemerkung": ""}]}"#;

fn processed_item(id: u64) -> catalog_enricher::CatalogItem {
    let mut item = pending_item(id, 50);
    item.state = ProcessingState::Processed;
    item
}

#[tokio::test]
async fn test_batch_run_end_to_end() {
    let service = FakeService::with_statuses(&["validating", "in_progress", "completed"]);
    service.set_output(&[
        success_line(1, FULL_PAYLOAD),
        error_line(2, "rate"),
        "{\"custom_id\": \"product-id-3\", \"response\": {".to_string(),
        success_line(3, "```json\n{\"titel\": \"Fenced\"}\n```"),
    ]);
    let items = vec![
        pending_item(1, 10),
        pending_item(2, 9),
        pending_item(3, 8),
        processed_item(4),
    ];
    let h = harness(&items, Some("Beschreibe {name}"), service);

    let summary = h
        .orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            job_id: Some("batch_test".to_string()),
            submitted: 3,
            decoded: 3,
            skipped: 1,
            processed: 2,
            stamped: 1,
            failed: 0,
        }
    );

    // one request line per pending item, none for the processed one
    let uploads = h.service.uploads.lock();
    assert_eq!(uploads.len(), 1);
    let ids: Vec<String> = uploads[0]
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["custom_id"].to_string())
        .collect();
    assert_eq!(ids, vec!["\"product-id-1\"", "\"product-id-2\"", "\"product-id-3\""]);
    assert!(uploads[0].contains("Beschreibe Bremsscheibe 1, weitere Herstellernummer: 4000000000001 "));

    // validating/in_progress were each followed by one sleep
    assert_eq!(h.clock.sleeps(), vec![POLL_INTERVAL; 2]);

    let first = h.store().fetch_item(CatalogId(1)).unwrap().unwrap();
    assert_eq!(first.state, ProcessingState::Processed);
    assert_eq!(first.content.title, "Bremsscheibe belüftet");
    assert_eq!(first.content.seo, "bremsscheibe");
    assert!(first
        .content
        .description
        .starts_with("<div class='item-desc-text'>Original 1</div> <div class='addedTextAi'>"));
    assert!(first.content.description.contains("Stark.<br/>Leise."));
    assert!(first.content.description.contains("<td>2004 - 2011</td>"));
    assert_eq!(first.last_attempt_at, Some(h.clock.now()));

    let second = h.store().fetch_item(CatalogId(2)).unwrap().unwrap();
    assert_eq!(second.state, ProcessingState::Unprocessed);
    assert_eq!(second.content.description, "Original 2");
    assert!(second.last_attempt_at.is_some());

    let third = h.store().fetch_item(CatalogId(3)).unwrap().unwrap();
    assert_eq!(third.content.title, "Fenced");

    let untouched = h.store().fetch_item(CatalogId(4)).unwrap().unwrap();
    assert!(untouched.last_attempt_at.is_none());
}

#[tokio::test]
async fn test_limit_selects_oldest_pending() {
    let service = FakeService::with_statuses(&["completed"]);
    let items = vec![pending_item(1, 1), pending_item(2, 30), pending_item(3, 20)];
    let h = harness(&items, Some("{name}"), service);

    let summary = h
        .orchestrator
        .run(RunMode::Batch, Selection::Limit(2))
        .await
        .unwrap();

    assert_eq!(summary.submitted, 2);
    let uploads = h.service.uploads.lock();
    let lines: Vec<&str> = uploads[0].lines().collect();
    assert!(lines[0].contains("product-id-2"));
    assert!(lines[1].contains("product-id-3"));
}

#[tokio::test]
async fn test_terminal_failure_leaves_catalog_untouched() {
    let service = FakeService::with_statuses(&["in_progress", "expired"]);
    let h = harness(&[pending_item(1, 1)], Some("{name}"), service);

    let err = h
        .orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::TerminalJobFailure { status, .. } if status == "expired"));
    let item = h.store().fetch_item(CatalogId(1)).unwrap().unwrap();
    assert_eq!(item.state, ProcessingState::Unprocessed);
    assert!(item.last_attempt_at.is_none());
}

#[tokio::test]
async fn test_status_query_failure_is_reported() {
    let service = FakeService::with_statuses(&["in_progress"]);
    *service.fail_status_query.lock() = true;
    let h = harness(&[pending_item(1, 1)], Some("{name}"), service);

    let err = h.orchestrator.resume("batch_test").await.unwrap_err();
    assert!(matches!(err, EnrichError::StatusQueryFailed { job_id, .. } if job_id == "batch_test"));
    assert_eq!(*h.service.status_queries.lock(), 1);
}

#[tokio::test]
async fn test_timeout_then_resume() {
    let service = FakeService::with_statuses(&["in_progress"]);
    service.set_output(&[success_line(1, r#"{"titel": "Spät"}"#)]);
    let h = harness(&[pending_item(1, 1)], Some("{name}"), service);

    let err = h
        .orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::TimedOut { polls: 5, .. }));
    assert_eq!(h.clock.sleeps().len(), 4);
    assert_eq!(
        h.store().fetch_item(CatalogId(1)).unwrap().unwrap().state,
        ProcessingState::Unprocessed
    );

    *h.service.statuses.lock() = vec![catalog_enricher::provider::BatchStatus::Completed].into();
    let summary = h.orchestrator.resume("batch_test").await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.submitted, 0);
    assert_eq!(h.store().fetch_item(CatalogId(1)).unwrap().unwrap().content.title, "Spät");
    assert_eq!(h.service.uploads.lock().len(), 1, "resume never resubmits");
}

#[tokio::test]
async fn test_error_file_records_are_stamped() {
    let service = FakeService::with_statuses(&["completed"]);
    service.set_output(&[success_line(1, r#"{"titel": "A"}"#)]);
    *service.error_output.lock() = Some(error_line(2, "context_length_exceeded"));
    let h = harness(&[pending_item(1, 2), pending_item(2, 1)], Some("{name}"), service);

    let summary = h
        .orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap();

    assert_eq!((summary.processed, summary.stamped), (1, 1));
    assert!(h.store().fetch_item(CatalogId(2)).unwrap().unwrap().last_attempt_at.is_some());
}

#[tokio::test]
async fn test_unknown_item_in_results_does_not_stop_others() {
    let service = FakeService::with_statuses(&["completed"]);
    service.set_output(&[
        success_line(99, r#"{"titel": "Ghost"}"#),
        success_line(1, r#"{"titel": "Real"}"#),
    ]);
    let h = harness(&[pending_item(1, 1)], Some("{name}"), service);

    let summary = h.orchestrator.resume("batch_test").await.unwrap();
    assert_eq!((summary.processed, summary.failed), (1, 1));
    assert!(h.store().fetch_item(CatalogId(99)).unwrap().is_none());
}

#[tokio::test]
async fn test_nothing_pending_submits_nothing() {
    let h = harness(&[processed_item(1)], Some("{name}"), FakeService::default());

    let summary = h
        .orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap();

    assert_eq!(summary, RunSummary::default());
    assert!(h.service.uploads.lock().is_empty());
}

#[tokio::test]
async fn test_blank_or_missing_template_is_configuration_error() {
    let h = harness(&[pending_item(1, 1)], Some("   \n"), FakeService::default());
    let err = h
        .orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::Configuration(_)));
    assert!(h.service.uploads.lock().is_empty());

    let h = harness(&[pending_item(1, 1)], None, FakeService::default());
    let err = h
        .orchestrator
        .run(RunMode::Sync, Selection::Default)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::Configuration(_)));
}

#[tokio::test]
async fn test_artifact_written_under_artifact_dir() {
    let service = FakeService::with_statuses(&["completed"]);
    let h = harness(&[pending_item(1, 1)], Some("{name}"), service);
    h.orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap();

    let artifacts: Vec<_> = std::fs::read_dir(h.temp_dir.path().join("batch_files"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0].starts_with("batch_input_") && artifacts[0].ends_with(".jsonl"));
}

#[tokio::test]
async fn test_catalog_stays_available_while_job_runs() {
    let service = FakeService::with_statuses(&["in_progress", "in_progress", "completed"]);
    service.set_output(&[success_line(1, r#"{"titel": "Neu"}"#)]);
    let h = harness(&[pending_item(1, 1)], Some("{name}"), service);
    *h.service.concurrent_reader.lock() = Some(h.store_path.clone());

    let summary = h
        .orchestrator
        .run(RunMode::Batch, Selection::Default)
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(*h.service.concurrent_reads.lock(), vec![Ok(1), Ok(1), Ok(1)]);
    assert_eq!(
        h.store().fetch_item(CatalogId(1)).unwrap().unwrap().state,
        ProcessingState::Processed
    );
}
