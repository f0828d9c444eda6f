mod common;

use chrono::{Duration, Utc};
use serde_json::json;

use quos_common::types::{CompareOp, EventType, MetricType, Severity};
use quos_storage::NewIncident;

use common::{db_lock, fixture_metric, fixture_rule, fixture_service, reset, test_store};

#[tokio::test]
async fn admit_metric_writes_exactly_one_outbox_event() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    fixture_service(&store, "S001").await;
    let metric = fixture_metric(&store, "S001", MetricType::LatencyMs, 150.0).await;

    let events = store
        .find_events_for_aggregate(EventType::MetricCreated, &metric.id.to_string())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);

    let event = &events[0];
    assert_eq!(event.aggregate_type, "metric");
    assert_eq!(event.payload["service_id"], "S001");
    assert_eq!(event.payload["metric_type"], "LATENCY_MS");
    assert_eq!(event.payload["value"], 150.0);
}

#[tokio::test]
async fn open_incident_writes_exactly_one_outbox_event() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    fixture_service(&store, "S001").await;
    fixture_rule(&store, "r1", MetricType::LatencyMs, CompareOp::GreaterThan, 100.0).await;
    let metric = fixture_metric(&store, "S001", MetricType::LatencyMs, 150.0).await;

    let incident = store
        .open_incident(&NewIncident {
            service_id: "S001".into(),
            rule_id: "r1".into(),
            metric_id: metric.id,
            severity: Severity::Critical,
            message: "threshold exceeded".into(),
            department_id: Some("ops".into()),
        })
        .await
        .unwrap();

    let events = store
        .find_events_for_aggregate(EventType::IncidentCreated, &incident.id)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["rule_id"], "r1");
    assert_eq!(events[0].payload["severity"], "CRITICAL");
    assert_eq!(events[0].payload["status"], "OPEN");
    assert_eq!(events[0].payload["department_id"], "ops");
}

#[tokio::test]
async fn claim_is_oldest_first_and_respects_the_type_filter() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let first = store
        .append_outbox_event(EventType::MetricCreated, "metric", "m-1", json!({"n": 1}))
        .await
        .unwrap();
    let second = store
        .append_outbox_event(EventType::MetricCreated, "metric", "m-2", json!({"n": 2}))
        .await
        .unwrap();
    store
        .append_outbox_event(EventType::IncidentCreated, "incident", "INC-1", json!({}))
        .await
        .unwrap();

    let txn = store.begin().await.unwrap();
    let claimed = store
        .claim_events(&txn, "test_processor", &[EventType::MetricCreated], 10)
        .await
        .unwrap();
    txn.commit().await.unwrap();

    assert_eq!(claimed.len(), 2);
    assert_eq!(claimed[0].id, first);
    assert_eq!(claimed[1].id, second);
    assert!(claimed
        .iter()
        .all(|e| e.event_type == EventType::MetricCreated));
}

#[tokio::test]
async fn acked_events_never_reappear_for_the_same_processor() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let id = store
        .append_outbox_event(EventType::MetricCreated, "metric", "m-1", json!({}))
        .await
        .unwrap();

    store.ack_event(store.db(), id, "rule_worker").await.unwrap();
    assert!(store.is_acked(id, "rule_worker").await.unwrap());

    let txn = store.begin().await.unwrap();
    let claimed = store
        .claim_events(&txn, "rule_worker", &[EventType::MetricCreated], 10)
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert!(claimed.is_empty());

    // An independent consumer still sees the event.
    let txn = store.begin().await.unwrap();
    let claimed = store
        .claim_events(&txn, "indexer_worker", &[EventType::MetricCreated], 10)
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(claimed.len(), 1);
}

#[tokio::test]
async fn re_ack_is_a_noop() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let id = store
        .append_outbox_event(EventType::MetricCreated, "metric", "m-1", json!({}))
        .await
        .unwrap();

    store.ack_event(store.db(), id, "rule_worker").await.unwrap();
    store.ack_event(store.db(), id, "rule_worker").await.unwrap();
    assert!(store.is_acked(id, "rule_worker").await.unwrap());
}

#[tokio::test]
async fn claim_limit_is_applied() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    for i in 0..5 {
        store
            .append_outbox_event(
                EventType::MetricCreated,
                "metric",
                &format!("m-{i}"),
                json!({}),
            )
            .await
            .unwrap();
    }

    let txn = store.begin().await.unwrap();
    let claimed = store
        .claim_events(&txn, "test_processor", &[EventType::MetricCreated], 2)
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(claimed.len(), 2);
}

#[tokio::test]
async fn cleanup_deletes_only_fully_acked_rows() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let acked = store
        .append_outbox_event(EventType::MetricCreated, "metric", "m-1", json!({}))
        .await
        .unwrap();
    let unacked = store
        .append_outbox_event(EventType::MetricCreated, "metric", "m-2", json!({}))
        .await
        .unwrap();
    store.ack_event(store.db(), acked, "rule_worker").await.unwrap();

    // Everything is older than a horizon in the future.
    let removed = store
        .cleanup_outbox(Utc::now() + Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let remaining = store
        .find_events_for_aggregate(EventType::MetricCreated, "m-2")
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, unacked);
}

#[tokio::test]
async fn cleanup_with_no_registered_processors_deletes_nothing() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    store
        .append_outbox_event(EventType::MetricCreated, "metric", "m-1", json!({}))
        .await
        .unwrap();

    let removed = store
        .cleanup_outbox(Utc::now() + Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(removed, 0);
}
