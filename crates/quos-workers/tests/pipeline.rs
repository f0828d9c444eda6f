mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use quos_common::types::{CompareOp, EventType, IncidentStatus, MetricType, Severity};
use quos_index::IndexClient;
use quos_storage::{
    IncidentFilter, OutboxRow, RuleUpdate, Store,
};
use quos_workers::{Consumer, IndexerWorker, NotifierWorker, PollingDriver, RuleWorker};

use common::{admit_latency_metric, create_rule, create_service, db_lock, reset, test_store};

fn rule_driver(store: &Store) -> PollingDriver<RuleWorker> {
    PollingDriver::new(store.clone(), RuleWorker::new(store.clone()), 1, 100)
}

fn notifier_driver(store: &Store) -> PollingDriver<NotifierWorker> {
    PollingDriver::new(store.clone(), NotifierWorker::new(store.clone()), 1, 100)
}

#[tokio::test]
async fn ingest_to_incident_to_notification() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    create_service(&store, "S001").await;
    create_rule(&store, "r1", CompareOp::GreaterThan, 100.0, Severity::Critical).await;
    admit_latency_metric(&store, "S001", 150.0).await;

    let processed = rule_driver(&store).poll_once().await.unwrap();
    assert_eq!(processed, 1);

    let incidents = store
        .list_incidents(&IncidentFilter::default(), 100, 0)
        .await
        .unwrap();
    assert_eq!(incidents.len(), 1);
    let incident = &incidents[0];
    assert_eq!(incident.rule_id, "r1");
    assert_eq!(incident.service_id, "S001");
    assert_eq!(incident.status, IncidentStatus::Open);
    assert_eq!(incident.severity, Severity::Critical);
    assert_eq!(
        incident.message.as_deref(),
        Some("LATENCY_MS threshold exceeded: 150.00 (threshold: 100.00, operator: >)")
    );

    let processed = notifier_driver(&store).poll_once().await.unwrap();
    assert_eq!(processed, 1);

    let notifications = store
        .list_notifications_by_incident(&incident.id)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].target, "OPS_TEAM");
    assert_eq!(
        notifications[0].message,
        format!(
            "[CRITICAL] Incident {}: LATENCY_MS threshold exceeded: 150.00 \
             (threshold: 100.00, operator: >) (Service: S001)",
            incident.id
        )
    );
}

#[tokio::test]
async fn threshold_boundary_follows_the_operator() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    create_service(&store, "S001").await;
    create_rule(&store, "r1", CompareOp::GreaterThan, 100.0, Severity::Critical).await;

    // value == threshold does not fire ">".
    admit_latency_metric(&store, "S001", 100.0).await;
    rule_driver(&store).poll_once().await.unwrap();
    assert_eq!(
        store.count_incidents(&IncidentFilter::default()).await.unwrap(),
        0
    );

    // After switching to ">=", the same value fires exactly once.
    store
        .update_rule(
            "r1",
            &RuleUpdate {
                metric_type: MetricType::LatencyMs,
                threshold: 100.0,
                operator: CompareOp::GreaterEqual,
                action: quos_common::types::RuleAction::OpenIncident,
                priority: 0,
                severity: Severity::Critical,
                is_active: true,
                department_id: None,
            },
        )
        .await
        .unwrap();
    admit_latency_metric(&store, "S001", 100.0).await;
    rule_driver(&store).poll_once().await.unwrap();
    assert_eq!(
        store.count_incidents(&IncidentFilter::default()).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn concurrent_replicas_share_one_cursor_without_double_processing() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    create_service(&store, "S001").await;
    create_rule(&store, "r1", CompareOp::GreaterThan, 100.0, Severity::High).await;
    let mut metric_ids = Vec::new();
    for i in 0..5 {
        let metric = admit_latency_metric(&store, "S001", 120.0 + i as f64).await;
        metric_ids.push(metric.id);
    }

    // Two replicas with the same processor name against the same database.
    let a = rule_driver(&store);
    let b = rule_driver(&store);
    let (ra, rb) = tokio::join!(a.poll_once(), b.poll_once());
    ra.unwrap();
    rb.unwrap();
    // Drain whatever re-overlapped across the race.
    while a.poll_once().await.unwrap() > 0 {}
    while b.poll_once().await.unwrap() > 0 {}

    // The union of acks covers all five events.
    for metric_id in &metric_ids {
        let events = store
            .find_events_for_aggregate(EventType::MetricCreated, &metric_id.to_string())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(store.is_acked(events[0].id, "rule_worker").await.unwrap());
    }

    // No metric produced more than one incident for the single rule.
    assert_eq!(
        store.count_incidents(&IncidentFilter::default()).await.unwrap(),
        5
    );
}

struct CountingConsumer {
    seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Consumer for CountingConsumer {
    fn name(&self) -> &'static str {
        "counting_consumer"
    }

    fn event_types(&self) -> &'static [EventType] {
        &[EventType::MetricCreated]
    }

    async fn handle(&self, _event: &OutboxRow) -> anyhow::Result<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn consumers_progress_independently() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    create_service(&store, "S001").await;
    create_rule(&store, "r1", CompareOp::GreaterThan, 100.0, Severity::Medium).await;
    for _ in 0..3 {
        admit_latency_metric(&store, "S001", 150.0).await;
    }

    // Only the counting consumer runs; the rule worker is "offline".
    let seen = Arc::new(AtomicUsize::new(0));
    let counting = PollingDriver::new(
        store.clone(),
        CountingConsumer { seen: seen.clone() },
        1,
        100,
    );
    assert_eq!(counting.poll_once().await.unwrap(), 3);
    assert_eq!(seen.load(Ordering::SeqCst), 3);

    // When the rule worker starts later it still sees all three events
    // from its own cursor.
    assert_eq!(rule_driver(&store).poll_once().await.unwrap(), 3);
    assert_eq!(
        store.count_incidents(&IncidentFilter::default()).await.unwrap(),
        3
    );
}

struct FlakyConsumer {
    reject_aggregate: Arc<std::sync::Mutex<Option<String>>>,
}

#[async_trait]
impl Consumer for FlakyConsumer {
    fn name(&self) -> &'static str {
        "flaky_consumer"
    }

    fn event_types(&self) -> &'static [EventType] {
        &[EventType::MetricCreated]
    }

    async fn handle(&self, event: &OutboxRow) -> anyhow::Result<()> {
        let reject = self.reject_aggregate.lock().unwrap();
        if reject.as_deref() == Some(event.aggregate_id.as_str()) {
            anyhow::bail!("synthetic failure");
        }
        Ok(())
    }
}

#[tokio::test]
async fn one_failing_event_does_not_block_the_rest_of_the_batch() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    create_service(&store, "S001").await;
    let bad = admit_latency_metric(&store, "S001", 110.0).await;
    admit_latency_metric(&store, "S001", 120.0).await;
    admit_latency_metric(&store, "S001", 130.0).await;

    let reject = Arc::new(std::sync::Mutex::new(Some(bad.id.to_string())));
    let driver = PollingDriver::new(
        store.clone(),
        FlakyConsumer {
            reject_aggregate: reject.clone(),
        },
        1,
        100,
    );

    // First pass acks the two healthy events and leaves the bad one.
    assert_eq!(driver.poll_once().await.unwrap(), 2);
    let bad_event = &store
        .find_events_for_aggregate(EventType::MetricCreated, &bad.id.to_string())
        .await
        .unwrap()[0];
    assert!(!store.is_acked(bad_event.id, "flaky_consumer").await.unwrap());

    // Once the fault clears, the retry drains it.
    *reject.lock().unwrap() = None;
    assert_eq!(driver.poll_once().await.unwrap(), 1);
    assert!(store.is_acked(bad_event.id, "flaky_consumer").await.unwrap());
}

#[tokio::test]
async fn indexer_leaves_events_unacked_while_the_index_is_down() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    create_service(&store, "S001").await;
    let metric = admit_latency_metric(&store, "S001", 150.0).await;

    // Nothing listens on the discard port; every upsert fails.
    let index = Arc::new(IndexClient::new("http://127.0.0.1:9", "metrics"));
    let driver = PollingDriver::new(
        store.clone(),
        IndexerWorker::new(store.clone(), index),
        1,
        100,
    );
    assert_eq!(driver.poll_once().await.unwrap(), 0);

    let event = &store
        .find_events_for_aggregate(EventType::MetricCreated, &metric.id.to_string())
        .await
        .unwrap()[0];
    assert!(!store.is_acked(event.id, "indexer_worker").await.unwrap());
}

#[tokio::test]
async fn malformed_payload_is_retried_not_acked() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let event_id = store
        .append_outbox_event(
            EventType::MetricCreated,
            "metric",
            "garbage",
            serde_json::json!({"not": "a metric payload"}),
        )
        .await
        .unwrap();

    assert_eq!(rule_driver(&store).poll_once().await.unwrap(), 0);
    assert!(!store.is_acked(event_id, "rule_worker").await.unwrap());
}
