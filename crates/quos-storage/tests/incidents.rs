mod common;

use quos_common::types::{
    CompareOp, IncidentEventType, IncidentStatus, MetricType, Severity,
};
use quos_storage::{NewIncident, StorageError};

use common::{db_lock, fixture_metric, fixture_rule, fixture_service, reset, test_store};

async fn open_fixture_incident(store: &quos_storage::Store) -> quos_storage::IncidentRow {
    fixture_service(store, "S001").await;
    fixture_rule(store, "r1", MetricType::LatencyMs, CompareOp::GreaterThan, 100.0).await;
    let metric = fixture_metric(store, "S001", MetricType::LatencyMs, 150.0).await;
    store
        .open_incident(&NewIncident {
            service_id: "S001".into(),
            rule_id: "r1".into(),
            metric_id: metric.id,
            severity: Severity::Critical,
            message: "threshold exceeded".into(),
            department_id: None,
        })
        .await
        .expect("open incident")
}

#[tokio::test]
async fn incident_ids_come_from_the_sequence() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let first = open_fixture_incident(&store).await;
    assert_eq!(first.id, "INC-1");
    assert_eq!(first.status, IncidentStatus::Open);
    assert!(first.closed_at.is_none());

    let metric = fixture_metric(&store, "S001", MetricType::LatencyMs, 170.0).await;
    let second = store
        .open_incident(&NewIncident {
            service_id: "S001".into(),
            rule_id: "r1".into(),
            metric_id: metric.id,
            severity: Severity::High,
            message: "again".into(),
            department_id: None,
        })
        .await
        .unwrap();
    assert_eq!(second.id, "INC-2");
}

#[tokio::test]
async fn status_lifecycle_appends_timeline_events() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let incident = open_fixture_incident(&store).await;

    let in_progress = store
        .update_incident_status(&incident.id, IncidentStatus::InProgress, "system")
        .await
        .unwrap();
    assert_eq!(in_progress.status, IncidentStatus::InProgress);
    assert!(in_progress.closed_at.is_none());

    let events = store.list_incident_events(&incident.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, IncidentEventType::StatusChanged);
    assert_eq!(events[0].old_value.as_deref(), Some("OPEN"));
    assert_eq!(events[0].new_value.as_deref(), Some("IN_PROGRESS"));

    let closed = store
        .update_incident_status(&incident.id, IncidentStatus::Closed, "system")
        .await
        .unwrap();
    assert_eq!(closed.status, IncidentStatus::Closed);
    let closed_at = closed.closed_at.expect("closed_at must be set");
    assert!(closed_at >= incident.opened_at);

    let events = store.list_incident_events(&incident.id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].old_value.as_deref(), Some("IN_PROGRESS"));
    assert_eq!(events[1].new_value.as_deref(), Some("CLOSED"));
}

#[tokio::test]
async fn direct_open_to_closed_is_allowed() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let incident = open_fixture_incident(&store).await;
    let closed = store
        .update_incident_status(&incident.id, IncidentStatus::Closed, "system")
        .await
        .unwrap();
    assert_eq!(closed.status, IncidentStatus::Closed);
    assert!(closed.closed_at.is_some());
}

#[tokio::test]
async fn closed_is_terminal() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let incident = open_fixture_incident(&store).await;
    store
        .update_incident_status(&incident.id, IncidentStatus::Closed, "system")
        .await
        .unwrap();

    // Closing again and reopening are both conflicts, and neither appends
    // a timeline event.
    let again = store
        .update_incident_status(&incident.id, IncidentStatus::Closed, "system")
        .await;
    assert!(matches!(again, Err(StorageError::Conflict { .. })));
    let reopen = store
        .update_incident_status(&incident.id, IncidentStatus::InProgress, "system")
        .await;
    assert!(matches!(reopen, Err(StorageError::Conflict { .. })));

    let events = store.list_incident_events(&incident.id).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn transition_to_current_status_is_a_silent_noop() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let incident = open_fixture_incident(&store).await;
    let unchanged = store
        .update_incident_status(&incident.id, IncidentStatus::Open, "system")
        .await
        .unwrap();
    assert_eq!(unchanged.status, IncidentStatus::Open);
    assert!(store
        .list_incident_events(&incident.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn comments_append_timeline_events_but_deletion_does_not() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let incident = open_fixture_incident(&store).await;
    let comment = store
        .create_comment(&incident.id, "alice", "looking into it")
        .await
        .unwrap();

    let events = store.list_incident_events(&incident.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, IncidentEventType::CommentAdded);
    assert_eq!(events[0].actor.as_deref(), Some("alice"));

    store.delete_comment(&incident.id, comment.id).await.unwrap();
    assert!(store.list_comments(&incident.id).await.unwrap().is_empty());
    // Deleting the comment leaves the timeline untouched.
    assert_eq!(
        store.list_incident_events(&incident.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn notification_ids_come_from_the_sequence() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let incident = open_fixture_incident(&store).await;
    let first = store
        .create_notification(&incident.id, "OPS_TEAM", "incident opened")
        .await
        .unwrap();
    assert_eq!(first.id, "N-1");
    assert!(!first.is_read);

    let second = store
        .create_notification(&incident.id, "OPS_TEAM", "still open")
        .await
        .unwrap();
    assert_eq!(second.id, "N-2");

    let by_incident = store
        .list_notifications_by_incident(&incident.id)
        .await
        .unwrap();
    assert_eq!(by_incident.len(), 2);
}

#[tokio::test]
async fn duplicate_rule_id_is_a_conflict() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    fixture_rule(&store, "r1", MetricType::LatencyMs, CompareOp::GreaterThan, 100.0).await;
    let dup = store
        .create_rule(&quos_storage::NewRule {
            id: "r1".into(),
            metric_type: MetricType::LatencyMs,
            threshold: 50.0,
            operator: CompareOp::LessThan,
            action: quos_common::types::RuleAction::OpenIncident,
            priority: 0,
            severity: Severity::Low,
            is_active: true,
            department_id: None,
        })
        .await;
    assert!(matches!(dup, Err(StorageError::Conflict { .. })));
}

#[tokio::test]
async fn threshold_is_stored_as_two_decimal_fixed_point() {
    let _guard = db_lock().await;
    let Some(store) = test_store().await else {
        return;
    };
    reset(&store).await;

    let rule = fixture_rule(
        &store,
        "r1",
        MetricType::ErrorRate,
        CompareOp::GreaterEqual,
        0.125,
    )
    .await;
    // NUMERIC(12,2) rounds the third fractional digit away.
    let stored = store.get_rule(&rule.id).await.unwrap();
    assert!((stored.threshold - 0.12).abs() < f64::EPSILON);
}
