use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{IncidentStatus, MetricType, Severity};

/// Payload of a `METRIC_CREATED` outbox row.
///
/// Written by the ingest transaction and consumed by both the rule worker and
/// the indexer; the shape is part of the storage contract, so fields are never
/// removed, only added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCreatedPayload {
    pub id: String,
    pub service_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Payload of an `INCIDENT_CREATED` (and reserved `INCIDENT_UPDATED`) outbox
/// row. Mirrors the incident at write time plus the owning rule's optional
/// department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentCreatedPayload {
    pub id: String,
    pub service_id: String,
    pub rule_id: String,
    pub metric_id: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_payload_round_trip() {
        let raw = serde_json::json!({
            "id": "7c1d6f9e-1111-2222-3333-444455556666",
            "service_id": "S001",
            "metric_type": "LATENCY_MS",
            "value": 150.0,
            "recorded_at": "2024-05-01T12:00:00Z",
        });
        let payload: MetricCreatedPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(payload.metric_type, MetricType::LatencyMs);
        assert_eq!(payload.value, 150.0);
    }

    #[test]
    fn incident_payload_omits_missing_department() {
        let payload = IncidentCreatedPayload {
            id: "INC-1".into(),
            service_id: "S001".into(),
            rule_id: "r1".into(),
            metric_id: "m1".into(),
            severity: Severity::Critical,
            status: IncidentStatus::Open,
            message: "LATENCY_MS threshold exceeded".into(),
            department_id: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("department_id").is_none());
        assert_eq!(value["severity"], "CRITICAL");
        assert_eq!(value["status"], "OPEN");
    }
}
