use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use quos_common::events::MetricCreatedPayload;
use quos_common::types::{EventType, RuleAction};
use quos_storage::{NewIncident, OutboxRow, Store};

use crate::consumer::Consumer;

pub const PROCESSOR_NAME: &str = "rule_worker";

/// Evaluates every active rule for a metric's type against the sample and
/// opens one incident per violated rule. Rules never deduplicate against
/// each other; each violation is an independent incident.
pub struct RuleWorker {
    store: Store,
}

impl RuleWorker {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Consumer for RuleWorker {
    fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    fn event_types(&self) -> &'static [EventType] {
        &[EventType::MetricCreated]
    }

    async fn handle(&self, event: &OutboxRow) -> anyhow::Result<()> {
        // A payload that does not decode is left unacked and retried; a
        // fixed decoder can replay it later.
        let payload: MetricCreatedPayload = serde_json::from_value(event.payload.clone())
            .context("decode METRIC_CREATED payload")?;
        let metric_id = Uuid::parse_str(&payload.id).context("parse metric id")?;

        let rules = self.store.list_active_rules(payload.metric_type).await?;

        for rule in rules {
            if !quos_rules::violated(rule.operator, payload.value, rule.threshold) {
                continue;
            }

            match rule.action {
                RuleAction::OpenIncident => {
                    let message = quos_rules::violation_message(
                        payload.metric_type,
                        payload.value,
                        rule.threshold,
                        rule.operator,
                    );
                    let req = NewIncident {
                        service_id: payload.service_id.clone(),
                        rule_id: rule.id.clone(),
                        metric_id,
                        severity: rule.severity,
                        message,
                        department_id: rule.department_id.clone(),
                    };
                    // One rule's failure must not block the others; the
                    // event is still acked after the loop, matching the
                    // per-rule commit semantics.
                    match self.store.open_incident(&req).await {
                        Ok(incident) => {
                            tracing::info!(
                                rule_id = %rule.id,
                                incident_id = %incident.id,
                                service_id = %payload.service_id,
                                metric_type = %payload.metric_type,
                                value = payload.value,
                                "incident created"
                            );
                        }
                        Err(e) => {
                            tracing::error!(
                                rule_id = %rule.id,
                                error = %e,
                                "failed to create incident"
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quos_common::types::MetricType;

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let raw = serde_json::json!({ "id": "not-relevant" });
        let result: Result<MetricCreatedPayload, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }

    #[test]
    fn payload_with_bad_metric_id_fails_parse() {
        let payload = MetricCreatedPayload {
            id: "definitely-not-a-uuid".into(),
            service_id: "S001".into(),
            metric_type: MetricType::LatencyMs,
            value: 150.0,
            recorded_at: Utc::now(),
        };
        assert!(Uuid::parse_str(&payload.id).is_err());
    }
}
