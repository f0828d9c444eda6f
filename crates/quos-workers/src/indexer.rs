use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use quos_common::events::MetricCreatedPayload;
use quos_common::types::EventType;
use quos_index::{IndexClient, MetricDocument};
use quos_storage::{OutboxRow, Store};

use crate::consumer::Consumer;

pub const PROCESSOR_NAME: &str = "indexer_worker";

/// Mirrors every admitted metric into the analytics index. Upsert-by-id
/// makes the write idempotent, so the worker is free to see an event twice.
pub struct IndexerWorker {
    store: Store,
    index: Arc<IndexClient>,
}

impl IndexerWorker {
    pub fn new(store: Store, index: Arc<IndexClient>) -> Self {
        Self { store, index }
    }
}

pub(crate) fn build_document(
    payload: &MetricCreatedPayload,
    service_name: String,
    created_at: chrono::DateTime<chrono::Utc>,
) -> MetricDocument {
    MetricDocument {
        id: payload.id.clone(),
        service_id: payload.service_id.clone(),
        service_name,
        metric_type: payload.metric_type.to_string(),
        value: payload.value,
        recorded_at: payload.recorded_at,
        created_at,
    }
}

#[async_trait]
impl Consumer for IndexerWorker {
    fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    fn event_types(&self) -> &'static [EventType] {
        &[EventType::MetricCreated]
    }

    async fn handle(&self, event: &OutboxRow) -> anyhow::Result<()> {
        let payload: MetricCreatedPayload = serde_json::from_value(event.payload.clone())
            .context("decode METRIC_CREATED payload")?;

        // Best-effort name join; the document falls back to the raw id when
        // the service row is missing.
        let service_name = match self.store.find_service(&payload.service_id).await {
            Ok(Some(svc)) => svc.name,
            Ok(None) => {
                tracing::warn!(service_id = %payload.service_id, "service not found");
                payload.service_id.clone()
            }
            Err(e) => {
                tracing::warn!(
                    service_id = %payload.service_id,
                    error = %e,
                    "service lookup failed"
                );
                payload.service_id.clone()
            }
        };

        let doc = build_document(&payload, service_name, event.created_at);
        self.index
            .upsert_metric(&doc)
            .await
            .context("index metric document")?;

        tracing::debug!(
            metric_id = %payload.id,
            service_id = %payload.service_id,
            "metric indexed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quos_common::types::MetricType;

    #[test]
    fn document_id_is_the_metric_id() {
        let now = Utc::now();
        let payload = MetricCreatedPayload {
            id: "3c9f3f2a-0000-0000-0000-000000000001".into(),
            service_id: "S001".into(),
            metric_type: MetricType::ErrorRate,
            value: 0.25,
            recorded_at: now,
        };
        let doc = build_document(&payload, "checkout".into(), now);
        assert_eq!(doc.id, payload.id);
        assert_eq!(doc.metric_type, "ERROR_RATE");
        assert_eq!(doc.service_name, "checkout");
    }

    #[test]
    fn rebuilding_the_document_yields_identical_content() {
        // Redelivery produces a byte-identical upsert body.
        let now = Utc::now();
        let payload = MetricCreatedPayload {
            id: "3c9f3f2a-0000-0000-0000-000000000002".into(),
            service_id: "S001".into(),
            metric_type: MetricType::LatencyMs,
            value: 150.0,
            recorded_at: now,
        };
        let a = build_document(&payload, "S001".into(), now);
        let b = build_document(&payload, "S001".into(), now);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
