use anyhow::Context;
use async_trait::async_trait;

use quos_common::events::IncidentCreatedPayload;
use quos_common::types::EventType;
use quos_storage::{OutboxRow, Store};

use crate::consumer::Consumer;

pub const PROCESSOR_NAME: &str = "notifier_worker";

/// Delivery target for incident notifications. The external channel (chat,
/// email, pager) hangs off this string; in this version the stored row is
/// the delivery.
const DEFAULT_TARGET: &str = "OPS_TEAM";

/// Turns every created incident into a notification record.
pub struct NotifierWorker {
    store: Store,
}

impl NotifierWorker {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

pub(crate) fn notification_message(payload: &IncidentCreatedPayload) -> String {
    format!(
        "[{}] Incident {}: {} (Service: {})",
        payload.severity, payload.id, payload.message, payload.service_id
    )
}

#[async_trait]
impl Consumer for NotifierWorker {
    fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    fn event_types(&self) -> &'static [EventType] {
        // INCIDENT_UPDATED is reserved; consuming it now means a future
        // producer needs no consumer change.
        &[EventType::IncidentCreated, EventType::IncidentUpdated]
    }

    async fn handle(&self, event: &OutboxRow) -> anyhow::Result<()> {
        let payload: IncidentCreatedPayload = serde_json::from_value(event.payload.clone())
            .context("decode incident payload")?;

        let message = notification_message(&payload);

        tracing::info!(
            target = DEFAULT_TARGET,
            incident_id = %payload.id,
            severity = %payload.severity,
            "sending notification"
        );

        let notification = self
            .store
            .create_notification(&payload.id, DEFAULT_TARGET, &message)
            .await
            .context("create notification")?;

        tracing::debug!(
            notification_id = %notification.id,
            incident_id = %payload.id,
            "notification recorded"
        );
        Ok(())
    }
}
