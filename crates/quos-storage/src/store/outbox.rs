use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, Statement,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quos_common::types::EventType;

use crate::entities::{outbox, outbox_processing};
use crate::error::{Result, StorageError};
use crate::store::Store;

/// Outbox event row with the event type parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRow {
    pub id: Uuid,
    pub event_type: EventType,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

fn to_row(m: outbox::Model) -> Result<OutboxRow> {
    Ok(OutboxRow {
        id: m.id,
        event_type: m.event_type.parse().map_err(|detail| StorageError::Corrupt {
            entity: "outbox",
            detail,
        })?,
        aggregate_type: m.aggregate_type,
        aggregate_id: m.aggregate_id,
        payload: m.payload,
        created_at: m.created_at,
    })
}

/// Inserts an outbox row on the caller's connection. Callers that need
/// publish-with-commit atomicity pass their open transaction.
pub(crate) async fn append_event<C: ConnectionTrait>(
    conn: &C,
    event_type: EventType,
    aggregate_type: &str,
    aggregate_id: &str,
    payload: serde_json::Value,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let am = outbox::ActiveModel {
        id: Set(id),
        event_type: Set(event_type.to_string()),
        aggregate_type: Set(aggregate_type.to_string()),
        aggregate_id: Set(aggregate_id.to_string()),
        payload: Set(payload),
        created_at: Set(Utc::now()),
    };
    outbox::Entity::insert(am).exec(conn).await?;
    Ok(id)
}

impl Store {
    /// Test/tooling entry point for appending a bare event outside a
    /// domain-write transaction.
    pub async fn append_outbox_event(
        &self,
        event_type: EventType,
        aggregate_type: &str,
        aggregate_id: &str,
        payload: serde_json::Value,
    ) -> Result<Uuid> {
        append_event(self.db(), event_type, aggregate_type, aggregate_id, payload).await
    }

    /// Claims a batch of events for `processor`: the oldest rows of the
    /// requested types that this processor has not acked, locked with
    /// `FOR UPDATE SKIP LOCKED` so concurrent replicas pick disjoint rows
    /// while the claim transaction is open.
    pub async fn claim_events(
        &self,
        txn: &DatabaseTransaction,
        processor: &str,
        event_types: &[EventType],
        limit: u64,
    ) -> Result<Vec<OutboxRow>> {
        if event_types.is_empty() {
            return Ok(Vec::new());
        }
        // The IN list is built from the closed EventType enum, never from
        // caller input.
        let filter = event_types
            .iter()
            .map(|t| format!("'{t}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT o.* FROM outbox o \
             WHERE o.event_type IN ({filter}) \
               AND NOT EXISTS ( \
                   SELECT 1 FROM outbox_processing p \
                   WHERE p.outbox_id = o.id AND p.processor = $1) \
             ORDER BY o.created_at ASC \
             LIMIT $2 \
             FOR UPDATE OF o SKIP LOCKED"
        );
        let models = outbox::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [processor.into(), (limit as i64).into()],
            ))
            .all(txn)
            .await?;
        models.into_iter().map(to_row).collect()
    }

    /// Acks one event for one processor. `ON CONFLICT DO NOTHING` makes the
    /// ack a no-op when a concurrent replica got there first, which is what
    /// keeps the at-least-once race harmless.
    pub async fn ack_event<C: ConnectionTrait>(
        &self,
        conn: &C,
        outbox_id: Uuid,
        processor: &str,
    ) -> Result<()> {
        conn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO outbox_processing (outbox_id, processor, processed_at) \
             VALUES ($1, $2, NOW()) ON CONFLICT DO NOTHING",
            [outbox_id.into(), processor.into()],
        ))
        .await?;
        Ok(())
    }

    pub async fn is_acked(&self, outbox_id: Uuid, processor: &str) -> Result<bool> {
        let count = outbox_processing::Entity::find()
            .filter(outbox_processing::Column::OutboxId.eq(outbox_id))
            .filter(outbox_processing::Column::Processor.eq(processor))
            .count(self.db())
            .await?;
        Ok(count > 0)
    }

    /// Events of one type for an aggregate; used by invariant checks.
    pub async fn find_events_for_aggregate(
        &self,
        event_type: EventType,
        aggregate_id: &str,
    ) -> Result<Vec<OutboxRow>> {
        let models = outbox::Entity::find()
            .filter(outbox::Column::EventType.eq(event_type.to_string()))
            .filter(outbox::Column::AggregateId.eq(aggregate_id))
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    /// Deletes outbox rows older than `horizon` that every registered
    /// processor has acked. A row nobody has acked is never deleted: with
    /// zero registered processors the double anti-join is vacuously true,
    /// hence the final EXISTS guard.
    pub async fn cleanup_outbox(&self, horizon: DateTime<Utc>) -> Result<u64> {
        let res = self
            .db()
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "DELETE FROM outbox o \
                 WHERE o.created_at < $1 \
                   AND EXISTS ( \
                       SELECT 1 FROM outbox_processing q WHERE q.outbox_id = o.id) \
                   AND NOT EXISTS ( \
                       SELECT 1 FROM (SELECT DISTINCT processor FROM outbox_processing) c \
                       WHERE NOT EXISTS ( \
                           SELECT 1 FROM outbox_processing p \
                           WHERE p.outbox_id = o.id AND p.processor = c.processor))",
                [horizon.into()],
            ))
            .await?;
        Ok(res.rows_affected())
    }
}
