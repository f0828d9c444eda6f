use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quos_common::events::IncidentCreatedPayload;
use quos_common::types::{EventType, IncidentEventType, IncidentStatus, Severity};

use crate::entities::incident::{self, Column, Entity};
use crate::entities::{incident_comment, incident_event};
use crate::error::{Result, StorageError};
use crate::store::outbox::append_event;
use crate::store::{next_seq, Store};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentRow {
    pub id: String,
    pub service_id: String,
    pub rule_id: String,
    pub metric_id: Uuid,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub message: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIncident {
    pub service_id: String,
    pub rule_id: String,
    pub metric_id: Uuid,
    pub severity: Severity,
    pub message: String,
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub status_eq: Option<IncidentStatus>,
    pub severity_eq: Option<Severity>,
    pub service_id_eq: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: Uuid,
    pub incident_id: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEventRow {
    pub id: Uuid,
    pub incident_id: String,
    pub event_type: IncidentEventType,
    pub actor: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn to_row(m: incident::Model) -> Result<IncidentRow> {
    let corrupt = |detail: String| StorageError::Corrupt {
        entity: "incident",
        detail,
    };
    Ok(IncidentRow {
        id: m.id,
        service_id: m.service_id,
        rule_id: m.rule_id,
        metric_id: m.metric_id,
        severity: m.severity.parse().map_err(&corrupt)?,
        status: m.status.parse().map_err(&corrupt)?,
        message: m.message,
        opened_at: m.opened_at,
        closed_at: m.closed_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn to_comment_row(m: incident_comment::Model) -> CommentRow {
    CommentRow {
        id: m.id,
        incident_id: m.incident_id,
        author: m.author,
        content: m.content,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn to_event_row(m: incident_event::Model) -> Result<IncidentEventRow> {
    Ok(IncidentEventRow {
        id: m.id,
        incident_id: m.incident_id,
        event_type: m.event_type.parse().map_err(|detail| StorageError::Corrupt {
            entity: "incident_event",
            detail,
        })?,
        actor: m.actor,
        old_value: m.old_value,
        new_value: m.new_value,
        created_at: m.created_at,
    })
}

async fn insert_timeline_event<C: ConnectionTrait>(
    conn: &C,
    incident_id: &str,
    event_type: IncidentEventType,
    actor: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
) -> Result<incident_event::Model> {
    let am = incident_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        incident_id: Set(incident_id.to_string()),
        event_type: Set(event_type.to_string()),
        actor: Set(Some(actor.to_string())),
        old_value: Set(old_value.map(str::to_string)),
        new_value: Set(new_value.map(str::to_string)),
        metadata: Set(None),
        created_at: Set(Utc::now()),
    };
    Ok(am.insert(conn).await?)
}

impl Store {
    /// Opens an incident: allocates the next `INC-<n>` id from the database
    /// sequence, inserts the row with `status = OPEN`, and appends the
    /// `INCIDENT_CREATED` outbox event, all in one transaction. Retried
    /// calls can burn sequence numbers but can never half-commit.
    pub async fn open_incident(&self, req: &NewIncident) -> Result<IncidentRow> {
        let txn = self.db.begin().await?;

        let seq = next_seq(&txn, "incident_id_seq").await?;
        let id = format!("INC-{seq}");
        let now = Utc::now();

        let am = incident::ActiveModel {
            id: Set(id.clone()),
            service_id: Set(req.service_id.clone()),
            rule_id: Set(req.rule_id.clone()),
            metric_id: Set(req.metric_id),
            severity: Set(req.severity.to_string()),
            status: Set(IncidentStatus::Open.to_string()),
            message: Set(Some(req.message.clone())),
            opened_at: Set(now),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(&txn).await?;

        let payload = IncidentCreatedPayload {
            id: id.clone(),
            service_id: req.service_id.clone(),
            rule_id: req.rule_id.clone(),
            metric_id: req.metric_id.to_string(),
            severity: req.severity,
            status: IncidentStatus::Open,
            message: req.message.clone(),
            department_id: req.department_id.clone(),
        };
        append_event(
            &txn,
            EventType::IncidentCreated,
            "incident",
            &id,
            serde_json::to_value(&payload)?,
        )
        .await?;

        txn.commit().await?;
        to_row(model)
    }

    pub async fn get_incident(&self, id: &str) -> Result<IncidentRow> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "incident",
                id: id.to_string(),
            })?;
        to_row(model)
    }

    pub async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<IncidentRow>> {
        let mut query = Entity::find();
        if let Some(status) = filter.status_eq {
            query = query.filter(Column::Status.eq(status.to_string()));
        }
        if let Some(severity) = filter.severity_eq {
            query = query.filter(Column::Severity.eq(severity.to_string()));
        }
        if let Some(service_id) = &filter.service_id_eq {
            query = query.filter(Column::ServiceId.eq(service_id));
        }
        let models = query
            .order_by_desc(Column::OpenedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    pub async fn count_incidents(&self, filter: &IncidentFilter) -> Result<u64> {
        let mut query = Entity::find();
        if let Some(status) = filter.status_eq {
            query = query.filter(Column::Status.eq(status.to_string()));
        }
        if let Some(severity) = filter.severity_eq {
            query = query.filter(Column::Severity.eq(severity.to_string()));
        }
        if let Some(service_id) = &filter.service_id_eq {
            query = query.filter(Column::ServiceId.eq(service_id));
        }
        Ok(query.count(self.db()).await?)
    }

    /// Applies a status transition under the state machine
    /// `OPEN → IN_PROGRESS → CLOSED` (direct `OPEN → CLOSED` allowed,
    /// `CLOSED` terminal). An effective change appends a `STATUS_CHANGED`
    /// timeline event in the same transaction; a transition to the current
    /// status is a no-op and appends nothing.
    pub async fn update_incident_status(
        &self,
        id: &str,
        new_status: IncidentStatus,
        actor: &str,
    ) -> Result<IncidentRow> {
        let txn = self.db.begin().await?;

        // Row lock so concurrent transitions serialize on the incident.
        let model = Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "incident",
                id: id.to_string(),
            })?;
        let current = to_row(model)?;

        if current.status == new_status {
            txn.commit().await?;
            return Ok(current);
        }
        if current.status == IncidentStatus::Closed {
            return Err(StorageError::Conflict {
                entity: "incident",
                id: id.to_string(),
                detail: "incident is closed".into(),
            });
        }

        let now = Utc::now();
        let am = incident::ActiveModel {
            id: Set(id.to_string()),
            status: Set(new_status.to_string()),
            closed_at: Set((new_status == IncidentStatus::Closed).then_some(now)),
            updated_at: Set(now),
            ..Default::default()
        };
        let updated = am.update(&txn).await?;

        insert_timeline_event(
            &txn,
            id,
            IncidentEventType::StatusChanged,
            actor,
            Some(&current.status.to_string()),
            Some(&new_status.to_string()),
        )
        .await?;

        txn.commit().await?;
        to_row(updated)
    }

    // ---- comments ----

    /// Adds a comment and its `COMMENT_ADDED` timeline entry together.
    pub async fn create_comment(
        &self,
        incident_id: &str,
        author: &str,
        content: &str,
    ) -> Result<CommentRow> {
        self.get_incident(incident_id).await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let am = incident_comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            incident_id: Set(incident_id.to_string()),
            author: Set(author.to_string()),
            content: Set(content.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(&txn).await?;
        insert_timeline_event(
            &txn,
            incident_id,
            IncidentEventType::CommentAdded,
            author,
            None,
            None,
        )
        .await?;
        txn.commit().await?;
        Ok(to_comment_row(model))
    }

    pub async fn list_comments(&self, incident_id: &str) -> Result<Vec<CommentRow>> {
        let models = incident_comment::Entity::find()
            .filter(incident_comment::Column::IncidentId.eq(incident_id))
            .order_by_asc(incident_comment::Column::CreatedAt)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_comment_row).collect())
    }

    /// Removes only the comment row. Deletion is not a timeline event.
    pub async fn delete_comment(&self, incident_id: &str, comment_id: Uuid) -> Result<()> {
        let res = incident_comment::Entity::delete_many()
            .filter(incident_comment::Column::Id.eq(comment_id))
            .filter(incident_comment::Column::IncidentId.eq(incident_id))
            .exec(self.db())
            .await?;
        if res.rows_affected == 0 {
            return Err(StorageError::NotFound {
                entity: "incident_comment",
                id: comment_id.to_string(),
            });
        }
        Ok(())
    }

    // ---- timeline ----

    pub async fn list_incident_events(&self, incident_id: &str) -> Result<Vec<IncidentEventRow>> {
        let models = incident_event::Entity::find()
            .filter(incident_event::Column::IncidentId.eq(incident_id))
            .order_by_asc(incident_event::Column::CreatedAt)
            .all(self.db())
            .await?;
        models.into_iter().map(to_event_row).collect()
    }
}
