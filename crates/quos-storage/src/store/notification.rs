use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::notification::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{next_seq, Store};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub incident_id: String,
    pub target: String,
    pub message: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: notification::Model) -> NotificationRow {
    NotificationRow {
        id: m.id,
        incident_id: m.incident_id,
        target: m.target,
        message: m.message,
        is_read: m.is_read,
        sent_at: m.sent_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

impl Store {
    /// Inserts a notification with the next `N-<n>` id from the database
    /// sequence. The ack cursor provides delivery idempotence; the sequence
    /// is allowed to skip numbers on retries.
    pub async fn create_notification(
        &self,
        incident_id: &str,
        target: &str,
        message: &str,
    ) -> Result<NotificationRow> {
        let seq = next_seq(self.db(), "notification_id_seq").await?;
        let id = format!("N-{seq}");
        let now = Utc::now();
        let am = notification::ActiveModel {
            id: Set(id),
            incident_id: Set(incident_id.to_string()),
            target: Set(target.to_string()),
            message: Set(message.to_string()),
            is_read: Set(false),
            sent_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(to_row(am.insert(self.db()).await?))
    }

    pub async fn get_notification(&self, id: &str) -> Result<NotificationRow> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "notification",
                id: id.to_string(),
            })?;
        Ok(to_row(model))
    }

    pub async fn list_notifications(&self, limit: u64, offset: u64) -> Result<Vec<NotificationRow>> {
        let models = Entity::find()
            .order_by_desc(Column::SentAt)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_row).collect())
    }

    pub async fn count_notifications(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }

    pub async fn list_notifications_by_incident(
        &self,
        incident_id: &str,
    ) -> Result<Vec<NotificationRow>> {
        let models = Entity::find()
            .filter(Column::IncidentId.eq(incident_id))
            .order_by_asc(Column::SentAt)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_row).collect())
    }
}
