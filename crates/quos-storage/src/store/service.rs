use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::entities::service::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;

/// Monitored service row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: service::Model) -> ServiceRow {
    ServiceRow {
        id: m.id,
        name: m.name,
        description: m.description,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

impl Store {
    pub async fn create_service(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<ServiceRow> {
        if id.is_empty() {
            return Err(StorageError::Validation("service id is required".into()));
        }
        let now = Utc::now();
        let am = service::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            description: Set(description.map(str::to_string)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await.map_err(|e| {
            if StorageError::is_unique_violation(&e) {
                StorageError::Conflict {
                    entity: "service",
                    id: id.to_string(),
                    detail: "a service with this id already exists".into(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(to_row(model))
    }

    pub async fn get_service(&self, id: &str) -> Result<ServiceRow> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "service",
                id: id.to_string(),
            })?;
        Ok(to_row(model))
    }

    /// Best-effort lookup for the indexer's service-name join.
    pub async fn find_service(&self, id: &str) -> Result<Option<ServiceRow>> {
        Ok(Entity::find_by_id(id).one(self.db()).await?.map(to_row))
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceRow>> {
        let models = Entity::find()
            .order_by_asc(Column::Id)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_row).collect())
    }
}
