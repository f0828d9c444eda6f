use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::entities::department::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: department::Model) -> DepartmentRow {
    DepartmentRow {
        id: m.id,
        name: m.name,
        description: m.description,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

impl Store {
    pub async fn create_department(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<DepartmentRow> {
        if id.is_empty() {
            return Err(StorageError::Validation("department id is required".into()));
        }
        let now = Utc::now();
        let am = department::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            description: Set(description.map(str::to_string)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await.map_err(|e| {
            if StorageError::is_unique_violation(&e) {
                StorageError::Conflict {
                    entity: "department",
                    id: id.to_string(),
                    detail: "a department with this id already exists".into(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(to_row(model))
    }

    pub async fn get_department(&self, id: &str) -> Result<DepartmentRow> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "department",
                id: id.to_string(),
            })?;
        Ok(to_row(model))
    }

    pub async fn list_departments(&self) -> Result<Vec<DepartmentRow>> {
        let models = Entity::find()
            .order_by_asc(Column::Id)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_row).collect())
    }

    pub async fn update_department(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<DepartmentRow> {
        // Existence check first so a missing row maps to NotFound, not a
        // driver error.
        self.get_department(id).await?;
        let am = department::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            description: Set(description.map(str::to_string)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(to_row(am.update(self.db()).await?))
    }

    pub async fn delete_department(&self, id: &str) -> Result<()> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        if res.rows_affected == 0 {
            return Err(StorageError::NotFound {
                entity: "department",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
