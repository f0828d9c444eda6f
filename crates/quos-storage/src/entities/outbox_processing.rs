use sea_orm::entity::prelude::*;

/// Per-consumer ack cursor. Presence of a row means the processor has
/// handled the referenced outbox event.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "outbox_processing")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub outbox_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub processor: String,
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
