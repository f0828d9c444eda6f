/// Errors that can occur within the storage layer.
///
/// The HTTP edge maps these onto status codes (`NotFound` → 404, `Conflict`
/// → 409, `Validation` → 400, everything else → 500); workers log them and
/// decide between retry (no ack) and skip.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A lookup by id returned nothing.
    #[error("storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A unique-key violation on create, or an illegal state transition.
    #[error("storage: conflict on {entity} (id={id}): {detail}")]
    Conflict {
        entity: &'static str,
        id: String,
        detail: String,
    },

    /// Bad input rejected before touching the database.
    #[error("storage: validation failed: {0}")]
    Validation(String),

    /// A persisted row no longer parses into its domain type. The CHECK
    /// constraints make this unreachable unless the schema and the enums
    /// drift apart.
    #[error("storage: corrupt {entity} row: {detail}")]
    Corrupt {
        entity: &'static str,
        detail: String,
    },

    /// An underlying database error.
    #[error("storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// JSON (de)serialization failure on a payload column.
    #[error("storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// True when the error is a unique-key conflict surfaced by the driver.
    pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
        matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        )
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
