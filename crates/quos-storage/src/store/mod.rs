use migration::{Migrator, MigratorTrait};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend, Statement,
    TransactionTrait,
};

use crate::error::{Result, StorageError};

pub mod department;
pub mod incident;
pub mod metric;
pub mod notification;
pub mod outbox;
pub mod rule;
pub mod service;

/// Unified access layer over the quos Postgres database.
///
/// All methods are `async fn` on SeaORM. The store is cheap to clone and is
/// shared between the HTTP handlers and the outbox consumers; every
/// transactional operation borrows a connection from the pool for the
/// duration of its transaction only.
#[derive(Clone)]
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// Connects to the database and runs all pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = Database::connect(database_url).await?;
        Migrator::up(&db, None).await?;
        tracing::info!("storage initialized");
        Ok(Self { db })
    }

    /// Wraps an existing connection without running migrations.
    pub fn with_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Opens a transaction for a consumer claim batch.
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        Ok(self.db.begin().await?)
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}

/// Fetches the next value of a named database sequence.
pub(crate) async fn next_seq<C: ConnectionTrait>(conn: &C, sequence: &'static str) -> Result<i64> {
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!("SELECT nextval('{sequence}') AS id"),
    );
    let row = conn
        .query_one(stmt)
        .await?
        .ok_or_else(|| StorageError::Corrupt {
            entity: "sequence",
            detail: format!("nextval('{sequence}') returned no row"),
        })?;
    Ok(row.try_get::<i64>("", "id")?)
}

/// Rounds a float to the NUMERIC(12,2) storage form.
pub(crate) fn to_fixed2(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp(2)
}

/// Converts a stored fixed-point value to the f64 used at evaluation time.
pub(crate) fn fixed2_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
