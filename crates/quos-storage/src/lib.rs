//! Relational storage layer for the quos incident pipeline.
//!
//! A single Postgres database is the source of truth and the only
//! synchronisation primitive between the HTTP front-end and the outbox
//! consumers. The [`store::Store`] facade owns the connection, runs
//! migrations on startup, and exposes per-aggregate operations from the
//! `store/` submodules. Writes that must be observable by consumers
//! (metric ingest, incident creation) insert their outbox row in the same
//! transaction as the domain row.

pub mod entities;
pub mod error;
pub mod store;

pub use error::{Result, StorageError};
pub use store::incident::{
    CommentRow, IncidentEventRow, IncidentFilter, IncidentRow, NewIncident,
};
pub use store::metric::{BucketSize, MetricBucketRow, MetricFilter, MetricRow, NewMetric};
pub use store::notification::NotificationRow;
pub use store::outbox::OutboxRow;
pub use store::rule::{NewRule, RuleFilter, RuleRow, RuleUpdate};
pub use store::Store;
pub use store::{department::DepartmentRow, service::ServiceRow};
