pub mod department;
pub mod incident;
pub mod incident_comment;
pub mod incident_event;
pub mod metric;
pub mod notification;
pub mod outbox;
pub mod outbox_processing;
pub mod quality_rule;
pub mod service;
