use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Tables are created in dependency order.
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS services (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS departments (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS quality_rules (
    id TEXT PRIMARY KEY,
    metric_type TEXT NOT NULL
        CHECK (metric_type IN ('LATENCY_MS', 'PACKET_LOSS', 'ERROR_RATE', 'BUFFER_RATIO')),
    threshold NUMERIC(12,2) NOT NULL,
    operator TEXT NOT NULL
        CHECK (operator IN ('>', '>=', '<', '<=', '==', '!=')),
    action TEXT NOT NULL
        CHECK (action IN ('OPEN_INCIDENT')),
    priority INTEGER NOT NULL DEFAULT 0,
    severity TEXT NOT NULL
        CHECK (severity IN ('LOW', 'MEDIUM', 'HIGH', 'CRITICAL')),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    department_id TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_quality_rules_metric_type
    ON quality_rules(metric_type) WHERE is_active;

CREATE TABLE IF NOT EXISTS metrics (
    id UUID PRIMARY KEY,
    service_id TEXT NOT NULL REFERENCES services(id),
    metric_type TEXT NOT NULL
        CHECK (metric_type IN ('LATENCY_MS', 'PACKET_LOSS', 'ERROR_RATE', 'BUFFER_RATIO')),
    value NUMERIC(12,2) NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_metrics_service_recorded
    ON metrics(service_id, recorded_at DESC);

CREATE SEQUENCE IF NOT EXISTS incident_id_seq;
CREATE SEQUENCE IF NOT EXISTS notification_id_seq;

CREATE TABLE IF NOT EXISTS incidents (
    id TEXT PRIMARY KEY,
    service_id TEXT NOT NULL REFERENCES services(id),
    rule_id TEXT NOT NULL REFERENCES quality_rules(id),
    metric_id UUID NOT NULL REFERENCES metrics(id),
    severity TEXT NOT NULL
        CHECK (severity IN ('LOW', 'MEDIUM', 'HIGH', 'CRITICAL')),
    status TEXT NOT NULL DEFAULT 'OPEN'
        CHECK (status IN ('OPEN', 'IN_PROGRESS', 'CLOSED')),
    message TEXT,
    opened_at TIMESTAMPTZ NOT NULL,
    closed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status);
CREATE INDEX IF NOT EXISTS idx_incidents_service ON incidents(service_id);
CREATE INDEX IF NOT EXISTS idx_incidents_rule ON incidents(rule_id);

CREATE TABLE IF NOT EXISTS outbox (
    id UUID PRIMARY KEY,
    event_type TEXT NOT NULL
        CHECK (event_type IN ('METRIC_CREATED', 'INCIDENT_CREATED', 'INCIDENT_UPDATED')),
    aggregate_type TEXT NOT NULL,
    aggregate_id TEXT NOT NULL,
    payload JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS outbox_processing (
    outbox_id UUID NOT NULL REFERENCES outbox(id) ON DELETE CASCADE,
    processor TEXT NOT NULL,
    processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (outbox_id, processor)
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    incident_id TEXT NOT NULL REFERENCES incidents(id),
    target TEXT NOT NULL,
    message TEXT NOT NULL,
    is_read BOOLEAN NOT NULL DEFAULT FALSE,
    sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_notifications_incident ON notifications(incident_id);

CREATE TABLE IF NOT EXISTS incident_comments (
    id UUID PRIMARY KEY,
    incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    author TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_incident_comments_incident ON incident_comments(incident_id);

CREATE TABLE IF NOT EXISTS incident_events (
    id UUID PRIMARY KEY,
    incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    event_type TEXT NOT NULL
        CHECK (event_type IN ('STATUS_CHANGED', 'COMMENT_ADDED')),
    actor TEXT,
    old_value TEXT,
    new_value TEXT,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_incident_events_incident ON incident_events(incident_id);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS incident_events;
DROP TABLE IF EXISTS incident_comments;
DROP TABLE IF EXISTS notifications;
DROP TABLE IF EXISTS outbox_processing;
DROP TABLE IF EXISTS outbox;
DROP TABLE IF EXISTS incidents;
DROP TABLE IF EXISTS metrics;
DROP TABLE IF EXISTS quality_rules;
DROP TABLE IF EXISTS departments;
DROP TABLE IF EXISTS services;
DROP SEQUENCE IF EXISTS notification_id_seq;
DROP SEQUENCE IF EXISTS incident_id_seq;
";
