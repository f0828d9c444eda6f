use serde::{Deserialize, Serialize};

/// Kind of telemetry sample accepted on the ingest path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    LatencyMs,
    PacketLoss,
    ErrorRate,
    BufferRatio,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricType::LatencyMs => write!(f, "LATENCY_MS"),
            MetricType::PacketLoss => write!(f, "PACKET_LOSS"),
            MetricType::ErrorRate => write!(f, "ERROR_RATE"),
            MetricType::BufferRatio => write!(f, "BUFFER_RATIO"),
        }
    }
}

impl std::str::FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LATENCY_MS" => Ok(MetricType::LatencyMs),
            "PACKET_LOSS" => Ok(MetricType::PacketLoss),
            "ERROR_RATE" => Ok(MetricType::ErrorRate),
            "BUFFER_RATIO" => Ok(MetricType::BufferRatio),
            _ => Err(format!("unknown metric type: {s}")),
        }
    }
}

/// Comparison operator applied between a metric value and a rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::GreaterThan => write!(f, ">"),
            CompareOp::GreaterEqual => write!(f, ">="),
            CompareOp::LessThan => write!(f, "<"),
            CompareOp::LessEqual => write!(f, "<="),
            CompareOp::Equal => write!(f, "=="),
            CompareOp::NotEqual => write!(f, "!="),
        }
    }
}

impl std::str::FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(CompareOp::GreaterThan),
            ">=" => Ok(CompareOp::GreaterEqual),
            "<" => Ok(CompareOp::LessThan),
            "<=" => Ok(CompareOp::LessEqual),
            "==" => Ok(CompareOp::Equal),
            "!=" => Ok(CompareOp::NotEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

/// Side effect a rule requests when its comparison fires.
///
/// Only `OPEN_INCIDENT` exists today; further actions are reserved and parse
/// as errors until they are implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    OpenIncident,
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleAction::OpenIncident => write!(f, "OPEN_INCIDENT"),
        }
    }
}

impl std::str::FromStr for RuleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN_INCIDENT" => Ok(RuleAction::OpenIncident),
            _ => Err(format!("unknown rule action: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Incident lifecycle state. `CLOSED` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Closed,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Open => write!(f, "OPEN"),
            IncidentStatus::InProgress => write!(f, "IN_PROGRESS"),
            IncidentStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(IncidentStatus::Open),
            "IN_PROGRESS" => Ok(IncidentStatus::InProgress),
            "CLOSED" => Ok(IncidentStatus::Closed),
            _ => Err(format!("unknown incident status: {s}")),
        }
    }
}

/// Outbox event discriminator. The `(event_type, created_at)` index backs the
/// per-consumer claim query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    MetricCreated,
    IncidentCreated,
    IncidentUpdated,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::MetricCreated => write!(f, "METRIC_CREATED"),
            EventType::IncidentCreated => write!(f, "INCIDENT_CREATED"),
            EventType::IncidentUpdated => write!(f, "INCIDENT_UPDATED"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "METRIC_CREATED" => Ok(EventType::MetricCreated),
            "INCIDENT_CREATED" => Ok(EventType::IncidentCreated),
            "INCIDENT_UPDATED" => Ok(EventType::IncidentUpdated),
            _ => Err(format!("unknown event type: {s}")),
        }
    }
}

/// Timeline entry kind on an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentEventType {
    StatusChanged,
    CommentAdded,
}

impl std::fmt::Display for IncidentEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentEventType::StatusChanged => write!(f, "STATUS_CHANGED"),
            IncidentEventType::CommentAdded => write!(f, "COMMENT_ADDED"),
        }
    }
}

impl std::str::FromStr for IncidentEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STATUS_CHANGED" => Ok(IncidentEventType::StatusChanged),
            "COMMENT_ADDED" => Ok(IncidentEventType::CommentAdded),
            _ => Err(format!("unknown incident event type: {s}")),
        }
    }
}
