use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, Statement,
};
use serde::{Deserialize, Serialize};

use quos_common::types::{CompareOp, MetricType, RuleAction, Severity};

use crate::entities::quality_rule::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{fixed2_to_f64, to_fixed2, Store};

/// Quality rule row with the wire enums already parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRow {
    pub id: String,
    pub metric_type: MetricType,
    pub threshold: f64,
    pub operator: CompareOp,
    pub action: RuleAction,
    pub priority: i32,
    pub severity: Severity,
    pub is_active: bool,
    pub department_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of incidents this rule has opened. Populated by the list
    /// query; zero on single-row lookups.
    pub trigger_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    pub id: String,
    pub metric_type: MetricType,
    pub threshold: f64,
    pub operator: CompareOp,
    pub action: RuleAction,
    #[serde(default)]
    pub priority: i32,
    pub severity: Severity,
    pub is_active: bool,
    #[serde(default)]
    pub department_id: Option<String>,
}

/// Full-update request; PATCH replaces every mutable field.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleUpdate {
    pub metric_type: MetricType,
    pub threshold: f64,
    pub operator: CompareOp,
    pub action: RuleAction,
    #[serde(default)]
    pub priority: i32,
    pub severity: Severity,
    pub is_active: bool,
    #[serde(default)]
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub metric_type_eq: Option<MetricType>,
    pub severity_eq: Option<Severity>,
    pub is_active_eq: Option<bool>,
}

fn parse_row(
    id: String,
    metric_type: &str,
    threshold: Decimal,
    operator: &str,
    action: &str,
    priority: i32,
    severity: &str,
    is_active: bool,
    department_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    trigger_count: i64,
) -> Result<RuleRow> {
    let corrupt = |detail: String| StorageError::Corrupt {
        entity: "quality_rule",
        detail,
    };
    Ok(RuleRow {
        id,
        metric_type: metric_type.parse().map_err(&corrupt)?,
        threshold: fixed2_to_f64(threshold),
        operator: operator.parse().map_err(&corrupt)?,
        action: action.parse().map_err(&corrupt)?,
        priority,
        severity: severity.parse().map_err(&corrupt)?,
        is_active,
        department_id,
        created_at,
        updated_at,
        trigger_count,
    })
}

fn to_row(m: quality_rule::Model) -> Result<RuleRow> {
    parse_row(
        m.id,
        &m.metric_type,
        m.threshold,
        &m.operator,
        &m.action,
        m.priority,
        &m.severity,
        m.is_active,
        m.department_id,
        m.created_at,
        m.updated_at,
        0,
    )
}

#[derive(Debug, FromQueryResult)]
struct RuleWithStats {
    id: String,
    metric_type: String,
    threshold: Decimal,
    operator: String,
    action: String,
    priority: i32,
    severity: String,
    is_active: bool,
    department_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    trigger_count: i64,
}

impl Store {
    pub async fn create_rule(&self, req: &NewRule) -> Result<RuleRow> {
        if req.id.is_empty() {
            return Err(StorageError::Validation("rule id is required".into()));
        }
        let now = Utc::now();
        let am = quality_rule::ActiveModel {
            id: Set(req.id.clone()),
            metric_type: Set(req.metric_type.to_string()),
            threshold: Set(to_fixed2(req.threshold)),
            operator: Set(req.operator.to_string()),
            action: Set(req.action.to_string()),
            priority: Set(req.priority),
            severity: Set(req.severity.to_string()),
            is_active: Set(req.is_active),
            department_id: Set(req.department_id.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await.map_err(|e| {
            if StorageError::is_unique_violation(&e) {
                StorageError::Conflict {
                    entity: "quality_rule",
                    id: req.id.clone(),
                    detail: "a rule with this id already exists".into(),
                }
            } else {
                e.into()
            }
        })?;
        to_row(model)
    }

    pub async fn get_rule(&self, id: &str) -> Result<RuleRow> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "quality_rule",
                id: id.to_string(),
            })?;
        to_row(model)
    }

    pub async fn update_rule(&self, id: &str, req: &RuleUpdate) -> Result<RuleRow> {
        self.get_rule(id).await?;
        let am = quality_rule::ActiveModel {
            id: Set(id.to_string()),
            metric_type: Set(req.metric_type.to_string()),
            threshold: Set(to_fixed2(req.threshold)),
            operator: Set(req.operator.to_string()),
            action: Set(req.action.to_string()),
            priority: Set(req.priority),
            severity: Set(req.severity.to_string()),
            is_active: Set(req.is_active),
            department_id: Set(req.department_id.clone()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        to_row(am.update(self.db()).await?)
    }

    pub async fn delete_rule(&self, id: &str) -> Result<()> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        if res.rows_affected == 0 {
            return Err(StorageError::NotFound {
                entity: "quality_rule",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Paginated rule list with per-rule incident counts.
    pub async fn list_rules(
        &self,
        filter: &RuleFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<RuleRow>> {
        let mut sql = String::from(
            "SELECT r.id, r.metric_type, r.threshold, r.operator, r.action, r.priority, \
             r.severity, r.is_active, r.department_id, r.created_at, r.updated_at, \
             COUNT(i.id)::bigint AS trigger_count \
             FROM quality_rules r LEFT JOIN incidents i ON i.rule_id = r.id WHERE TRUE",
        );
        let mut values: Vec<sea_orm::Value> = Vec::new();
        if let Some(mt) = filter.metric_type_eq {
            values.push(mt.to_string().into());
            sql.push_str(&format!(" AND r.metric_type = ${}", values.len()));
        }
        if let Some(sev) = filter.severity_eq {
            values.push(sev.to_string().into());
            sql.push_str(&format!(" AND r.severity = ${}", values.len()));
        }
        if let Some(active) = filter.is_active_eq {
            values.push(active.into());
            sql.push_str(&format!(" AND r.is_active = ${}", values.len()));
        }
        sql.push_str(" GROUP BY r.id ORDER BY r.priority ASC, r.id ASC");
        values.push((limit as i64).into());
        sql.push_str(&format!(" LIMIT ${}", values.len()));
        values.push((offset as i64).into());
        sql.push_str(&format!(" OFFSET ${}", values.len()));

        let rows = RuleWithStats::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            values,
        ))
        .all(self.db())
        .await?;

        rows.into_iter()
            .map(|r| {
                parse_row(
                    r.id,
                    &r.metric_type,
                    r.threshold,
                    &r.operator,
                    &r.action,
                    r.priority,
                    &r.severity,
                    r.is_active,
                    r.department_id,
                    r.created_at,
                    r.updated_at,
                    r.trigger_count,
                )
            })
            .collect()
    }

    pub async fn count_rules(&self, filter: &RuleFilter) -> Result<u64> {
        let mut query = Entity::find();
        if let Some(mt) = filter.metric_type_eq {
            query = query.filter(Column::MetricType.eq(mt.to_string()));
        }
        if let Some(sev) = filter.severity_eq {
            query = query.filter(Column::Severity.eq(sev.to_string()));
        }
        if let Some(active) = filter.is_active_eq {
            query = query.filter(Column::IsActive.eq(active));
        }
        Ok(query.count(self.db()).await?)
    }

    /// Active rules for one metric type, priority order. This is the rule
    /// worker's fan-out set; rows that no longer parse are logged and
    /// skipped so one bad row cannot stall the whole consumer.
    pub async fn list_active_rules(&self, metric_type: MetricType) -> Result<Vec<RuleRow>> {
        let models = Entity::find()
            .filter(Column::IsActive.eq(true))
            .filter(Column::MetricType.eq(metric_type.to_string()))
            .order_by_asc(Column::Priority)
            .all(self.db())
            .await?;
        let mut rows = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            match to_row(model) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(rule_id = %id, error = %e, "skipping unparsable rule");
                }
            }
        }
        Ok(rows)
    }
}
