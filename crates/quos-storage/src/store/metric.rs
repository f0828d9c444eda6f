use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quos_common::events::MetricCreatedPayload;
use quos_common::types::{EventType, MetricType};

use crate::entities::metric::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::outbox::append_event;
use crate::store::{fixed2_to_f64, to_fixed2, Store};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub id: Uuid,
    pub service_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMetric {
    pub service_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    /// Defaults to now when the client does not supply it.
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    pub service_id_eq: Option<String>,
    pub metric_type_eq: Option<MetricType>,
}

/// Time-bucket size for chart aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketSize {
    Minute,
    Hour,
    Day,
}

impl BucketSize {
    fn as_str(self) -> &'static str {
        match self {
            BucketSize::Minute => "minute",
            BucketSize::Hour => "hour",
            BucketSize::Day => "day",
        }
    }
}

impl std::str::FromStr for BucketSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "minute" => Ok(BucketSize::Minute),
            "hour" => Ok(BucketSize::Hour),
            "day" => Ok(BucketSize::Day),
            _ => Err(format!("unknown bucket size: {s}")),
        }
    }
}

/// One aggregated chart point.
#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct MetricBucketRow {
    pub bucket: DateTime<Utc>,
    pub avg_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub sample_count: i64,
}

fn to_row(m: metric::Model) -> Result<MetricRow> {
    Ok(MetricRow {
        id: m.id,
        service_id: m.service_id,
        metric_type: m.metric_type.parse().map_err(|detail| StorageError::Corrupt {
            entity: "metric",
            detail,
        })?,
        value: fixed2_to_f64(m.value),
        recorded_at: m.recorded_at,
        created_at: m.created_at,
    })
}

impl Store {
    /// Admits a metric: inserts the row and its `METRIC_CREATED` outbox
    /// event in one transaction. If either insert fails both roll back, so
    /// a metric without an event (or vice versa) cannot exist.
    pub async fn admit_metric(&self, req: &NewMetric) -> Result<MetricRow> {
        if req.service_id.is_empty() {
            return Err(StorageError::Validation("service_id is required".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let recorded_at = req.recorded_at.unwrap_or(now);
        let value = to_fixed2(req.value);

        let txn = self.db.begin().await?;

        let am = metric::ActiveModel {
            id: Set(id),
            service_id: Set(req.service_id.clone()),
            metric_type: Set(req.metric_type.to_string()),
            value: Set(value),
            recorded_at: Set(recorded_at),
            created_at: Set(now),
        };
        let model = am.insert(&txn).await?;

        let payload = MetricCreatedPayload {
            id: id.to_string(),
            service_id: model.service_id.clone(),
            metric_type: req.metric_type,
            value: fixed2_to_f64(model.value),
            recorded_at: model.recorded_at,
        };
        append_event(
            &txn,
            EventType::MetricCreated,
            "metric",
            &id.to_string(),
            serde_json::to_value(&payload)?,
        )
        .await?;

        txn.commit().await?;
        to_row(model)
    }

    pub async fn get_metric(&self, id: Uuid) -> Result<MetricRow> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "metric",
                id: id.to_string(),
            })?;
        to_row(model)
    }

    pub async fn list_metrics(
        &self,
        filter: &MetricFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MetricRow>> {
        let mut query = Entity::find();
        if let Some(service_id) = &filter.service_id_eq {
            query = query.filter(Column::ServiceId.eq(service_id));
        }
        if let Some(mt) = filter.metric_type_eq {
            query = query.filter(Column::MetricType.eq(mt.to_string()));
        }
        let models = query
            .order_by_desc(Column::RecordedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    pub async fn count_metrics(&self, filter: &MetricFilter) -> Result<u64> {
        let mut query = Entity::find();
        if let Some(service_id) = &filter.service_id_eq {
            query = query.filter(Column::ServiceId.eq(service_id));
        }
        if let Some(mt) = filter.metric_type_eq {
            query = query.filter(Column::MetricType.eq(mt.to_string()));
        }
        Ok(query.count(self.db()).await?)
    }

    /// Bucketed min/avg/max aggregation over a time range, for charting.
    pub async fn aggregate_metrics(
        &self,
        filter: &MetricFilter,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        bucket: BucketSize,
    ) -> Result<Vec<MetricBucketRow>> {
        let mut sql = format!(
            "SELECT date_trunc('{}', recorded_at) AS bucket, \
             AVG(value)::float8 AS avg_value, \
             MIN(value)::float8 AS min_value, \
             MAX(value)::float8 AS max_value, \
             COUNT(*)::bigint AS sample_count \
             FROM metrics WHERE recorded_at >= $1 AND recorded_at <= $2",
            bucket.as_str()
        );
        let mut values: Vec<sea_orm::Value> = vec![from.into(), to.into()];
        if let Some(service_id) = &filter.service_id_eq {
            values.push(service_id.clone().into());
            sql.push_str(&format!(" AND service_id = ${}", values.len()));
        }
        if let Some(mt) = filter.metric_type_eq {
            values.push(mt.to_string().into());
            sql.push_str(&format!(" AND metric_type = ${}", values.len()));
        }
        sql.push_str(" GROUP BY bucket ORDER BY bucket ASC");

        Ok(MetricBucketRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            values,
        ))
        .all(self.db())
        .await?)
    }
}
