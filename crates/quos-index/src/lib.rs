//! HTTP client for the analytics search index (Elasticsearch wire
//! protocol). One document per metric, addressed by the metric's UUID, so
//! re-delivery of an outbox event overwrites the document with identical
//! content instead of duplicating it.

pub mod error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use error::{IndexError, Result};

/// Document stored per metric. Field types on the index side are fixed by
/// [`IndexClient::ensure_index`] (keyword / float / date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDocument {
    pub id: String,
    pub service_id: String,
    pub service_name: String,
    pub metric_type: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub struct IndexClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl IndexClient {
    pub fn new(base_url: &str, index: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub async fn ping(&self) -> Result<()> {
        let resp = self.client.get(&self.base_url).send().await?;
        if !resp.status().is_success() {
            return Err(IndexError::Api {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Creates the index with its fixed mapping. A 400 from an index that
    /// already exists is fine and logged at debug level.
    pub async fn ensure_index(&self) -> Result<()> {
        let mapping = json!({
            "settings": {
                "number_of_shards": 1,
                "number_of_replicas": 0,
                "refresh_interval": "5s",
            },
            "mappings": {
                "properties": {
                    "id":           { "type": "keyword" },
                    "service_id":   { "type": "keyword" },
                    "service_name": { "type": "keyword" },
                    "metric_type":  { "type": "keyword" },
                    "value":        { "type": "float" },
                    "recorded_at":  { "type": "date", "format": "strict_date_optional_time" },
                    "created_at":   { "type": "date", "format": "strict_date_optional_time" },
                },
            },
        });
        let url = format!("{}/{}", self.base_url, self.index);
        let resp = self.client.put(&url).json(&mapping).send().await?;
        if !resp.status().is_success() {
            tracing::debug!(
                index = %self.index,
                status = resp.status().as_u16(),
                "index create returned non-success (it may already exist)"
            );
        }
        Ok(())
    }

    /// Upserts the document under the metric id. `refresh=wait_for` trades
    /// write latency for read-your-writes consistency.
    pub async fn upsert_metric(&self, doc: &MetricDocument) -> Result<()> {
        let url = format!(
            "{}/{}/_doc/{}?refresh=wait_for",
            self.base_url, self.index, doc.id
        );
        let resp = self.client.put(&url).json(doc).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IndexError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Fetches a stored document by metric id; `None` on 404.
    pub async fn get_metric(&self, id: &str) -> Result<Option<MetricDocument>> {
        let url = format!("{}/{}/_doc/{}", self.base_url, self.index, id);
        let resp = self.client.get(&url).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(IndexError::Api {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let body: serde_json::Value = resp.json().await?;
        let source = body
            .get("_source")
            .cloned()
            .ok_or_else(|| IndexError::Decode("document without _source".into()))?;
        Ok(Some(serde_json::from_value(source).map_err(|e| {
            IndexError::Decode(e.to_string())
        })?))
    }
}
