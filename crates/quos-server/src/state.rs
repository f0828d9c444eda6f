use chrono::{DateTime, Utc};
use quos_storage::Store;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub start_time: DateTime<Utc>,
    pub config: std::sync::Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Store, config: ServerConfig) -> Self {
        Self {
            store,
            start_time: Utc::now(),
            config: std::sync::Arc::new(config),
        }
    }
}
