use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::config::TableConfig;
use crate::equity::{EquityEstimator, MonteCarloEquity};
use crate::history::{HandHistoryStore, InMemoryHistoryStore};
use crate::table::{FastFoldHooks, TableHandle, TableInstance};

const LOG_TARGET: &str = "plo_server::server::registry";

/// Dev-server table registry: tables spring into being on first mention.
/// Production routing/matchmaking lives outside this crate; this is just
/// enough to drive tables from WebSocket clients.
pub struct TableRegistry {
    tables: DashMap<String, TableHandle>,
    config: TableConfig,
    history: Arc<dyn HandHistoryStore>,
    equity: Arc<dyn EquityEstimator>,
}

impl TableRegistry {
    pub fn new(config: TableConfig) -> Self {
        Self {
            tables: DashMap::new(),
            config,
            history: Arc::new(InMemoryHistoryStore::new()),
            equity: Arc::new(MonteCarloEquity::default()),
        }
    }

    pub fn get_or_create(&self, name: &str) -> TableHandle {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(target: LOG_TARGET, table = %name, "creating table");
                TableInstance::spawn(
                    self.config.clone(),
                    Arc::clone(&self.history),
                    Arc::clone(&self.equity),
                    FastFoldHooks::default(),
                )
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<TableHandle> {
        self.tables.get(name).map(|t| t.clone())
    }

    pub async fn shutdown_all(&self) {
        for entry in self.tables.iter() {
            entry.value().shutdown().await;
        }
    }
}
