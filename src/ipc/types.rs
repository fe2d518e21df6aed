use crate::config::BackendConfig;
use crate::db::SqliteStore;
use crate::remote::RemoteStore;
use crate::store::{MemoryStore, Store};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Store>,
    /// Used when `workspace.remote` does not pass its own timeout.
    pub remote_timeout: Duration,
}

impl AppState {
    pub fn new(remote_timeout: Duration) -> Self {
        AppState {
            workspace: None,
            store: None,
            remote_timeout,
        }
    }

    /// Replace the active store. On failure the previous store stays open.
    pub fn open(&mut self, backend: &BackendConfig) -> anyhow::Result<()> {
        let (store, workspace) = match backend {
            BackendConfig::Deferred => return Ok(()),
            BackendConfig::Mock { seed } => {
                let store = if *seed {
                    MemoryStore::seeded()?
                } else {
                    MemoryStore::new()
                };
                (Store::Memory(store), None)
            }
            BackendConfig::Sqlite { workspace } => {
                let store = SqliteStore::open(workspace)?;
                let path = store.path().to_path_buf();
                (Store::Sqlite(store), Some(path))
            }
            BackendConfig::Remote {
                base_url,
                api_key,
                timeout,
            } => {
                let store = RemoteStore::new(base_url, api_key.clone(), *timeout)?;
                tracing::debug!(base_url = store.base_url(), ?timeout, "remote client ready");
                (Store::Remote(store), None)
            }
        };
        tracing::info!(
            backend = store.backend(),
            workspace = ?workspace,
            "store opened"
        );
        self.store = Some(store);
        self.workspace = workspace;
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(store) = self.store.take() {
            tracing::info!(backend = store.backend(), "store closed");
        }
        self.workspace = None;
    }
}
