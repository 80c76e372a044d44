//! Shared NM state: one `tokio::sync::Mutex<Catalog>` plus the loaded
//! config, matching §5's "NM never acquires two mutexes" invariant —
//! every handler takes the single lock once per operation.

use std::path::PathBuf;

use docs_common::config::NmConfig;
use docs_common::error::DocsError;
use tokio::sync::Mutex;
use tracing::warn;

use crate::catalog::Catalog;

pub struct NmState {
    pub catalog: Mutex<Catalog>,
    pub cfg: NmConfig,
}

impl NmState {
    pub fn new(cfg: NmConfig) -> Self {
        let catalog = load_catalog(&cfg.catalog_path);
        Self {
            catalog: Mutex::new(catalog),
            cfg,
        }
    }

    pub async fn persist(&self) {
        let bytes = {
            let cat = self.catalog.lock().await;
            cat.to_persisted_bytes()
        };
        if let Some(parent) = self.cfg.catalog_path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(e) = tokio::fs::write(&self.cfg.catalog_path, bytes).await {
            warn!("failed to persist catalog to {:?}: {e}", self.cfg.catalog_path);
        }
    }
}

fn load_catalog(path: &PathBuf) -> Catalog {
    match std::fs::read(path) {
        Ok(bytes) => Catalog::from_persisted_bytes(&bytes).unwrap_or_else(|_: DocsError| Catalog::new()),
        Err(_) => Catalog::new(),
    }
}
