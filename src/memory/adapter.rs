//! Memory adapter: short-term window plus the selected long-term backend.

use super::{LocalFileMemory, MemoryFilter, MemoryProvider, PostgresMemory, ShortTermWindow};
use crate::config::MemoryConfig;
use crate::error::CortexError;
use crate::models::MemoryRecord;
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Which long-term variant is serving reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Durable,
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Durable => write!(f, "durable"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// Outcome of a successful [`MemoryAdapter::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreReceipt {
    /// The record reached the window but not long-term storage.
    pub degraded: bool,
}

pub struct MemoryAdapter {
    window: ShortTermWindow,
    durable: Option<Arc<dyn MemoryProvider>>,
    local: Arc<dyn MemoryProvider>,
    active: RwLock<(BackendKind, Arc<dyn MemoryProvider>)>,
}

impl MemoryAdapter {
    /// Probe the durable backend once, pick the active backend and hydrate the
    /// window from its newest records.
    pub async fn initialize(
        window_size: usize,
        durable: Option<Arc<dyn MemoryProvider>>,
        local: Arc<dyn MemoryProvider>,
    ) -> Self {
        let selected = Self::select(durable.as_ref(), &local).await;
        let adapter = Self {
            window: ShortTermWindow::new(window_size),
            durable,
            local,
            active: RwLock::new(selected),
        };
        adapter.hydrate().await;
        adapter
    }

    /// Build backends from configuration. Only an unusable local path fails.
    pub async fn from_config(config: &MemoryConfig) -> Result<Self> {
        let durable: Option<Arc<dyn MemoryProvider>> = match config.database_url.as_deref() {
            Some(url) => match PostgresMemory::connect_lazy(url, config.max_connections) {
                Ok(pg) => Some(Arc::new(pg)),
                Err(e) => {
                    warn!(error = %e, "Invalid durable memory descriptor, using local store");
                    None
                }
            },
            None => None,
        };

        let local: Arc<dyn MemoryProvider> =
            Arc::new(LocalFileMemory::open(&config.local_path).await?);

        Ok(Self::initialize(config.window_size, durable, local).await)
    }

    async fn select(
        durable: Option<&Arc<dyn MemoryProvider>>,
        local: &Arc<dyn MemoryProvider>,
    ) -> (BackendKind, Arc<dyn MemoryProvider>) {
        if let Some(durable) = durable {
            if durable.health().await {
                info!(backend = durable.backend_name(), "Memory backend: durable");
                return (BackendKind::Durable, durable.clone());
            }
            warn!(
                backend = durable.backend_name(),
                "Durable memory backend unavailable, falling back to local store"
            );
        }
        info!(backend = local.backend_name(), "Memory backend: local");
        (BackendKind::Local, local.clone())
    }

    async fn hydrate(&self) {
        let backend = self.backend().await;
        match backend.recent(self.window.capacity()).await {
            Ok(records) => {
                let count = records.len();
                self.window.hydrate(records).await;
                info!(records = count, "Short-term memory hydrated");
            }
            Err(e) => warn!(error = %e, "Could not hydrate short-term memory"),
        }
    }

    async fn backend(&self) -> Arc<dyn MemoryProvider> {
        self.active.read().await.1.clone()
    }

    pub async fn active_backend(&self) -> BackendKind {
        self.active.read().await.0
    }

    /// Re-attempt the durable backend and swap the active slot.
    pub async fn reinitialize(&self) -> BackendKind {
        let selected = Self::select(self.durable.as_ref(), &self.local).await;
        let kind = selected.0;
        *self.active.write().await = selected;
        kind
    }

    /// Write to the active backend, then to the window.
    ///
    /// A failed long-term write on a backend that still answers its health
    /// probe is reported as degraded; an unreachable backend surfaces
    /// [`CortexError::MemoryIoFailure`]. Once the backend call has returned
    /// the window write happens either way. A store dropped while the backend
    /// call is in flight leaves the window untouched.
    pub async fn store(&self, record: MemoryRecord) -> Result<StoreReceipt> {
        let backend = self.backend().await;
        let written = backend.store(&record).await;
        self.window.push(record.clone()).await;

        match written {
            Ok(()) => Ok(StoreReceipt::default()),
            Err(e) if backend.health().await => {
                warn!(
                    backend = backend.backend_name(),
                    id = %record.id,
                    error = %e,
                    "Long-term memory write failed, kept in short-term only"
                );
                Ok(StoreReceipt { degraded: true })
            }
            Err(e) => {
                error!(
                    backend = backend.backend_name(),
                    id = %record.id,
                    error = %e,
                    "Long-term memory backend unreachable"
                );
                Err(CortexError::MemoryIoFailure(format!(
                    "{} backend unreachable: {}",
                    backend.backend_name(),
                    e
                )))
            }
        }
    }

    /// Newest `n` records (oldest first), from the window if the backend fails.
    pub async fn recent(&self, n: usize) -> Result<Vec<MemoryRecord>> {
        let backend = self.backend().await;
        match backend.recent(n).await {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(error = %e, "Long-term recent() failed, serving short-term window");
                self.window.recent(n).await
            }
        }
    }

    pub async fn search(&self, filter: &MemoryFilter) -> Result<Vec<MemoryRecord>> {
        let backend = self.backend().await;
        match backend.search(filter).await {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(error = %e, "Long-term search failed, serving short-term window");
                self.window.search(filter).await
            }
        }
    }

    pub fn short_term(&self) -> &ShortTermWindow {
        &self.window
    }

    pub async fn health(&self) -> bool {
        self.backend().await.health().await
    }
}
