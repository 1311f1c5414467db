//! Local fallback backend: an append-only JSON-lines file mirrored in memory.

use super::{tail, MemoryFilter, MemoryProvider};
use crate::error::CortexError;
use crate::models::MemoryRecord;
use crate::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct LocalFileMemory {
    path: Option<PathBuf>,
    records: RwLock<Vec<MemoryRecord>>,
}

impl LocalFileMemory {
    /// Open (or lazily create) the log at `path`. Malformed lines are skipped.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();

        match fs::read_to_string(&path).await {
            Ok(raw) => {
                for (line_no, line) in raw.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<MemoryRecord>(line) {
                        Ok(record) => records.push(record),
                        Err(e) => warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "Skipping malformed memory line"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        records.sort_by_key(|r| r.timestamp);
        info!(path = %path.display(), records = records.len(), "Local memory loaded");

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// Process-local store with no file behind it.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn append_line(path: &Path, record: &MemoryRecord) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MemoryProvider for LocalFileMemory {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn store(&self, record: &MemoryRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if let Some(path) = &self.path {
            Self::append_line(path, record).await.map_err(|e| {
                CortexError::MemoryIoFailure(format!("{}: {}", path.display(), e))
            })?;
        }
        records.push(record.clone());
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<MemoryRecord>> {
        Ok(tail(&self.records.read().await, n))
    }

    async fn search(&self, filter: &MemoryFilter) -> Result<Vec<MemoryRecord>> {
        Ok(filter.select(self.records.read().await.iter()))
    }

    async fn health(&self) -> bool {
        let Some(path) = &self.path else {
            return true;
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if fs::create_dir_all(parent).await.is_err() {
                return false;
            }
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .is_ok()
    }
}
