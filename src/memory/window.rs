//! Fixed-capacity FIFO of the most recent records.

use super::{tail, MemoryFilter, MemoryProvider};
use crate::models::MemoryRecord;
use crate::Result;
use std::collections::VecDeque;
use tokio::sync::Mutex;

pub struct ShortTermWindow {
    capacity: usize,
    records: Mutex<VecDeque<MemoryRecord>>,
}

impl ShortTermWindow {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, evicting the oldest record when full. Returns the evicted record.
    pub async fn push(&self, record: MemoryRecord) -> Option<MemoryRecord> {
        let mut records = self.records.lock().await;
        let evicted = if records.len() >= self.capacity {
            records.pop_front()
        } else {
            None
        };
        records.push_back(record);
        evicted
    }

    /// Replace the contents with the newest `capacity` of `records`.
    pub async fn hydrate(&self, records: Vec<MemoryRecord>) {
        let mut window = self.records.lock().await;
        window.clear();
        window.extend(tail(&records, self.capacity));
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Chronological copy of the window.
    pub async fn snapshot(&self) -> Vec<MemoryRecord> {
        self.records.lock().await.iter().cloned().collect()
    }
}

#[async_trait::async_trait]
impl MemoryProvider for ShortTermWindow {
    fn backend_name(&self) -> &'static str {
        "window"
    }

    async fn store(&self, record: &MemoryRecord) -> Result<()> {
        self.push(record.clone()).await;
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<MemoryRecord>> {
        let records = self.records.lock().await;
        let skip = records.len().saturating_sub(n);
        Ok(records.iter().skip(skip).cloned().collect())
    }

    async fn search(&self, filter: &MemoryFilter) -> Result<Vec<MemoryRecord>> {
        let records = self.records.lock().await;
        Ok(filter.select(records.iter()))
    }

    async fn health(&self) -> bool {
        true
    }
}
