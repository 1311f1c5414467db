//! Agent memory
//!
//! A bounded short-term window in front of one long-term backend. The backend
//! is either the durable Postgres store or the local JSON-lines file, chosen
//! once at startup by a health probe (see [`MemoryAdapter`]).

use crate::models::{MemoryRecord, RecordKind};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod adapter;
pub mod local;
pub mod postgres;
pub mod window;

pub use adapter::{BackendKind, MemoryAdapter, StoreReceipt};
pub use local::LocalFileMemory;
pub use postgres::PostgresMemory;
pub use window::ShortTermWindow;

/// Contract shared by the window and both long-term backends.
#[async_trait::async_trait]
pub trait MemoryProvider: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn store(&self, record: &MemoryRecord) -> Result<()>;

    /// Newest `n` records, returned oldest first.
    async fn recent(&self, n: usize) -> Result<Vec<MemoryRecord>>;

    async fn search(&self, filter: &MemoryFilter) -> Result<Vec<MemoryRecord>>;

    async fn health(&self) -> bool;
}

/// Long-term query filter. All set fields must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryFilter {
    #[serde(default)]
    pub kind: Option<RecordKind>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive substring of `content`.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl MemoryFilter {
    pub fn kind(kind: RecordKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.timestamp >= until {
                return false;
            }
        }
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            if !record.content.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Apply the filter to chronologically ordered records. The limit keeps
    /// the newest matches; the result stays chronological.
    pub(crate) fn select<'a, I>(&self, records: I) -> Vec<MemoryRecord>
    where
        I: DoubleEndedIterator<Item = &'a MemoryRecord>,
    {
        let limit = self.limit.unwrap_or(usize::MAX);
        let mut out: Vec<MemoryRecord> = records
            .rev()
            .filter(|r| self.matches(r))
            .take(limit)
            .cloned()
            .collect();
        out.reverse();
        out
    }
}

/// Newest `n` of a chronological slice, still chronological.
pub(crate) fn tail(records: &[MemoryRecord], n: usize) -> Vec<MemoryRecord> {
    let start = records.len().saturating_sub(n);
    records[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record_at(kind: RecordKind, content: &str, minutes_ago: i64) -> MemoryRecord {
        let mut r = MemoryRecord::new(kind, content);
        r.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        r
    }

    #[test]
    fn test_filter_by_kind_and_text() {
        let records = vec![
            record_at(RecordKind::User, "What is NVDA price?", 3),
            record_at(RecordKind::Assistant, "NVDA: $120.50", 2),
            record_at(RecordKind::Assistant, "AAPL: $190.00", 1),
        ];

        let filter = MemoryFilter::kind(RecordKind::Assistant);
        assert_eq!(filter.select(records.iter()).len(), 2);

        let filter = MemoryFilter::text("nvda");
        let hits = filter.select(records.iter());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].kind, RecordKind::User);
    }

    #[test]
    fn test_time_range_bounds() {
        let records = vec![
            record_at(RecordKind::User, "old", 60),
            record_at(RecordKind::User, "recent", 5),
        ];
        let filter = MemoryFilter::default()
            .between(Utc::now() - Duration::minutes(30), Utc::now());
        let hits = filter.select(records.iter());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "recent");
    }

    #[test]
    fn test_limit_keeps_newest_in_order() {
        let records: Vec<_> = (0..5)
            .map(|i| record_at(RecordKind::User, &format!("m{}", i), 10 - i))
            .collect();
        let hits = MemoryFilter::default().with_limit(2).select(records.iter());
        let contents: Vec<_> = hits.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }

    #[test]
    fn test_tail() {
        let records: Vec<_> = (0..3)
            .map(|i| MemoryRecord::new(RecordKind::User, format!("m{}", i)))
            .collect();
        assert_eq!(tail(&records, 2)[0].content, "m1");
        assert_eq!(tail(&records, 10).len(), 3);
    }
}
