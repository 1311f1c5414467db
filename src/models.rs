//! Core data models for the agent cortex

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CortexError;

//
// ================= Domains =================
//

/// Closed set of operational domains a task can be routed to.
///
/// Deserialization goes through [`FromStr`], so `" ops "` reads as [`DomainId::Ops`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum DomainId {
    Tactical,
    Intel,
    Ops,
    Growth,
    Engineering,
    Foundation,
}

impl DomainId {
    pub const ALL: [DomainId; 6] = [
        DomainId::Tactical,
        DomainId::Intel,
        DomainId::Ops,
        DomainId::Growth,
        DomainId::Engineering,
        DomainId::Foundation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainId::Tactical => "TACTICAL",
            DomainId::Intel => "INTEL",
            DomainId::Ops => "OPS",
            DomainId::Growth => "GROWTH",
            DomainId::Engineering => "ENGINEERING",
            DomainId::Foundation => "FOUNDATION",
        }
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DomainId {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        DomainId::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == upper)
            .ok_or_else(|| CortexError::DispatchNotFound(s.trim().to_string()))
    }
}

impl TryFrom<String> for DomainId {
    type Error = CortexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//
// ================= Task & Decision =================
//

/// A free-text request entering the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub text: String,
    pub source: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            text: text.into(),
            source: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Structured classifier output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub domain_name: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub task_parameters: String,
}

impl Decision {
    pub fn fallback(domain: DomainId, reasoning: impl Into<String>) -> Self {
        Self {
            domain_name: domain.as_str().to_string(),
            reasoning: reasoning.into(),
            task_parameters: String::new(),
        }
    }
}

//
// ================= Response =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Result of dispatching one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub task_id: Uuid,
    pub domain: DomainId,
    pub reasoning: String,
    pub status: ResponseStatus,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The decision named a domain that could not be resolved.
    pub fell_back: bool,
    /// At least one memory write for this task did not reach long-term storage.
    pub memory_degraded: bool,
    pub execution_time_ms: u64,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

//
// ================= Memory =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    User,
    Assistant,
    System,
    Tool,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::User => "user",
            RecordKind::Assistant => "assistant",
            RecordKind::System => "system",
            RecordKind::Tool => "tool",
        }
    }
}

impl FromStr for RecordKind {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(RecordKind::User),
            "assistant" => Ok(RecordKind::Assistant),
            "system" => Ok(RecordKind::System),
            "tool" => Ok(RecordKind::Tool),
            other => Err(CortexError::DatabaseError(format!(
                "Unknown record kind: {}",
                other
            ))),
        }
    }
}

/// A single interaction stored in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl MemoryRecord {
    pub fn new(kind: RecordKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            source: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

//
// ================= Strategy =================
//

/// Read-only market data handed to strategies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied().filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Applied,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Factor {
    pub criterion: String,
    pub points: f64,
    pub status: FactorStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Strong,
    Moderate,
    Weak,
    None,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Strong => "Strong",
            Signal::Moderate => "Moderate",
            Signal::Weak => "Weak",
            Signal::None => "None",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyResult {
    pub strategy: String,
    pub score: f64,
    pub signal: Signal,
    pub factors: Vec<Factor>,
}

impl StrategyResult {
    pub fn skipped_factors(&self) -> impl Iterator<Item = &Factor> {
        self.factors
            .iter()
            .filter(|f| f.status == FactorStatus::Skipped)
    }
}
