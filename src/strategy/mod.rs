//! Strategy engine and playbook
//!
//! Strategies are pure scoring functions over a [`MarketSnapshot`]. The
//! [`Playbook`] owns the name → strategy map; it is filled once at startup and
//! only read afterwards.

use crate::error::CortexError;
use crate::models::{MarketSnapshot, StrategyResult};
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub mod scoring;
pub use scoring::{Comparison, Criterion, ScoringStrategy, ScoringTable, SignalCutoffs, Tier};

/// Contract for a scoring strategy. `analyze` must be deterministic.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> StrategyResult;
}

/// Registry of named strategies
#[derive(Default)]
pub struct Playbook {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl Playbook {
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Build a playbook with one [`ScoringStrategy`] per table.
    pub fn from_tables(tables: &[ScoringTable]) -> Result<Self> {
        let mut playbook = Self::new();
        for table in tables {
            let strategy = ScoringStrategy::new(table.clone())?;
            playbook.register(table.name.clone(), Arc::new(strategy))?;
        }
        info!(strategies = playbook.len(), "Playbook loaded");
        Ok(playbook)
    }

    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn Strategy>) -> Result<()> {
        let name = name.into();
        if self.strategies.contains_key(&name) {
            return Err(CortexError::RegistrationConflict {
                kind: "strategy",
                name,
            });
        }
        debug!(strategy = %name, "Strategy registered");
        self.strategies.insert(name, strategy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(name).cloned()
    }

    pub fn run(&self, name: &str, snapshot: &MarketSnapshot) -> Result<StrategyResult> {
        let strategy = self
            .strategies
            .get(name)
            .ok_or_else(|| CortexError::StrategyNotFound(name.to_string()))?;
        Ok(strategy.analyze(snapshot))
    }

    /// Run every strategy, in name order.
    pub fn run_all(&self, snapshot: &MarketSnapshot) -> Vec<StrategyResult> {
        self.strategies
            .values()
            .map(|s| s.analyze(snapshot))
            .collect()
    }

    /// (name, description) pairs in name order.
    pub fn list(&self) -> Vec<(String, String)> {
        self.strategies
            .iter()
            .map(|(name, s)| (name.clone(), s.description().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
