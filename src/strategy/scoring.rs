//! Table-driven scoring
//!
//! A [`ScoringTable`] is pure data: an ordered list of criteria, each with
//! tiered thresholds, plus the score range and signal cutoffs. A
//! [`ScoringStrategy`] evaluates one table generically, so adding a criterion
//! is a configuration change rather than new branching code.

use crate::error::CortexError;
use crate::models::{Factor, FactorStatus, MarketSnapshot, Signal, StrategyResult};
use crate::strategy::Strategy;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// How a snapshot value is compared against a tier threshold.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    Above,
    AtLeast,
    Below,
    AtMost,
}

impl Comparison {
    fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::AtLeast => value >= threshold,
            Comparison::Below => value < threshold,
            Comparison::AtMost => value <= threshold,
        }
    }

    /// Order tiers so the hardest one to satisfy is checked first.
    fn demanding_first(self, a: &Tier, b: &Tier) -> Ordering {
        let by_threshold = a
            .threshold
            .partial_cmp(&b.threshold)
            .unwrap_or(Ordering::Equal);
        match self {
            Comparison::Above | Comparison::AtLeast => by_threshold.reverse(),
            Comparison::Below | Comparison::AtMost => by_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tier {
    pub threshold: f64,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    pub id: String,
    /// Snapshot field this criterion reads.
    pub field: String,
    #[serde(default)]
    pub comparison: Comparison,
    pub tiers: Vec<Tier>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalCutoffs {
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
}

impl Default for SignalCutoffs {
    fn default() -> Self {
        Self {
            strong: 75.0,
            moderate: 50.0,
            weak: 25.0,
        }
    }
}

impl SignalCutoffs {
    pub fn classify(&self, score: f64) -> Signal {
        if score >= self.strong {
            Signal::Strong
        } else if score >= self.moderate {
            Signal::Moderate
        } else if score >= self.weak {
            Signal::Weak
        } else {
            Signal::None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringTable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub min_score: f64,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub cutoffs: SignalCutoffs,
}

fn default_max_score() -> f64 {
    100.0
}

impl ScoringTable {
    /// Momentum continuation on the day after a high relative-volume session.
    pub fn second_day_play() -> Self {
        Self {
            name: "second_day_play".to_string(),
            description: "LONG continuation after a high-RVOL session".to_string(),
            base_score: 50.0,
            min_score: 0.0,
            max_score: 100.0,
            criteria: vec![
                Criterion {
                    id: "rvol".to_string(),
                    field: "rvol".to_string(),
                    comparison: Comparison::AtLeast,
                    tiers: vec![
                        Tier { threshold: 3.0, points: 15.0 },
                        Tier { threshold: 1.5, points: 10.0 },
                    ],
                },
                Criterion {
                    id: "gap_up".to_string(),
                    field: "gap_pct".to_string(),
                    comparison: Comparison::Above,
                    tiers: vec![Tier { threshold: 0.0, points: 10.0 }],
                },
                Criterion {
                    id: "volume_spike".to_string(),
                    field: "volume_spike".to_string(),
                    comparison: Comparison::AtLeast,
                    tiers: vec![Tier { threshold: 1.0, points: 15.0 }],
                },
            ],
            cutoffs: SignalCutoffs {
                strong: 80.0,
                moderate: 65.0,
                weak: 55.0,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CortexError::InvalidConfig(format!("{}: {}", self.name, msg)));

        if self.name.trim().is_empty() {
            return Err(CortexError::InvalidConfig(
                "scoring table without a name".to_string(),
            ));
        }
        let bounds = [
            ("base_score", self.base_score),
            ("min_score", self.min_score),
            ("max_score", self.max_score),
            ("cutoffs.strong", self.cutoffs.strong),
            ("cutoffs.moderate", self.cutoffs.moderate),
            ("cutoffs.weak", self.cutoffs.weak),
        ];
        if let Some((field, value)) = bounds.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{} must be finite, got {}", field, value));
        }
        if self.min_score > self.max_score {
            return invalid(format!(
                "min_score {} exceeds max_score {}",
                self.min_score, self.max_score
            ));
        }
        let c = &self.cutoffs;
        if !(c.strong >= c.moderate && c.moderate >= c.weak) {
            return invalid("cutoffs must satisfy strong >= moderate >= weak".to_string());
        }

        let mut ids = HashSet::new();
        for criterion in &self.criteria {
            if !ids.insert(criterion.id.as_str()) {
                return invalid(format!("criterion '{}' defined twice", criterion.id));
            }
            if criterion.tiers.is_empty() {
                return invalid(format!("criterion '{}' has no tiers", criterion.id));
            }
            if criterion
                .tiers
                .iter()
                .any(|t| !t.threshold.is_finite() || !t.points.is_finite())
            {
                return invalid(format!("criterion '{}' has a non-finite tier", criterion.id));
            }
        }

        Ok(())
    }
}

/// Generic evaluator for one [`ScoringTable`].
#[derive(Debug, Clone)]
pub struct ScoringStrategy {
    table: ScoringTable,
}

impl ScoringStrategy {
    pub fn new(mut table: ScoringTable) -> Result<Self> {
        table.validate()?;
        for criterion in table.criteria.iter_mut() {
            let comparison = criterion.comparison;
            criterion
                .tiers
                .sort_by(|a, b| comparison.demanding_first(a, b));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &ScoringTable {
        &self.table
    }

    fn evaluate(criterion: &Criterion, snapshot: &MarketSnapshot) -> Factor {
        let Some(value) = snapshot.get(&criterion.field) else {
            return Factor {
                criterion: criterion.id.clone(),
                points: 0.0,
                status: FactorStatus::Skipped,
            };
        };

        let points = criterion
            .tiers
            .iter()
            .find(|tier| criterion.comparison.holds(value, tier.threshold))
            .map(|tier| tier.points)
            .unwrap_or(0.0);

        Factor {
            criterion: criterion.id.clone(),
            points,
            status: FactorStatus::Applied,
        }
    }
}

impl Strategy for ScoringStrategy {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn description(&self) -> &str {
        &self.table.description
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> StrategyResult {
        let factors: Vec<Factor> = self
            .table
            .criteria
            .iter()
            .map(|c| Self::evaluate(c, snapshot))
            .collect();

        let raw = self.table.base_score + factors.iter().map(|f| f.points).sum::<f64>();
        let score = raw.clamp(self.table.min_score, self.table.max_score);

        StrategyResult {
            strategy: self.table.name.clone(),
            score,
            signal: self.table.cutoffs.classify(score),
            factors,
        }
    }
}
