//! TACTICAL: quotes plus a playbook scan.

use crate::agent::DomainHandler;
use crate::error::CortexError;
use crate::models::StrategyResult;
use crate::strategy::Playbook;
use crate::tools::{CapabilityRegistry, Quote};
use crate::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub struct TacticalHandler {
    capabilities: Arc<CapabilityRegistry>,
    playbook: Arc<Playbook>,
}

impl TacticalHandler {
    pub fn new(capabilities: Arc<CapabilityRegistry>, playbook: Arc<Playbook>) -> Self {
        Self {
            capabilities,
            playbook,
        }
    }

    fn list_playbook(&self) -> String {
        if self.playbook.is_empty() {
            return "The playbook is empty.".to_string();
        }
        let mut out = String::from("Playbook strategies:");
        for (name, description) in self.playbook.list() {
            if description.is_empty() {
                out.push_str(&format!("\n- {}", name));
            } else {
                out.push_str(&format!("\n- {}: {}", name, description));
            }
        }
        out
    }
}

/// First token, upper-cased, without a leading `$` or trailing punctuation.
pub fn extract_ticker(params: &str) -> Option<String> {
    params
        .split_whitespace()
        .next()
        .map(|token| {
            token
                .trim_start_matches('$')
                .trim_end_matches(|c: char| c.is_ascii_punctuation())
                .to_uppercase()
        })
        .filter(|t| !t.is_empty())
}

fn format_scan(results: &[StrategyResult]) -> String {
    let mut out = String::from("Playbook scan:");
    for result in results {
        out.push_str(&format!(
            "\n- {}: {:.0} ({})",
            result.strategy, result.score, result.signal
        ));
        let skipped: Vec<&str> = result
            .skipped_factors()
            .map(|f| f.criterion.as_str())
            .collect();
        if !skipped.is_empty() {
            out.push_str(&format!(" [no data: {}]", skipped.join(", ")));
        }
    }
    out
}

#[async_trait::async_trait]
impl DomainHandler for TacticalHandler {
    async fn handle(&self, task_parameters: &str) -> Result<String> {
        let upper = task_parameters.to_uppercase();
        if upper.contains("STRATEGY") || upper.contains("PLAYBOOK") {
            return Ok(self.list_playbook());
        }

        let ticker = extract_ticker(task_parameters)
            .ok_or_else(|| CortexError::HandlerError("No ticker provided".to_string()))?;

        let raw = self
            .capabilities
            .invoke("finance", json!({ "symbol": ticker }))
            .await?;
        let quote: Quote = serde_json::from_value(raw)?;

        let results = self.playbook.run_all(&quote.snapshot());
        info!(symbol = %quote.symbol, strategies = results.len(), "Tactical scan complete");

        if results.is_empty() {
            Ok(quote.headline())
        } else {
            Ok(format!("{}\n\n{}", quote.headline(), format_scan(&results)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ScoringTable;
    use crate::tools::Capability;
    use serde_json::Value;

    struct Quotes;

    #[async_trait::async_trait]
    impl Capability for Quotes {
        fn description(&self) -> &str {
            "quotes"
        }

        async fn invoke(&self, params: Value) -> anyhow::Result<Value> {
            Ok(json!({
                "symbol": params["symbol"],
                "price": 42.0,
                "change_pct": -0.5,
                "fields": { "rvol": 3.5, "gap_pct": 2.0 }
            }))
        }
    }

    fn handler() -> TacticalHandler {
        let mut registry = CapabilityRegistry::new();
        registry.register("finance", Arc::new(Quotes)).unwrap();
        let playbook = Playbook::from_tables(&[ScoringTable::second_day_play()]).unwrap();
        TacticalHandler::new(Arc::new(registry), Arc::new(playbook))
    }

    #[test]
    fn test_extract_ticker() {
        assert_eq!(extract_ticker("nvda?").as_deref(), Some("NVDA"));
        assert_eq!(extract_ticker(" $aapl, please").as_deref(), Some("AAPL"));
        assert_eq!(extract_ticker("BRK.B").as_deref(), Some("BRK.B"));
        assert_eq!(extract_ticker("   "), None);
        assert_eq!(extract_ticker("?!"), None);
    }

    #[tokio::test]
    async fn test_quote_with_scan() {
        let out = handler().handle("nvda").await.unwrap();
        assert!(out.starts_with("NVDA: $42.00 (-0.50%)"));
        // 50 base + 15 rvol + 10 gap, volume_spike missing
        assert!(out.contains("second_day_play: 75 (Moderate)"));
        assert!(out.contains("[no data: volume_spike]"));
    }

    #[tokio::test]
    async fn test_strategy_request_lists_playbook() {
        let out = handler().handle("STRATEGY").await.unwrap();
        assert!(out.contains("second_day_play"));
    }

    #[tokio::test]
    async fn test_missing_ticker() {
        let err = handler().handle("").await.unwrap_err();
        assert!(matches!(err, CortexError::HandlerError(_)));
    }
}
