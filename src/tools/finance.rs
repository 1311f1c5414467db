//! Market-data capability backed by the financial API service.

use super::{text_param, Capability};
use crate::error::CortexError;
use crate::models::MarketSnapshot;
use anyhow::{anyhow, bail, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Quote returned by the `finance` capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub change_pct: Option<f64>,
    /// Derived indicators (rvol, gap_pct, rsi, ...) handed to the playbook.
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
}

impl Quote {
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            symbol: self.symbol.clone(),
            fields: self.fields.clone(),
        }
    }

    pub fn headline(&self) -> String {
        match self.change_pct {
            Some(change) => format!("{}: ${:.2} ({:+.2}%)", self.symbol, self.price, change),
            None => format!("{}: ${:.2}", self.symbol, self.price),
        }
    }
}

#[derive(Clone)]
struct FinancialApiClient {
    client: Client,
    base_url: String,
}

impl FinancialApiClient {
    fn new(base_url: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(CortexError::from)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Financial API request failed for {}", path))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .context("Invalid JSON response from financial API")?;

        if !status.is_success() {
            bail!("Financial API returned {} for {}: {}", status, path, body);
        }

        Ok(body)
    }
}

/// `finance` capability: `{ "symbol": "NVDA" }` (or a bare ticker string) → [`Quote`] JSON.
pub struct MarketDataCapability {
    api: Option<FinancialApiClient>,
}

impl MarketDataCapability {
    pub fn new(base_url: Option<&str>) -> crate::Result<Self> {
        let api = base_url
            .filter(|url| !url.trim().is_empty())
            .map(FinancialApiClient::new)
            .transpose()?;
        Ok(Self { api })
    }
}

#[async_trait::async_trait]
impl Capability for MarketDataCapability {
    fn description(&self) -> &str {
        "Fetch the latest quote and derived indicators for a ticker"
    }

    async fn invoke(&self, params: Value) -> anyhow::Result<Value> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| anyhow!("FINANCIAL_API_BASE_URL (or TOOLS_API_BASE_URL) is not configured"))?;

        let symbol = text_param(&params, "symbol")
            .ok_or_else(|| anyhow!("Expected 'symbol' in capability params"))?
            .to_uppercase();

        let body = api
            .post_json("/api/v1/market/quote", &json!({ "symbol": symbol }))
            .await?;

        // Some deployments wrap payloads as { "data": {...} }
        let payload = body.get("data").cloned().unwrap_or(body);
        let quote: Quote =
            serde_json::from_value(payload).context("Quote payload did not match the expected shape")?;

        Ok(serde_json::to_value(quote)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_api_errors() {
        let capability = MarketDataCapability::new(None).unwrap();
        let err = capability.invoke(json!("NVDA")).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_quote_headline_and_snapshot() {
        let quote: Quote = serde_json::from_value(json!({
            "symbol": "NVDA",
            "price": 123.456,
            "change_pct": 2.1,
            "fields": { "rvol": 2.5 }
        }))
        .unwrap();

        assert_eq!(quote.headline(), "NVDA: $123.46 (+2.10%)");
        assert_eq!(quote.snapshot().get("rvol"), Some(2.5));
    }

    #[test]
    fn test_quote_minimal_payload() {
        let quote: Quote = serde_json::from_value(json!({ "symbol": "F", "price": 11.0 })).unwrap();
        assert_eq!(quote.headline(), "F: $11.00");
        assert!(quote.fields.is_empty());
    }
}
