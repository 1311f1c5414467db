//! Agent configuration
//!
//! The cortex consumes an already-parsed [`AgentConfig`]. Defaults describe the
//! stock domain catalog and the built-in scoring table; [`AgentConfig::from_env`]
//! overlays deployment settings from the environment (`.env` supported).

use crate::error::CortexError;
use crate::models::DomainId;
use crate::strategy::scoring::ScoringTable;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_WINDOW_SIZE: usize = 10;
pub const DEFAULT_MEMORY_PATH: &str = "data/memory.jsonl";
pub const DEFAULT_VAULT_PATH: &str = "data/vault";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainConfig {
    pub name: DomainId,
    pub description: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl DomainConfig {
    pub fn new(name: DomainId, description: &str) -> Self {
        Self {
            name,
            description: description.to_string(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Capacity of the short-term window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Connection descriptor for the durable backend. `None` goes straight to the local store.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_memory_path")]
    pub local_path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            database_url: None,
            local_path: PathBuf::from(DEFAULT_MEMORY_PATH),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub financial_api_base_url: Option<String>,
    #[serde(default = "default_vault_path")]
    pub vault_path: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            financial_api_base_url: None,
            vault_path: PathBuf::from(DEFAULT_VAULT_PATH),
        }
    }
}

/// Validated in-memory configuration for the whole agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub domains: Vec<DomainConfig>,
    #[serde(default = "default_fallback")]
    pub fallback_domain: DomainId,
    #[serde(default)]
    pub strategies: Vec<ScoringTable>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            domains: vec![
                DomainConfig::new(
                    DomainId::Tactical,
                    "Trading and market data: stock prices, tickers, strategy playbooks",
                ),
                DomainConfig::new(
                    DomainId::Intel,
                    "Research and news: current events, deep dives, briefings",
                ),
                DomainConfig::new(
                    DomainId::Ops,
                    "Operations: logging, journaling, saving and searching notes",
                ),
                DomainConfig::new(DomainId::Growth, "Business growth and planning"),
                DomainConfig::new(DomainId::Engineering, "Code and systems work"),
                DomainConfig::new(
                    DomainId::Foundation,
                    "General chat, greetings, questions about the agent itself",
                ),
            ],
            fallback_domain: DomainId::Foundation,
            strategies: vec![ScoringTable::second_day_play()],
            memory: MemoryConfig::default(),
            llm: LlmConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Defaults overlaid with environment settings.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        config.memory.database_url = env::var("POSTGRES_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .ok()
            .filter(|v| !v.trim().is_empty());

        if let Ok(path) = env::var("CORTEX_MEMORY_PATH") {
            config.memory.local_path = PathBuf::from(path);
        }

        if let Ok(size) = env::var("CORTEX_WINDOW_SIZE") {
            match size.parse::<usize>() {
                Ok(n) => config.memory.window_size = n,
                Err(e) => warn!("Ignoring CORTEX_WINDOW_SIZE={}: {}", size, e),
            }
        }

        config.llm.api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());
        config.llm.model = env::var("GEMINI_MODEL").ok();

        config.tools.financial_api_base_url = env::var("FINANCIAL_API_BASE_URL")
            .or_else(|_| env::var("TOOLS_API_BASE_URL"))
            .ok();

        if let Ok(path) = env::var("CORTEX_VAULT_PATH") {
            config.tools.vault_path = PathBuf::from(path);
        }

        config
    }

    /// Reject catalogs and tables that would misroute or misscore at runtime.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for domain in &self.domains {
            if !seen.insert(domain.name) {
                return Err(CortexError::InvalidConfig(format!(
                    "domain {} listed more than once",
                    domain.name
                )));
            }
        }

        match self.domains.iter().find(|d| d.name == self.fallback_domain) {
            None => {
                return Err(CortexError::InvalidConfig(format!(
                    "fallback domain {} is not in the catalog",
                    self.fallback_domain
                )))
            }
            Some(d) if !d.active => {
                return Err(CortexError::InvalidConfig(format!(
                    "fallback domain {} is inactive",
                    self.fallback_domain
                )))
            }
            Some(_) => {}
        }

        if self.memory.window_size == 0 {
            return Err(CortexError::InvalidConfig(
                "short-term window size must be at least 1".to_string(),
            ));
        }

        for table in &self.strategies {
            table.validate()?;
        }

        Ok(())
    }

    pub fn active_domains(&self) -> impl Iterator<Item = &DomainConfig> {
        self.domains.iter().filter(|d| d.active)
    }
}

fn default_true() -> bool {
    true
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_memory_path() -> PathBuf {
    PathBuf::from(DEFAULT_MEMORY_PATH)
}

fn default_vault_path() -> PathBuf {
    PathBuf::from(DEFAULT_VAULT_PATH)
}

fn default_max_connections() -> u32 {
    5
}

fn default_fallback() -> DomainId {
    DomainId::Foundation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fallback_domain, DomainId::Foundation);
        assert_eq!(config.memory.window_size, DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn test_unknown_domain_rejected_at_load() {
        let raw = serde_json::json!({
            "domains": [
                { "name": "TACTICAL", "description": "trading" },
                { "name": "MEDICAL", "description": "billing" }
            ]
        });
        let parsed: std::result::Result<AgentConfig, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_missing_fallback_rejected() {
        let mut config = AgentConfig::default();
        config.domains.retain(|d| d.name != DomainId::Foundation);
        assert!(matches!(
            config.validate(),
            Err(CortexError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inactive_fallback_rejected() {
        let mut config = AgentConfig::default();
        for d in config.domains.iter_mut() {
            if d.name == DomainId::Foundation {
                d.active = false;
            }
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_domain_rejected() {
        let mut config = AgentConfig::default();
        config
            .domains
            .push(DomainConfig::new(DomainId::Ops, "second ops"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let raw = serde_json::json!({
            "domains": [{ "name": " foundation ", "description": "chat" }]
        });
        let config: AgentConfig = serde_json::from_value(raw).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.domains[0].name, DomainId::Foundation);
        assert!(config.strategies.is_empty());
        assert_eq!(config.memory.window_size, DEFAULT_WINDOW_SIZE);
    }
}
