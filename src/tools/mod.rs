//! Capability trait and registry
//!
//! Capabilities are the external-facing functions handlers call (market data,
//! search, note vault). The registry is filled at startup and read-only after;
//! every invocation is isolated so a failing or panicking capability surfaces
//! as a [`CapabilityError`] instead of unwinding into the caller.

use crate::config::AgentConfig;
use crate::error::{CapabilityError, CortexError};
use crate::gemini::GeminiClient;
use crate::Result;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod finance;
pub mod notes;
pub mod search;

pub use finance::{MarketDataCapability, Quote};
pub use notes::NoteVaultCapability;
pub use search::LlmQueryCapability;

/// Trait for a single invokable capability
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    fn description(&self) -> &str;
    async fn invoke(&self, params: Value) -> anyhow::Result<Value>;
}

/// Name-keyed capability store
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: BTreeMap::new(),
        }
    }

    /// Register a capability. The first registration for a name wins.
    pub fn register(&mut self, name: impl Into<String>, capability: Arc<dyn Capability>) -> Result<()> {
        let name = name.into();
        if self.capabilities.contains_key(&name) {
            return Err(CortexError::RegistrationConflict {
                kind: "capability",
                name,
            });
        }
        info!(capability = %name, "Capability registered");
        self.capabilities.insert(name, capability);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Capability>> {
        self.capabilities
            .get(name)
            .cloned()
            .ok_or_else(|| CortexError::CapabilityNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Invoke by name. Errors and panics inside the capability become a
    /// [`CortexError::Capability`] carrying the original cause.
    pub async fn invoke(&self, name: &str, params: Value) -> Result<Value> {
        let capability = self.get(name)?;
        debug!(capability = %name, "Invoking capability");

        match spawn_guarded(async move { capability.invoke(params).await }).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(cause)) => {
                warn!(capability = %name, error = %cause, "Capability failed");
                Err(CapabilityError::new(name, cause).into())
            }
            Err(panic) => {
                warn!(capability = %name, panic = %panic, "Capability panicked");
                Err(CapabilityError::new(name, anyhow::anyhow!("panicked: {}", panic)).into())
            }
        }
    }

    /// (name, description) pairs sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.capabilities
            .iter()
            .map(|(name, c)| (name.as_str(), c.description()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a future on its own task so a panic is reported instead of propagated.
pub(crate) async fn spawn_guarded<F, T>(fut: F) -> std::result::Result<T, String>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(value) => Ok(value),
        Err(join) if join.is_panic() => Err(panic_message(join.into_panic())),
        Err(join) => Err(join.to_string()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Read a text parameter. A bare string is accepted in place of `{ key: ... }`.
pub fn text_param(params: &Value, key: &str) -> Option<String> {
    match params {
        Value::String(s) => Some(s.clone()),
        other => other.get(key).and_then(Value::as_str).map(|s| s.to_string()),
    }
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
}

/// Create the registry used by the binaries: market data, search, chat and notes.
pub fn create_default_registry(config: &AgentConfig) -> Result<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();

    let api_key = config.llm.api_key.clone().unwrap_or_default();
    let gemini = Arc::new(GeminiClient::new(api_key, config.llm.model.clone())?);

    registry.register(
        "finance",
        Arc::new(MarketDataCapability::new(
            config.tools.financial_api_base_url.as_deref(),
        )?),
    )?;
    registry.register(
        "search",
        Arc::new(LlmQueryCapability::new(
            "Retrieve news, research and current events for a topic",
            "Provide concise, up-to-date research with the key facts first.",
            gemini.clone(),
        )),
    )?;
    registry.register(
        "chat",
        Arc::new(LlmQueryCapability::new(
            "General conversation",
            "You are a helpful chief-of-staff assistant. Answer briefly.",
            gemini,
        )),
    )?;
    registry.register(
        "notes",
        Arc::new(NoteVaultCapability::new(config.tools.vault_path.clone())),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl Capability for Echo {
        fn description(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, params: Value) -> anyhow::Result<Value> {
            Ok(json!({ "tag": self.0, "params": params }))
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Capability for Failing {
        fn description(&self) -> &str {
            "always fails"
        }

        async fn invoke(&self, _params: Value) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("upstream timed out"))
        }
    }

    struct Panicking;

    #[async_trait::async_trait]
    impl Capability for Panicking {
        fn description(&self) -> &str {
            "panics"
        }

        async fn invoke(&self, _params: Value) -> anyhow::Result<Value> {
            panic!("index out of bounds")
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first() {
        let mut registry = CapabilityRegistry::new();
        registry.register("search", Arc::new(Echo("first"))).unwrap();

        let err = registry
            .register("search", Arc::new(Echo("second")))
            .unwrap_err();
        assert!(matches!(
            err,
            CortexError::RegistrationConflict { kind: "capability", .. }
        ));

        let out = registry.invoke("search", json!("AI")).await.unwrap();
        assert_eq!(out["tag"], "first");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_capability() {
        let registry = CapabilityRegistry::new();
        let err = registry.invoke("browser", json!({})).await.unwrap_err();
        assert!(matches!(err, CortexError::CapabilityNotFound(_)));
        assert!(registry.get("browser").is_err());
    }

    #[tokio::test]
    async fn test_failure_carries_cause() {
        let mut registry = CapabilityRegistry::new();
        registry.register("finance", Arc::new(Failing)).unwrap();

        let err = registry.invoke("finance", json!("NVDA")).await.unwrap_err();
        match err {
            CortexError::Capability(e) => {
                assert_eq!(e.capability, "finance");
                assert!(e.source.to_string().contains("upstream timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_capability_error() {
        let mut registry = CapabilityRegistry::new();
        registry.register("browser", Arc::new(Panicking)).unwrap();

        let err = registry.invoke("browser", json!({})).await.unwrap_err();
        match err {
            CortexError::Capability(e) => {
                assert!(e.source.to_string().contains("index out of bounds"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_param() {
        assert_eq!(text_param(&json!(" NVDA "), "symbol").as_deref(), Some("NVDA"));
        assert_eq!(
            text_param(&json!({ "symbol": "AAPL" }), "symbol").as_deref(),
            Some("AAPL")
        );
        assert_eq!(text_param(&json!({ "symbol": "" }), "symbol"), None);
        assert_eq!(text_param(&json!({}), "symbol"), None);
    }

    #[test]
    fn test_list_sorted() {
        let mut registry = CapabilityRegistry::new();
        registry.register("notes", Arc::new(Echo("n"))).unwrap();
        registry.register("finance", Arc::new(Echo("f"))).unwrap();
        let names: Vec<&str> = registry.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["finance", "notes"]);
    }
}
