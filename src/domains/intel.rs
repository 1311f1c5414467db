//! INTEL: research and briefings through the `search` capability.

use super::answer_text;
use crate::agent::DomainHandler;
use crate::error::CortexError;
use crate::tools::CapabilityRegistry;
use crate::Result;
use serde_json::json;
use std::sync::Arc;

pub struct IntelHandler {
    capabilities: Arc<CapabilityRegistry>,
}

impl IntelHandler {
    pub fn new(capabilities: Arc<CapabilityRegistry>) -> Self {
        Self { capabilities }
    }
}

fn is_briefing(topic: &str) -> bool {
    let lower = topic.to_lowercase();
    lower.contains("briefing") || lower.contains("brief me")
}

#[async_trait::async_trait]
impl DomainHandler for IntelHandler {
    async fn handle(&self, task_parameters: &str) -> Result<String> {
        let topic = task_parameters.trim();
        if topic.is_empty() {
            return Err(CortexError::HandlerError(
                "No research topic provided".to_string(),
            ));
        }

        if is_briefing(topic) {
            let query = format!(
                "Compose a short briefing with headlines, market context and what to watch: {}",
                topic
            );
            let raw = self
                .capabilities
                .invoke("search", json!({ "query": query }))
                .await?;
            return Ok(format!("Briefing\n\n{}", answer_text(&raw)));
        }

        let raw = self
            .capabilities
            .invoke("search", json!({ "query": topic }))
            .await?;
        Ok(answer_text(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Capability;
    use serde_json::Value;

    struct EchoSearch;

    #[async_trait::async_trait]
    impl Capability for EchoSearch {
        fn description(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, params: Value) -> anyhow::Result<Value> {
            Ok(json!({ "answer": format!("results for {}", params["query"].as_str().unwrap_or("")) }))
        }
    }

    fn handler() -> IntelHandler {
        let mut registry = CapabilityRegistry::new();
        registry.register("search", Arc::new(EchoSearch)).unwrap();
        IntelHandler::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_plain_research() {
        let out = handler().handle("AI chip export rules").await.unwrap();
        assert_eq!(out, "results for AI chip export rules");
    }

    #[tokio::test]
    async fn test_briefing() {
        let out = handler().handle("morning briefing on semis").await.unwrap();
        assert!(out.starts_with("Briefing"));
        assert!(out.contains("semis"));
    }

    #[tokio::test]
    async fn test_empty_topic() {
        assert!(handler().handle("  ").await.is_err());
    }
}
