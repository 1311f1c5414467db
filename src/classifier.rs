//! Domain classifier
//!
//! Single-shot structured-completion call that maps a free-text task onto one
//! of the active domains. The classifier never fails: a transport error,
//! unparseable output or an empty domain name degrades to the fallback
//! decision so routing always has something to resolve.

use crate::config::AgentConfig;
use crate::models::{Decision, DomainId, Task};
use crate::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One entry of the catalog offered to the completion boundary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogEntry {
    pub name: DomainId,
    pub description: String,
}

/// Everything the completion boundary needs for one classification.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub catalog: Vec<CatalogEntry>,
    pub schema: Value,
}

/// Structured-completion boundary: returns a JSON value that should match `schema`.
#[async_trait::async_trait]
pub trait StructuredCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value>;
}

/// JSON schema of a [`Decision`].
pub fn decision_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "domain_name": { "type": "string" },
            "reasoning": { "type": "string" },
            "task_parameters": { "type": "string" }
        },
        "required": ["domain_name", "reasoning", "task_parameters"]
    })
}

const ROUTING_GUIDANCE: &str = "\
Routing rules:
- Stock prices, tickers or market questions go to TACTICAL. task_parameters is the bare ticker (e.g. \"NVDA\").
- Put \"STRATEGY\" in task_parameters for TACTICAL only when the user asks about strategies or the playbook.
- News, research, current events and briefings go to INTEL. task_parameters is the topic.
- Logging, journaling, saving or searching notes go to OPS. task_parameters is \"action: content\" where action is one of log, save, search.
- Greetings, chit-chat and questions about the assistant go to FOUNDATION.";

pub struct Classifier {
    completion: Arc<dyn StructuredCompletion>,
    catalog: Vec<CatalogEntry>,
    fallback: DomainId,
}

impl Classifier {
    pub fn new(
        completion: Arc<dyn StructuredCompletion>,
        catalog: Vec<CatalogEntry>,
        fallback: DomainId,
    ) -> Self {
        Self {
            completion,
            catalog,
            fallback,
        }
    }

    /// Build from configuration; inactive domains are left out of the catalog.
    pub fn from_config(completion: Arc<dyn StructuredCompletion>, config: &AgentConfig) -> Self {
        let catalog = config
            .active_domains()
            .map(|d| CatalogEntry {
                name: d.name,
                description: d.description.clone(),
            })
            .collect();
        Self::new(completion, catalog, config.fallback_domain)
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    pub fn fallback(&self) -> DomainId {
        self.fallback
    }

    pub async fn classify(&self, task: &Task) -> Decision {
        let request = CompletionRequest {
            prompt: self.build_prompt(&task.text),
            catalog: self.catalog.clone(),
            schema: decision_schema(),
        };

        let raw = match self.completion.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "Classification call failed, using fallback");
                return Decision::fallback(self.fallback, format!("Classification failed: {}", e));
            }
        };

        match parse_decision(raw) {
            Some(decision) => {
                info!(
                    task_id = %task.task_id,
                    domain = %decision.domain_name,
                    "Task classified"
                );
                decision
            }
            None => {
                warn!(task_id = %task.task_id, "Malformed classifier output, using fallback");
                Decision::fallback(self.fallback, "Malformed classifier output")
            }
        }
    }

    fn build_prompt(&self, text: &str) -> String {
        let domains = self
            .catalog
            .iter()
            .map(|entry| format!("- {}: {}", entry.name, entry.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are the routing cortex of a personal operations agent.\n\
             Pick exactly one domain for the request.\n\n\
             Available domains:\n{}\n\n{}\n\nRequest: {}",
            domains, ROUTING_GUIDANCE, text
        )
    }
}

/// Accept either a JSON object or a string holding one.
fn parse_decision(raw: Value) -> Option<Decision> {
    let raw = match raw {
        Value::String(s) => serde_json::from_str(&s).ok()?,
        other => other,
    };

    let mut decision: Decision = serde_json::from_value(raw)
        .map_err(|e| debug!("Decision did not match schema: {}", e))
        .ok()?;

    decision.domain_name = decision.domain_name.trim().to_string();
    decision.task_parameters = decision.task_parameters.trim().to_string();

    if decision.domain_name.is_empty() {
        return None;
    }
    Some(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::error::CortexError;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<Value>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn ok(value: Value) -> Self {
            Self {
                reply: Ok(value),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn err() -> Self {
            Self {
                reply: Err(CortexError::LlmError("connection reset".to_string())),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl StructuredCompletion for Scripted {
        async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(CortexError::LlmError(e.to_string())),
            }
        }
    }

    fn classifier(completion: Arc<Scripted>) -> Classifier {
        Classifier::from_config(completion, &AgentConfig::default())
    }

    #[tokio::test]
    async fn test_well_formed_decision() {
        let completion = Arc::new(Scripted::ok(json!({
            "domain_name": "TACTICAL",
            "reasoning": "Ticker price request",
            "task_parameters": " NVDA "
        })));
        let decision = classifier(completion.clone())
            .classify(&Task::new("What is NVDA price?"))
            .await;

        assert_eq!(decision.domain_name, "TACTICAL");
        assert_eq!(decision.task_parameters, "NVDA");

        let seen = completion.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].prompt.contains("What is NVDA price?"));
        assert_eq!(seen[0].catalog.len(), DomainId::ALL.len());
    }

    #[tokio::test]
    async fn test_call_failure_falls_back() {
        let decision = classifier(Arc::new(Scripted::err()))
            .classify(&Task::new("hello"))
            .await;

        assert_eq!(decision.domain_name, "FOUNDATION");
        assert_eq!(decision.task_parameters, "");
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        for reply in [
            json!("not json at all"),
            json!({ "reasoning": "forgot the domain" }),
            json!({ "domain_name": "   " }),
            json!([1, 2, 3]),
        ] {
            let decision = classifier(Arc::new(Scripted::ok(reply)))
                .classify(&Task::new("anything"))
                .await;
            assert_eq!(decision.domain_name, "FOUNDATION");
            assert!(decision.task_parameters.is_empty());
        }
    }

    #[tokio::test]
    async fn test_string_encoded_decision() {
        let reply = json!(r#"{"domain_name":"OPS","reasoning":"note","task_parameters":"log: bought NVDA"}"#);
        let decision = classifier(Arc::new(Scripted::ok(reply)))
            .classify(&Task::new("log that I bought NVDA"))
            .await;
        assert_eq!(decision.domain_name, "OPS");
        assert_eq!(decision.task_parameters, "log: bought NVDA");
    }

    #[tokio::test]
    async fn test_inactive_domains_left_out_of_catalog() {
        let mut config = AgentConfig::default();
        for d in config.domains.iter_mut() {
            if d.name == DomainId::Growth {
                d.active = false;
            }
        }
        let completion = Arc::new(Scripted::ok(json!({ "domain_name": "INTEL" })));
        let classifier = Classifier::from_config(completion.clone(), &config);
        classifier.classify(&Task::new("news on AI")).await;

        assert!(classifier.catalog().iter().all(|e| e.name != DomainId::Growth));
        let seen = completion.seen.lock().unwrap();
        assert!(!seen[0].prompt.contains("GROWTH"));
    }
}
