//! OPS: daily log, notes and vault search through the `notes` capability.
//!
//! Parameters are `action: content` (as the classifier is told to produce) or
//! free text whose first word names the action.

use crate::agent::DomainHandler;
use crate::tools::CapabilityRegistry;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpsAction {
    Log,
    Save,
    Search,
    Other,
}

impl OpsAction {
    fn from_word(word: &str) -> Option<Self> {
        match word.trim().to_lowercase().as_str() {
            "log" | "journal" => Some(OpsAction::Log),
            "save" | "note" | "write" => Some(OpsAction::Save),
            "search" | "find" => Some(OpsAction::Search),
            _ => None,
        }
    }

    /// Split parameters into an action and its content.
    pub fn parse(params: &str) -> (Self, String) {
        let params = params.trim();

        if let Some((head, rest)) = params.split_once(':') {
            if let Some(action) = Self::from_word(head) {
                return (action, rest.trim().to_string());
            }
        }

        let mut words = params.splitn(2, char::is_whitespace);
        if let Some(action) = words.next().and_then(Self::from_word) {
            return (action, words.next().unwrap_or("").trim().to_string());
        }

        (OpsAction::Other, params.to_string())
    }
}

pub struct OpsHandler {
    capabilities: Arc<CapabilityRegistry>,
}

impl OpsHandler {
    pub fn new(capabilities: Arc<CapabilityRegistry>) -> Self {
        Self { capabilities }
    }

    async fn notes(&self, params: Value) -> Result<Value> {
        self.capabilities.invoke("notes", params).await
    }
}

fn path_of(value: &Value) -> &str {
    value.get("path").and_then(Value::as_str).unwrap_or("?")
}

#[async_trait::async_trait]
impl DomainHandler for OpsHandler {
    async fn handle(&self, task_parameters: &str) -> Result<String> {
        let (action, content) = OpsAction::parse(task_parameters);

        match action {
            OpsAction::Log => {
                let out = self
                    .notes(json!({ "action": "append_daily", "content": content }))
                    .await?;
                Ok(format!("Logged to {}", path_of(&out)))
            }
            OpsAction::Save => {
                let out = self
                    .notes(json!({ "action": "write", "content": content }))
                    .await?;
                Ok(format!("Saved note to {}", path_of(&out)))
            }
            OpsAction::Search => {
                let out = self
                    .notes(json!({ "action": "search", "query": content }))
                    .await?;
                let matches: Vec<&str> = out
                    .get("matches")
                    .and_then(Value::as_array)
                    .map(|m| m.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();

                if matches.is_empty() {
                    Ok(format!("No notes matched '{}'", content))
                } else {
                    Ok(format!(
                        "Found {} note(s) for '{}':\n- {}",
                        matches.len(),
                        content,
                        matches.join("\n- ")
                    ))
                }
            }
            OpsAction::Other => Ok(format!(
                "Ops received: {}. Supported actions: log, save, search.",
                content
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::NoteVaultCapability;

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            OpsAction::parse("log: bought NVDA at 120"),
            (OpsAction::Log, "bought NVDA at 120".to_string())
        );
        assert_eq!(
            OpsAction::parse("Journal felt good today"),
            (OpsAction::Log, "felt good today".to_string())
        );
        assert_eq!(
            OpsAction::parse("find earnings"),
            (OpsAction::Search, "earnings".to_string())
        );
        assert_eq!(
            OpsAction::parse("reminder: 10:30 standup"),
            (OpsAction::Other, "reminder: 10:30 standup".to_string())
        );
    }

    #[tokio::test]
    async fn test_save_then_search_vault() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = CapabilityRegistry::new();
        registry
            .register(
                "notes",
                Arc::new(NoteVaultCapability::new(dir.path().to_path_buf())),
            )
            .unwrap();
        let handler = OpsHandler::new(Arc::new(registry));

        let saved = handler
            .handle("save: Fed minutes point to a June cut")
            .await
            .unwrap();
        assert!(saved.starts_with("Saved note to Inbox/"));

        let found = handler.handle("search: june cut").await.unwrap();
        assert!(found.starts_with("Found 1 note(s)"));

        let logged = handler.handle("log: closed TSLA").await.unwrap();
        assert!(logged.starts_with("Logged to Daily/"));

        let none = handler.handle("search: bitcoin").await.unwrap();
        assert_eq!(none, "No notes matched 'bitcoin'");
    }

    #[tokio::test]
    async fn test_unsupported_action_acknowledged() {
        let handler = OpsHandler::new(Arc::new(CapabilityRegistry::new()));
        let out = handler.handle("schedule dentist").await.unwrap();
        assert!(out.contains("Supported actions"));
    }
}
