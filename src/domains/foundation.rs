//! FOUNDATION (default handler) and placeholders for unstaffed domains.

use super::answer_text;
use crate::agent::DomainHandler;
use crate::tools::CapabilityRegistry;
use crate::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

const CANNED_REPLY: &str =
    "I'm here. Ask me about a ticker, a research topic, or something to log or save.";

pub struct FoundationHandler {
    capabilities: Arc<CapabilityRegistry>,
}

impl FoundationHandler {
    pub fn new(capabilities: Arc<CapabilityRegistry>) -> Self {
        Self { capabilities }
    }
}

#[async_trait::async_trait]
impl DomainHandler for FoundationHandler {
    async fn handle(&self, task_parameters: &str) -> Result<String> {
        let text = task_parameters.trim();
        if text.is_empty() || !self.capabilities.contains("chat") {
            return Ok(CANNED_REPLY.to_string());
        }

        match self.capabilities.invoke("chat", json!({ "query": text })).await {
            Ok(raw) => Ok(answer_text(&raw)),
            Err(e) => {
                // the default handler always answers
                warn!(error = %e, "Chat capability failed, using canned reply");
                Ok(CANNED_REPLY.to_string())
            }
        }
    }
}

/// Domain defined in the catalog without a real implementation yet.
pub struct PlaceholderHandler {
    label: &'static str,
}

impl PlaceholderHandler {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

#[async_trait::async_trait]
impl DomainHandler for PlaceholderHandler {
    async fn handle(&self, _task_parameters: &str) -> Result<String> {
        Ok(format!("{} is defined but not yet staffed.", self.label))
    }
}
