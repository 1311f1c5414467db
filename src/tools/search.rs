//! LLM-backed query capabilities (`search`, `chat`).

use super::{text_param, Capability};
use crate::gemini::GeminiClient;
use anyhow::anyhow;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct LlmQueryCapability {
    description: &'static str,
    system_prefix: &'static str,
    client: Arc<GeminiClient>,
}

impl LlmQueryCapability {
    pub fn new(
        description: &'static str,
        system_prefix: &'static str,
        client: Arc<GeminiClient>,
    ) -> Self {
        Self {
            description,
            system_prefix,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Capability for LlmQueryCapability {
    fn description(&self) -> &str {
        self.description
    }

    async fn invoke(&self, params: Value) -> anyhow::Result<Value> {
        let query = text_param(&params, "query")
            .or_else(|| text_param(&params, "text"))
            .ok_or_else(|| anyhow!("Expected 'query' for this capability"))?;

        let (answer, confidence) = self
            .client
            .generate(&query, Some(self.system_prefix))
            .await?;

        Ok(json!({
            "answer": answer,
            "confidence": confidence,
        }))
    }
}
