//! Gemini API client
//!
//! Long-lived reqwest::Client for connection pooling. Serves two roles: free
//! text generation for the LLM-backed capabilities, and the structured
//! completion boundary used by the classifier.

use crate::classifier::{CompletionRequest, StructuredCompletion};
use crate::error::CortexError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()?;

        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/{}:generateContent", BASE_URL, model),
        })
    }

    /// Generate a response; returns the text and a heuristic confidence.
    pub async fn generate(
        &self,
        query: &str,
        system_prompt: Option<&str>,
    ) -> crate::Result<(String, f32)> {
        self.call(query, system_prompt, None).await
    }

    async fn call(
        &self,
        query: &str,
        system_prompt: Option<&str>,
        response_mime_type: Option<&'static str>,
    ) -> crate::Result<(String, f32)> {
        if self.api_key.is_empty() {
            return Err(CortexError::LlmError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.endpoint, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: query.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
                response_mime_type,
            },
            system_instruction: system_prompt.map(|text| SystemInstruction {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }),
        };

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                CortexError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(CortexError::LlmError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            CortexError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response
            .candidates
            .first()
            .ok_or_else(|| CortexError::LlmError("No response from Gemini API".to_string()))?;

        let answer = candidate
            .content
            .parts
            .first()
            .ok_or_else(|| CortexError::LlmError("Empty response from Gemini".to_string()))?
            .text
            .clone();

        let confidence = calculate_confidence(candidate);
        info!("Gemini response received (confidence: {})", confidence);

        Ok((answer, confidence))
    }
}

#[async_trait::async_trait]
impl StructuredCompletion for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> crate::Result<Value> {
        let prompt = format!(
            "{}\n\nRespond with ONLY a JSON object matching this schema:\n{}",
            request.prompt, request.schema
        );

        let (text, _confidence) = self
            .call(&prompt, None, Some("application/json"))
            .await?;

        parse_json_reply(&text)
    }
}

/// Strip optional markdown fences and parse the reply as JSON.
fn parse_json_reply(text: &str) -> crate::Result<Value> {
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).map_err(|e| {
        CortexError::ClassificationFailure(format!("Unparseable completion: {} | raw={}", e, text))
    })
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
    #[serde(default, alias = "finishReason")]
    finish_reason: Option<String>,
}

/// Calculate response confidence
fn calculate_confidence(candidate: &Candidate) -> f32 {
    let base_confidence: f32 = 0.85;

    let finish_confidence = match candidate.finish_reason.as_deref() {
        Some("STOP") => 1.0,
        Some("LENGTH") | Some("MAX_TOKENS") => 0.8,
        Some("SAFETY") => 0.6,
        _ => 0.7,
    };

    let response_length = candidate
        .content
        .parts
        .first()
        .map(|p| p.text.len())
        .unwrap_or(0);

    let length_confidence = if response_length < 50 {
        0.6
    } else if response_length > 2000 {
        0.8
    } else {
        1.0
    };

    (base_confidence * finish_confidence * length_confidence).clamp(0.5, 0.98)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "What is NVDA price?".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
                response_mime_type: Some("application/json"),
            },
            system_instruction: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("What is NVDA price?"));
        assert!(json.contains("application/json"));
        assert!(!json.contains("system_instruction"));
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"domain_name\": \"TACTICAL\", \"reasoning\": \"ticker\", \"task_parameters\": \"NVDA\"}\n```";
        let value = parse_json_reply(reply).unwrap();
        assert_eq!(value["domain_name"], "TACTICAL");
    }

    #[test]
    fn test_parse_garbage_reply() {
        assert!(matches!(
            parse_json_reply("I think this is TACTICAL"),
            Err(CortexError::ClassificationFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = GeminiClient::new(String::new(), None).unwrap();
        let err = client.generate("hi", None).await.unwrap_err();
        assert!(matches!(err, CortexError::LlmError(_)));
    }
}
