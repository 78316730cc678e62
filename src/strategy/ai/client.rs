use crate::config::settings::AiConfig;
use crate::config::types::{JudgeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ceiling on a reasoning-service response body. Replies are capped at a
/// few thousand tokens, so anything larger is a misbehaving endpoint.
pub const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// External reasoning service
pub trait ReasoningClient: Send + Sync {
    /// Whether the client is configured well enough to attempt a call
    fn is_available(&self) -> bool;

    /// Send a prompt, return the model's text
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Sampling settings sent with every request; low temperature keeps the
/// verdict deterministic.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_k: 1,
            top_p: 1.0,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` REST client
pub struct GeminiClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            generation: GenerationConfig::default(),
        }
    }

    /// `None` when AI judging is disabled or no credentials are configured
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(Self::new(
            api_key,
            config.endpoint.clone(),
            config.model.clone(),
            Duration::from_millis(config.request_timeout_ms),
        ))
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ReasoningClient for GeminiClient {
    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::to_vec(&GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: &self.generation,
        })
        .map_err(|e| JudgeError::StrategyUnavailable(format!("encode request: {}", e)))?;

        let url = self.url();
        let resp = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", self.api_key.as_str())
            .send(&body[..])
            .map_err(|e| JudgeError::StrategyUnavailable(format!("POST {}: {}", url, e)))?;

        let mut body = resp.into_body();
        let raw = body
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()
            .map_err(|e| JudgeError::StrategyUnavailable(format!("read response: {}", e)))?;

        let parsed: GenerateResponse = serde_json::from_slice(&raw)
            .map_err(|e| JudgeError::StrategyUnavailable(format!("decode response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(JudgeError::StrategyUnavailable(
                "reasoning service returned no text".to_string(),
            ));
        }
        Ok(text)
    }
}
