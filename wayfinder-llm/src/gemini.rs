use crate::traits::{GenerationDefaults, LlmClient, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wayfinder_common::{Result, WayfinderError};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

impl GeminiContent {
    fn single(text: &str) -> Self {
        Self {
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    total_token_count: Option<u32>,
}

impl GeminiResponse {
    /// Joined text of the first candidate.
    fn into_text(self) -> Result<(String, Option<u32>)> {
        let tokens = self.usage_metadata.and_then(|u| u.total_token_count);
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| WayfinderError::Malformed("Gemini returned no candidates".into()))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(WayfinderError::Provider(
                "Gemini blocked the content on safety grounds".into(),
            ));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(WayfinderError::Malformed("Gemini candidate carried no text".into()));
        }
        Ok((text, tokens))
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> WayfinderError {
    let message = match status.as_u16() {
        401 => "Invalid API key".to_string(),
        403 => "API access forbidden".to_string(),
        429 => "Rate limit exceeded".to_string(),
        _ => format!("Gemini API error ({status}): {body}"),
    };
    WayfinderError::Provider(message)
}

/// Google Gemini API client.
///
/// Requires a valid API key and internet access.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    defaults: GenerationDefaults,
}

impl GeminiClient {
    /// Create a new client using the provided API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| WayfinderError::Provider(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
            defaults: GenerationDefaults::default(),
        })
    }

    /// Point the client at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let (max_tokens, temperature) = self.defaults.merge(max_tokens, temperature);

        let generation_config = (max_tokens.is_some() || temperature.is_some()).then_some(
            GeminiGenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent::single(prompt)],
            generation_config,
            system_instruction: system_prompt.map(GeminiContent::single),
        };

        tracing::debug!(target: "llm.gemini", %url, "sending generateContent request");

        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| WayfinderError::Provider(format!("Gemini request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| WayfinderError::Malformed(format!("Unreadable Gemini response: {e}")))?;
        let (text, tokens_used) = parsed.into_text()?;

        Ok(LlmResponse {
            text,
            model: Some(self.model.clone()),
            tokens_used,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
