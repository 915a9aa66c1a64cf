use crate::traits::{GenerationDefaults, LlmClient, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wayfinder_common::{Result, WayfinderError};

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    eval_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<LocalModel>,
}

#[derive(Debug, Deserialize)]
struct LocalModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

/// Ollama client for local model inference.
///
/// Expects a running Ollama server (see https://github.com/ollama/ollama).
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    defaults: GenerationDefaults,
}

impl OllamaClient {
    /// Create a client without touching the network.
    pub fn new(base_url: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WayfinderError::Provider(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            defaults: GenerationDefaults::default(),
        })
    }

    /// Create a client, check the server answers and pull the model if it is
    /// not present locally.
    pub async fn connect(base_url: String, model: String) -> Result<Self> {
        let client = Self::new(base_url, model)?;
        let local = client.local_models().await?;
        if !local.iter().any(|m| m.name == client.model) {
            tracing::info!(target: "llm.ollama", model = %client.model, "model not found locally, pulling");
            client.pull().await?;
        }
        Ok(client)
    }

    pub fn with_defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn local_models(&self) -> Result<Vec<LocalModel>> {
        let resp = self
            .client
            .get(self.url("tags"))
            .send()
            .await
            .map_err(|_| WayfinderError::Provider(OLLAMA_CONNECTION_ERROR.to_string()))?;

        if !resp.status().is_success() {
            return Err(WayfinderError::Provider(OLLAMA_CONNECTION_ERROR.to_string()));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| WayfinderError::Malformed(format!("Failed to parse models response: {e}")))?;
        Ok(tags.models)
    }

    async fn pull(&self) -> Result<()> {
        let resp = self
            .client
            .post(self.url("pull"))
            .json(&PullRequest {
                model: &self.model,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| WayfinderError::Provider(format!("Failed to pull model: {e}")))?;

        if !resp.status().is_success() {
            return Err(WayfinderError::Provider(format!(
                "Failed to pull model: HTTP {}",
                resp.status()
            )));
        }
        tracing::info!(target: "llm.ollama", model = %self.model, "pulled model");
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let (num_predict, temperature) = self.defaults.merge(max_tokens, temperature);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict,
            },
        };

        let resp = self
            .client
            .post(self.url("generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| WayfinderError::Provider(format!("Generate request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(WayfinderError::Provider(format!(
                "Generate failed: HTTP {}",
                resp.status()
            )));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| WayfinderError::Malformed(format!("Failed to parse response: {e}")))?;

        Ok(LlmResponse {
            text: body.response,
            model: Some(self.model.clone()),
            tokens_used: body.eval_count,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.local_models().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
