use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfinder_common::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// Generation knobs a client falls back to when a call leaves them unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationDefaults {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationDefaults {
    pub fn merge(&self, max_tokens: Option<u32>, temperature: Option<f32>) -> (Option<u32>, Option<f32>) {
        (
            max_tokens.or(self.max_tokens),
            temperature.or(self.temperature),
        )
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Check if the LLM service is available
    async fn health_check(&self) -> Result<bool> {
        match self
            .generate("Respond with just 'OK'", None, Some(5), Some(0.1))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(model = self.model_name(), "health check failed: {e}");
                Ok(false)
            }
        }
    }

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
