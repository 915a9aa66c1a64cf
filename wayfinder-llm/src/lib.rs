//! Provider-agnostic LLM integration for Wayfinder.
//!
//! This crate exposes a common [`traits::LlmClient`] interface and concrete
//! provider implementations for Gemini and Ollama. [`ensure_llm_ready`] turns a
//! [`wayfinder_config::LlmConfig`] into a ready client.
//!
//! # Examples
//! ```no_run
//! use wayfinder_config::LlmConfig;
//! use wayfinder_llm::ensure_llm_ready;
//!
//! # #[tokio::main]
//! # async fn main() -> wayfinder_common::Result<()> {
//! let cfg = LlmConfig::Ollama {
//!     model: "llama3.2:3b".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     temperature: None,
//!     max_tokens: None,
//! };
//! let client = ensure_llm_ready(&cfg).await?;
//! assert!(!client.model_name().is_empty());
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod ollama;
pub mod traits;

use gemini::GeminiClient;
use ollama::OllamaClient;
use std::sync::Arc;
use traits::{GenerationDefaults, LlmClient};
use wayfinder_common::WayfinderError;
use wayfinder_config::LlmConfig;

/// Default model recommendations
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";

/// Original agent settings: low temperature and short answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Build a client for the configured provider, checking it is reachable
/// where that is cheap to do.
pub async fn ensure_llm_ready(
    config: &LlmConfig,
) -> wayfinder_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        LlmConfig::Gemini {
            model,
            api_key,
            temperature,
            max_tokens,
            endpoint,
        } => {
            if api_key.trim().is_empty() || api_key.starts_with("${") {
                return Err(WayfinderError::Config("Gemini api_key is not set".to_string()));
            }
            let client = GeminiClient::new(api_key.clone(), model.clone())?
                .with_base_url(endpoint.clone())
                .with_defaults(defaults(*temperature, *max_tokens));
            Ok(Arc::new(client))
        }
        LlmConfig::Ollama {
            model,
            endpoint,
            temperature,
            max_tokens,
        } => {
            let client = OllamaClient::connect(endpoint.clone(), model.clone())
                .await?
                .with_defaults(defaults(*temperature, *max_tokens));
            Ok(Arc::new(client))
        }
        LlmConfig::None => Err(WayfinderError::Config("No LLM configured".to_string())),
    }
}

fn defaults(temperature: Option<f32>, max_tokens: Option<u32>) -> GenerationDefaults {
    GenerationDefaults {
        temperature: Some(temperature.unwrap_or(DEFAULT_TEMPERATURE)),
        max_tokens: Some(max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    }
}
