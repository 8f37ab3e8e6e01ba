//! Ollama backend implementation
//!
//! Minimal HTTP client for the Ollama generate API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::RootCauseResult;

use super::prompt::render_prompt;
use super::NarrativeBackend;

/// Ollama-backed narrative generation
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl NarrativeBackend for OllamaBackend {
    async fn explain_variance(&self, result: &RootCauseResult) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: render_prompt(result),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http(response.error_for_status().unwrap_err()));
        }

        let body: OllamaResponse = response.json().await?;
        debug!(model = %self.model, account = result.account, "received narrative from ollama");

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(Error::Narrative("empty response from model".into()));
        }
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
    }

    #[test]
    fn with_model_overrides_only_the_model() {
        let backend = OllamaBackend::new("http://localhost:11434", "llama3.2");
        let other = backend.with_model("qwen2.5");
        assert_eq!(other.model(), "qwen2.5");
        assert_eq!(other.host(), backend.host());
    }
}
