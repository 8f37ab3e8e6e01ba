//! Pluggable narrative backend abstraction
//!
//! The analysis engines are synchronous and deterministic; this module is the
//! one place that talks to a language model. All backends run locally (no
//! cloud APIs) - Ollama or a mock for tests.
//!
//! # Architecture
//!
//! - `NarrativeBackend` trait: the interface for narrative generation
//! - `NarrativeClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `NARRATIVE_BACKEND`: Backend to use (ollama, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;
mod prompt;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use prompt::render_prompt;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::models::RootCauseResult;

/// Trait defining the interface for narrative backends
///
/// Backends must be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    /// Turn a root-cause decomposition into a short prose explanation
    async fn explain_variance(&self, result: &RootCauseResult) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete narrative client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum NarrativeClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl NarrativeClient {
    /// Create a narrative client from environment variables
    ///
    /// Checks `NARRATIVE_BACKEND` to determine which backend to use:
    /// - `ollama` (default): Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("NARRATIVE_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(NarrativeClient::Ollama),
            "mock" => Some(NarrativeClient::Mock(MockBackend::new())),
            _ => {
                warn!(backend = %backend, "Unknown NARRATIVE_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(NarrativeClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        NarrativeClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        NarrativeClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            NarrativeClient::Ollama(b) => NarrativeClient::Ollama(b.with_model(model)),
            NarrativeClient::Mock(b) => NarrativeClient::Mock(b.with_model(model)),
        }
    }
}

#[async_trait]
impl NarrativeBackend for NarrativeClient {
    async fn explain_variance(&self, result: &RootCauseResult) -> Result<String> {
        match self {
            NarrativeClient::Ollama(b) => b.explain_variance(result).await,
            NarrativeClient::Mock(b) => b.explain_variance(result).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            NarrativeClient::Ollama(b) => b.health_check().await,
            NarrativeClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            NarrativeClient::Ollama(b) => b.model(),
            NarrativeClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            NarrativeClient::Ollama(b) => b.host(),
            NarrativeClient::Mock(b) => b.host(),
        }
    }
}

/// Attach a narrative to a root-cause result.
///
/// When the backend fails the result keeps `narrative: None` and a warning is
/// logged; the numeric decomposition never depends on this call succeeding.
pub async fn narrate_root_cause(client: &NarrativeClient, result: &mut RootCauseResult) {
    match client.explain_variance(result).await {
        Ok(text) => result.narrative = Some(text),
        Err(e) => {
            warn!(account = result.account, error = %e, "narrative generation failed, keeping numeric result");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> RootCauseResult {
        RootCauseResult {
            account: 6300,
            account_name: "Fremdleistungen".to_string(),
            prior_total: 20_000.0,
            current_total: 30_000.0,
            delta_abs: 10_000.0,
            delta_pct: 50.0,
            clusters: Vec::new(),
            drivers: Vec::new(),
            confidence: 0.8,
            narrative: None,
        }
    }

    #[test]
    fn mock_client_identity() {
        let client = NarrativeClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn mock_health_check() {
        let client = NarrativeClient::mock();
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn narrate_attaches_text() {
        let client = NarrativeClient::mock();
        let mut result = sample_result();
        narrate_root_cause(&client, &mut result).await;
        let narrative = result.narrative.as_deref().unwrap();
        assert!(narrative.contains("Fremdleistungen"));
        assert!(narrative.contains("rose"));
    }

    #[tokio::test]
    async fn narrate_keeps_numbers_when_backend_fails() {
        let client = NarrativeClient::Mock(MockBackend::unhealthy());
        let mut result = sample_result();
        narrate_root_cause(&client, &mut result).await;
        assert_eq!(result.narrative, None);
        assert_eq!(result.delta_abs, 10_000.0);
    }
}
