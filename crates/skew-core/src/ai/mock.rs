//! Mock backend for testing
//!
//! Deterministic narratives without a running LLM server.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::RootCauseResult;

use super::NarrativeBackend;

/// Mock narrative backend
///
/// Builds a short deterministic summary from the decomposition. An unhealthy
/// instance fails both the health check and narrative generation, which lets
/// tests exercise the degraded path.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether the backend reports itself reachable
    pub healthy: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create an unreachable mock backend
    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }
}

#[async_trait]
impl NarrativeBackend for MockBackend {
    async fn explain_variance(&self, result: &RootCauseResult) -> Result<String> {
        if !self.healthy {
            return Err(Error::Narrative("mock backend is offline".into()));
        }

        let direction = if result.delta_abs >= 0.0 { "rose" } else { "fell" };
        let lead = result
            .clusters
            .first()
            .map(|c| format!(", driven mainly by {}", c.kind.label().to_lowercase()))
            .unwrap_or_default();
        Ok(format!(
            "{} {} by {:.2} against the prior period{}.",
            result.account_name,
            direction,
            result.delta_abs.abs(),
            lead
        ))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unhealthy_mock_fails_generation() {
        let backend = MockBackend::unhealthy();
        assert!(!backend.health_check().await);

        let result = RootCauseResult {
            account: 6300,
            account_name: "Fremdleistungen".to_string(),
            prior_total: 0.0,
            current_total: 0.0,
            delta_abs: 0.0,
            delta_pct: 0.0,
            clusters: Vec::new(),
            drivers: Vec::new(),
            confidence: 0.0,
            narrative: None,
        };
        assert!(backend.explain_variance(&result).await.is_err());
    }
}
