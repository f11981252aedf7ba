//! Configuration loader.
//!
//! Providers are declared in a YAML file loaded at startup. API keys are never put
//! in the file; they resolve from the environment, either an explicit `api_key_env`
//! or the `{NAME}_API_KEY` convention.
//!
//! ```yaml
//! providers:
//!   - name: openai
//!     base_url: https://api.openai.com/v1
//!     model: gpt-4o-mini
//!     capabilities: [chat, streaming, function_calling, vision]
//!     cost_per_1k_tokens: 0.015
//!   - name: anthropic
//!     base_url: https://api.anthropic.com/v1
//!     model: claude-3-5-haiku
//!     capabilities: [chat, streaming]
//!     cost_per_1k_tokens: 0.008
//! circuit:
//!   failure_threshold: 3
//!   reset_timeout_secs: 60
//! call_timeout_ms: 30000
//! default_strategy: priority
//! ```

use crate::circuit::CircuitBreakerConfig;
use crate::registry::{ProviderCapabilities, ProviderSpec};
use crate::selector::SelectionStrategy;
use crate::types::Capability;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Startup configuration for the orchestrator.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub circuit: CircuitSettings,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub health_failure_threshold: u32,
    #[serde(default)]
    pub default_strategy: SelectionStrategy,
}

/// One provider entry: endpoint plus static capability/cost metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key; defaults to `{NAME}_API_KEY`.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Empty means chat-only.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub cost_per_1k_tokens: f64,
    #[serde(default = "default_context_window")]
    pub context_window: u32,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// Liveness probe path relative to `base_url`.
    #[serde(default)]
    pub probe_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_secs: default_reset_timeout_secs(),
        }
    }
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_reset_timeout_secs() -> u64 {
    60
}

fn default_context_window() -> u32 {
    8_192
}

fn default_max_latency_ms() -> u64 {
    30_000
}

impl OrchestratorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let cfg: OrchestratorConfig = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(Error::Configuration(
                "at least one provider must be configured".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(Error::Configuration(
                "call_timeout_ms must be greater than zero".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for p in &self.providers {
            if !seen.insert(p.name.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate provider name '{}'",
                    p.name
                )));
            }
            if p.cost_per_1k_tokens < 0.0 {
                return Err(Error::Configuration(format!(
                    "provider '{}' has a negative cost_per_1k_tokens",
                    p.name
                )));
            }
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn circuit_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_failure_threshold(self.circuit.failure_threshold)
            .with_reset_timeout(Duration::from_secs(self.circuit.reset_timeout_secs))
    }
}

impl ProviderConfig {
    /// Resolve the API key from the environment.
    pub fn api_key(&self) -> Option<String> {
        let var = self
            .api_key_env
            .clone()
            .unwrap_or_else(|| format!("{}_API_KEY", self.name.to_uppercase()));
        std::env::var(var).ok()
    }

    pub fn to_spec(&self) -> ProviderSpec {
        let capabilities = if self.capabilities.is_empty() {
            ProviderCapabilities::new()
        } else {
            self.capabilities.iter().copied().collect()
        };
        ProviderSpec::new(&self.name)
            .with_capabilities(capabilities)
            .with_cost_per_1k_tokens(self.cost_per_1k_tokens)
            .with_context_window(self.context_window)
            .with_max_latency(Duration::from_millis(self.max_latency_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
providers:
  - name: openai
    base_url: https://api.openai.com/v1
    model: gpt-4o-mini
    capabilities: [chat, streaming, function_calling, vision]
    cost_per_1k_tokens: 0.015
  - name: anthropic
    base_url: https://api.anthropic.com/v1
    model: claude-3-5-haiku
    capabilities: [chat, streaming]
    cost_per_1k_tokens: 0.008
circuit:
  failure_threshold: 5
  reset_timeout_secs: 30
call_timeout_ms: 10000
default_strategy: cost
"#;

    #[test]
    fn test_parse_full_config() {
        let cfg = OrchestratorConfig::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.providers.len(), 2);
        assert_eq!(cfg.circuit.failure_threshold, 5);
        assert_eq!(cfg.call_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.default_strategy, SelectionStrategy::Cost);

        let spec = cfg.providers[0].to_spec();
        assert!(spec.capabilities().vision);
        assert_eq!(spec.cost_per_1k_tokens(), 0.015);
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = OrchestratorConfig::from_str(
            "providers:\n  - name: openai\n    base_url: http://x\n    model: m\n",
        )
        .unwrap();
        assert_eq!(cfg.circuit.failure_threshold, 3);
        assert_eq!(cfg.circuit.reset_timeout_secs, 60);
        assert_eq!(cfg.call_timeout_ms, 30_000);
        assert_eq!(cfg.default_strategy, SelectionStrategy::Priority);
        // Empty capability list means chat-only.
        assert!(cfg.providers[0].to_spec().capabilities().chat);
        assert!(!cfg.providers[0].to_spec().capabilities().vision);
    }

    #[test]
    fn test_empty_providers_rejected() {
        let err = OrchestratorConfig::from_str("providers: []\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = OrchestratorConfig::from_str(
            "providers:\n  - name: a\n    base_url: http://x\n    model: m\n  - name: a\n    base_url: http://y\n    model: m\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = OrchestratorConfig::from_str(
            "providers:\n  - name: a\n    base_url: http://x\n    model: m\ncall_timeout_ms: 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_api_key_env_convention() {
        let cfg = OrchestratorConfig::from_str(
            "providers:\n  - name: probe_vendor\n    base_url: http://x\n    model: m\n",
        )
        .unwrap();
        std::env::set_var("PROBE_VENDOR_API_KEY", "sk-test");
        assert_eq!(cfg.providers[0].api_key().as_deref(), Some("sk-test"));
        std::env::remove_var("PROBE_VENDOR_API_KEY");
    }
}
