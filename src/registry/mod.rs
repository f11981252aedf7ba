//! Provider registry — static provider definitions and lookup.
//!
//! Providers are registered once at process start and are immutable afterwards;
//! there is no runtime removal. Registration order is preserved because it is the
//! tie-break for every selection strategy.

use crate::types::Capability;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Capability flags of a single provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub chat: bool,
    pub streaming: bool,
    pub function_calling: bool,
    pub vision: bool,
}

impl ProviderCapabilities {
    /// Chat-only capability set.
    pub fn new() -> Self {
        Self {
            chat: true,
            streaming: false,
            function_calling: false,
            vision: false,
        }
    }

    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn with_function_calling(mut self) -> Self {
        self.function_calling = true;
        self
    }

    pub fn with_vision(mut self) -> Self {
        self.vision = true;
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Chat => self.chat,
            Capability::Streaming => self.streaming,
            Capability::FunctionCalling => self.function_calling,
            Capability::Vision => self.vision,
        }
    }

    pub fn supports_all(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().all(|c| self.supports(*c))
    }
}

impl FromIterator<Capability> for ProviderCapabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut caps = Self::default();
        for c in iter {
            match c {
                Capability::Chat => caps.chat = true,
                Capability::Streaming => caps.streaming = true,
                Capability::FunctionCalling => caps.function_calling = true,
                Capability::Vision => caps.vision = true,
            }
        }
        caps
    }
}

/// Static definition of one AI backend: identity plus capability and cost metadata.
///
/// Immutable once registered.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    name: String,
    capabilities: ProviderCapabilities,
    cost_per_1k_tokens: f64,
    context_window: u32,
    max_latency: Duration,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: ProviderCapabilities::new(),
            cost_per_1k_tokens: 0.0,
            context_window: 8_192,
            max_latency: Duration::from_secs(30),
        }
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_cost_per_1k_tokens(mut self, cost: f64) -> Self {
        self.cost_per_1k_tokens = cost;
        self
    }

    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    pub fn with_max_latency(mut self, budget: Duration) -> Self {
        self.max_latency = budget;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    pub fn cost_per_1k_tokens(&self) -> f64 {
        self.cost_per_1k_tokens
    }

    pub fn context_window(&self) -> u32 {
        self.context_window
    }

    pub fn max_latency(&self) -> Duration {
        self.max_latency
    }
}

/// Ordered collection of registered providers.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<ProviderSpec>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider definition. Names must be unique.
    pub fn register(&mut self, spec: ProviderSpec) -> Result<()> {
        if self.providers.iter().any(|p| p.name() == spec.name()) {
            return Err(Error::Configuration(format!(
                "provider '{}' is already registered",
                spec.name()
            )));
        }
        self.providers.push(Arc::new(spec));
        Ok(())
    }

    /// All providers, in registration order.
    pub fn list(&self) -> &[Arc<ProviderSpec>] {
        &self.providers
    }

    /// Providers supporting a capability, in registration order.
    pub fn list_with_capability(&self, capability: Capability) -> Vec<Arc<ProviderSpec>> {
        self.providers
            .iter()
            .filter(|p| p.capabilities().supports(capability))
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ProviderSpec>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_preserves_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderSpec::new("openai")).unwrap();
        registry.register(ProviderSpec::new("anthropic")).unwrap();
        registry.register(ProviderSpec::new("gemini")).unwrap();

        let names: Vec<&str> = registry.list().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["openai", "anthropic", "gemini"]);
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderSpec::new("openai")).unwrap();
        let err = registry.register(ProviderSpec::new("openai")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_with_capability_filters() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(
                ProviderSpec::new("openai")
                    .with_capabilities(ProviderCapabilities::new().with_vision()),
            )
            .unwrap();
        registry.register(ProviderSpec::new("local")).unwrap();

        let vision = registry.list_with_capability(Capability::Vision);
        assert_eq!(vision.len(), 1);
        assert_eq!(vision[0].name(), "openai");

        let chat = registry.list_with_capability(Capability::Chat);
        assert_eq!(chat.len(), 2);
    }

    #[test]
    fn test_capabilities_from_iter() {
        let caps: ProviderCapabilities =
            [Capability::Chat, Capability::FunctionCalling].into_iter().collect();
        assert!(caps.chat);
        assert!(caps.function_calling);
        assert!(!caps.vision);
        assert!(caps.supports_all(&[Capability::Chat, Capability::FunctionCalling]));
        assert!(!caps.supports_all(&[Capability::Streaming]));
    }

    #[test]
    fn test_spec_builder() {
        let spec = ProviderSpec::new("openai")
            .with_cost_per_1k_tokens(0.03)
            .with_context_window(128_000)
            .with_max_latency(Duration::from_secs(20));
        assert_eq!(spec.name(), "openai");
        assert_eq!(spec.cost_per_1k_tokens(), 0.03);
        assert_eq!(spec.context_window(), 128_000);
        assert_eq!(spec.max_latency(), Duration::from_secs(20));
    }
}
