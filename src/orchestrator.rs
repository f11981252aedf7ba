//! Orchestrator facade — wires registry, health monitor, circuit breaker,
//! selector and executor into one handle.

use crate::adapters::HttpProviderAdapter;
use crate::circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot};
use crate::config::OrchestratorConfig;
use crate::executor::{ProviderAdapter, RequestExecutor};
use crate::health::{HealthMonitor, HealthSnapshot};
use crate::registry::{ProviderRegistry, ProviderSpec};
use crate::selector::{RequestContext, SelectionStrategy, Selector};
use crate::types::AiResponse;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Combined observability view of one provider.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub name: String,
    pub circuit: CircuitSnapshot,
    pub health: Option<HealthSnapshot>,
}

/// Entry point: owns every component and serves concurrent requests.
///
/// Cheap to share behind an `Arc`; all interior state is independently locked with
/// short critical sections, and provider calls are awaited without holding any lock.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    executor: RequestExecutor,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Build from a loaded configuration, wiring an HTTP adapter per provider.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder()
            .with_circuit_config(config.circuit_config())
            .with_call_timeout(config.call_timeout())
            .with_health_threshold(config.health_failure_threshold)
            .with_default_strategy(config.default_strategy);

        for p in &config.providers {
            let mut adapter =
                HttpProviderAdapter::new(&p.name, &p.base_url, &p.model, p.api_key())?;
            if let Some(path) = &p.probe_path {
                adapter = adapter.with_probe_path(path);
            }
            builder = builder.register(p.to_spec(), Arc::new(adapter));
        }

        builder.build()
    }

    /// Execute one conversational request.
    pub async fn execute(&self, ctx: &RequestContext) -> Result<AiResponse> {
        self.executor.execute(ctx).await
    }

    /// Actively probe one provider and reset its health record on success.
    pub async fn health_check(&self, provider: &str) -> Result<()> {
        self.executor.health_check(provider).await
    }

    /// Per-provider circuit and health view, in registration order.
    pub fn status(&self) -> Vec<ProviderStatus> {
        self.registry
            .list()
            .iter()
            .map(|spec| ProviderStatus {
                name: spec.name().to_string(),
                circuit: self.executor.circuit().snapshot(spec.name()),
                health: self.executor.health().snapshot(spec.name()),
            })
            .collect()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

/// Builder for assembling an [`Orchestrator`] in code.
pub struct OrchestratorBuilder {
    providers: Vec<(ProviderSpec, Arc<dyn ProviderAdapter>)>,
    circuit_config: CircuitBreakerConfig,
    call_timeout: Duration,
    health_threshold: u32,
    default_strategy: SelectionStrategy,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            circuit_config: CircuitBreakerConfig::default(),
            call_timeout: Duration::from_secs(30),
            health_threshold: 3,
            default_strategy: SelectionStrategy::Priority,
        }
    }

    /// Register a provider definition together with its adapter.
    pub fn register(mut self, spec: ProviderSpec, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push((spec, adapter));
        self
    }

    pub fn with_circuit_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_config = config;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_health_threshold(mut self, threshold: u32) -> Self {
        self.health_threshold = threshold;
        self
    }

    pub fn with_default_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        if self.providers.is_empty() {
            return Err(Error::Configuration(
                "cannot build an orchestrator with no providers".to_string(),
            ));
        }

        let mut registry = ProviderRegistry::new();
        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        for (spec, adapter) in self.providers {
            adapters.insert(spec.name().to_string(), adapter);
            registry.register(spec)?;
        }

        let registry = Arc::new(registry);
        let health = Arc::new(HealthMonitor::new().with_failure_threshold(self.health_threshold));
        let circuit = Arc::new(CircuitBreaker::new(self.circuit_config));
        let selector = Selector::new(
            Arc::clone(&registry),
            Arc::clone(&health),
            Arc::clone(&circuit),
            self.default_strategy,
        );
        let executor =
            RequestExecutor::new(selector, health, circuit, adapters, self.call_timeout);

        Ok(Orchestrator { registry, executor })
    }
}
