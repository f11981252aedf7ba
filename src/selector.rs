//! Candidate selection — pure ordering over registry, health and circuit state.
//!
//! Selection never issues network calls; it reads snapshots and produces an ordered
//! candidate list for the executor to walk. Ties always break on registration order
//! (all sorts are stable).

use crate::circuit::{CircuitBreaker, CircuitState};
use crate::health::HealthMonitor;
use crate::registry::{ProviderRegistry, ProviderSpec};
use crate::types::{Capability, Message};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Policy used to order eligible providers for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Static registration order.
    #[default]
    Priority,
    /// Ascending cost per token.
    Cost,
    /// Ascending observed average latency; unobserved providers sort last.
    Latency,
    /// Providers supporting all requested capabilities, in registration order.
    CapabilityMatch,
}

/// One conversational turn: messages, required capabilities and an optional
/// strategy override. Created per inbound request, discarded after the response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub messages: Vec<Message>,
    pub required_capabilities: Vec<Capability>,
    pub strategy: Option<SelectionStrategy>,
    /// Correlation id threaded through logs and the response.
    pub request_id: String,
}

impl RequestContext {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            required_capabilities: vec![Capability::Chat],
            strategy: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.required_capabilities = capabilities;
        self
    }

    pub fn require(mut self, capability: Capability) -> Self {
        if !self.required_capabilities.contains(&capability) {
            self.required_capabilities.push(capability);
        }
        self
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Orders eligible providers for a request.
pub struct Selector {
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthMonitor>,
    circuit: Arc<CircuitBreaker>,
    default_strategy: SelectionStrategy,
}

impl Selector {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        health: Arc<HealthMonitor>,
        circuit: Arc<CircuitBreaker>,
        default_strategy: SelectionStrategy,
    ) -> Self {
        Self {
            registry,
            health,
            circuit,
            default_strategy,
        }
    }

    /// A provider is eligible when its circuit permits a call and it is either
    /// healthy or half-open for a recovery trial. Health alone never blocks a
    /// half-open probe.
    fn is_eligible(&self, provider: &str) -> bool {
        self.circuit.is_eligible(provider)
            && (self.health.is_healthy(provider)
                || self.circuit.state(provider) == CircuitState::HalfOpen)
    }

    /// Ordered, duplicate-free candidate list for one request. Empty when no
    /// provider is eligible; the caller must surface that as a hard failure.
    pub fn select(&self, ctx: &RequestContext) -> Vec<Arc<ProviderSpec>> {
        let strategy = ctx.strategy.unwrap_or(self.default_strategy);

        let mut candidates: Vec<Arc<ProviderSpec>> = self
            .registry
            .list()
            .iter()
            .filter(|spec| spec.capabilities().supports_all(&ctx.required_capabilities))
            .filter(|spec| self.is_eligible(spec.name()))
            .cloned()
            .collect();

        match strategy {
            // Registration order is the list order already.
            SelectionStrategy::Priority | SelectionStrategy::CapabilityMatch => {}
            SelectionStrategy::Cost => {
                candidates.sort_by(|a, b| {
                    a.cost_per_1k_tokens()
                        .partial_cmp(&b.cost_per_1k_tokens())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            SelectionStrategy::Latency => {
                candidates.sort_by_key(|spec| {
                    self.health
                        .avg_latency(spec.name())
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or(u64::MAX)
                });
            }
        }

        candidates
    }
}
