//! Request executor — bounded failover over the selector's candidate list.
//!
//! Each candidate is attempted at most once per request, each attempt is wrapped in
//! the mandatory per-call timeout, and every outcome is recorded in the health
//! monitor and circuit breaker. Exhausting the list is a terminal failure; the
//! executor never invents a response.

use crate::circuit::{CircuitBreaker, CircuitState};
use crate::health::HealthMonitor;
use crate::selector::{RequestContext, Selector};
use crate::types::{AiResponse, Message, TokenUsage};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What a provider adapter returns for one completed call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// The outbound contract every provider backend implements.
///
/// Adapters translate the unified message list into the provider's wire format and
/// classify failures into the crate error taxonomy. An adapter must return
/// [`Error::Interrupted`] when a call dies after response bytes were received, so
/// the executor can record an indeterminate outcome instead of a failure.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<Completion>;

    /// Out-of-band liveness probe; does not count as a request.
    async fn health_check(&self) -> Result<()>;
}

/// Walks the ordered candidate list, recording outcomes and failing over.
pub struct RequestExecutor {
    selector: Selector,
    health: Arc<HealthMonitor>,
    circuit: Arc<CircuitBreaker>,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    call_timeout: Duration,
}

impl RequestExecutor {
    pub fn new(
        selector: Selector,
        health: Arc<HealthMonitor>,
        circuit: Arc<CircuitBreaker>,
        adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            selector,
            health,
            circuit,
            adapters,
            call_timeout,
        }
    }

    /// Execute one conversational request with bounded failover.
    ///
    /// Zero eligible candidates means zero network calls and
    /// [`Error::NoEligibleProvider`].
    pub async fn execute(&self, ctx: &RequestContext) -> Result<AiResponse> {
        let candidates = self.selector.select(ctx);
        if candidates.is_empty() {
            warn!(request_id = ctx.request_id.as_str(), "no eligible provider");
            return Err(Error::NoEligibleProvider);
        }

        let mut attempts = 0usize;
        let mut last_error: Option<Error> = None;

        for spec in candidates {
            let provider = spec.name();
            let Some(adapter) = self.adapters.get(provider) else {
                // Registered without an adapter is a wiring bug, not a provider
                // failure; skip without touching counters.
                warn!(provider = provider, "no adapter registered, skipping");
                continue;
            };

            // A concurrent request may have consumed a half-open trial slot since
            // selection; the claim is what enforces the single-trial rule.
            if !self.circuit.try_acquire(provider) {
                continue;
            }

            attempts += 1;
            let start = Instant::now();
            let outcome = tokio::time::timeout(self.call_timeout, adapter.complete(&ctx.messages))
                .await;
            let latency = start.elapsed();

            match outcome {
                Ok(Ok(completion)) => {
                    self.health.record_outcome(provider, true, latency);
                    self.circuit.record_result(provider, true);
                    info!(
                        provider = provider,
                        request_id = ctx.request_id.as_str(),
                        latency_ms = latency.as_millis() as u64,
                        attempts = attempts,
                        "provider call succeeded"
                    );
                    return Ok(AiResponse {
                        provider: provider.to_string(),
                        content: completion.content,
                        usage: completion.usage,
                        latency,
                        request_id: ctx.request_id.clone(),
                    });
                }
                Ok(Err(err @ Error::Interrupted { .. })) => {
                    // Bytes arrived before the abort: indeterminate, not a failure.
                    self.health.record_indeterminate(provider, latency);
                    self.circuit.record_indeterminate(provider);
                    warn!(
                        provider = provider,
                        request_id = ctx.request_id.as_str(),
                        "provider call interrupted mid-response"
                    );
                    last_error = Some(err);
                }
                Ok(Err(err)) => {
                    self.health.record_outcome(provider, false, latency);
                    self.circuit.record_result(provider, false);
                    warn!(
                        provider = provider,
                        request_id = ctx.request_id.as_str(),
                        error = %err,
                        "provider call failed, trying next candidate"
                    );
                    last_error = Some(err);
                }
                Err(_elapsed) => {
                    self.health.record_outcome(provider, false, latency);
                    self.circuit.record_result(provider, false);
                    let err = Error::ProviderTimeout {
                        provider: provider.to_string(),
                        elapsed_ms: latency.as_millis() as u64,
                    };
                    warn!(
                        provider = provider,
                        request_id = ctx.request_id.as_str(),
                        timeout_ms = self.call_timeout.as_millis() as u64,
                        "provider call timed out, trying next candidate"
                    );
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => Err(Error::AllProvidersExhausted {
                attempts,
                last_error: Box::new(err),
            }),
            // Every candidate lost its claim to a concurrent request.
            None => Err(Error::NoEligibleProvider),
        }
    }

    /// Actively probe one provider out-of-band. A successful probe resets the
    /// health record; a half-open circuit closes, an open one still waits out its
    /// timeout.
    pub async fn health_check(&self, provider: &str) -> Result<()> {
        let adapter = self.adapters.get(provider).ok_or_else(|| {
            Error::Configuration(format!("unknown provider '{provider}'"))
        })?;

        adapter.health_check().await?;

        self.health.reset(provider);
        if self.circuit.state(provider) == CircuitState::HalfOpen {
            self.circuit.record_result(provider, true);
        }
        info!(provider = provider, "health check passed");
        Ok(())
    }

    pub(crate) fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub(crate) fn circuit(&self) -> &Arc<CircuitBreaker> {
        &self.circuit
    }
}
