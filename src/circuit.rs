//! Per-provider circuit breaker.
//!
//! Stops calling a degraded provider after repeated failures while still probing it
//! for recovery:
//!
//! - **Closed**: normal operation, calls pass through
//! - **Open**: failures reached the threshold, calls fail fast until the reset
//!   timeout elapses
//! - **HalfOpen**: a single trial call is permitted to test recovery
//!
//! The Open → HalfOpen transition happens lazily on the first eligibility check
//! after the timeout; no background task is involved. State changes are logged as
//! events, they are never request-level errors.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

/// Circuit state of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Breaker tuning. The documented defaults (3 consecutive failures, 60 s reset)
/// are defaults, not requirements.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

#[derive(Debug)]
struct ProviderCircuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Whether the single HalfOpen trial slot is taken.
    trial_inflight: bool,
}

impl Default for ProviderCircuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_inflight: false,
        }
    }
}

impl ProviderCircuit {
    /// Lazy Open -> HalfOpen transition once the reset timeout has elapsed.
    fn advance(&mut self, provider: &str, reset_timeout: Duration) {
        if self.state == CircuitState::Open {
            let elapsed = self.opened_at.map(|t| t.elapsed()).unwrap_or_default();
            if elapsed >= reset_timeout {
                self.state = CircuitState::HalfOpen;
                self.trial_inflight = false;
                log_transition(provider, CircuitState::Open, CircuitState::HalfOpen);
            }
        }
    }
}

/// Point-in-time view of one provider's circuit.
#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Remaining open time, if currently open.
    pub open_remaining: Option<Duration>,
}

/// Per-provider circuit breaker map.
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    circuits: Mutex<HashMap<String, ProviderCircuit>>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Drive the state machine with a call result.
    pub fn record_result(&self, provider: &str, success: bool) {
        if let Ok(mut circuits) = self.circuits.lock() {
            let circuit = circuits.entry(provider.to_string()).or_default();
            let prev = circuit.state;
            if success {
                circuit.consecutive_failures = 0;
                circuit.opened_at = None;
                circuit.trial_inflight = false;
                circuit.state = CircuitState::Closed;
                if prev != CircuitState::Closed {
                    log_transition(provider, prev, CircuitState::Closed);
                }
            } else {
                circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
                circuit.trial_inflight = false;
                let reopen = prev == CircuitState::HalfOpen
                    || (prev == CircuitState::Closed
                        && circuit.consecutive_failures >= self.cfg.failure_threshold);
                if reopen {
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(Instant::now());
                    log_transition(provider, prev, CircuitState::Open);
                }
            }
        }
    }

    /// An aborted trial with an indeterminate outcome releases the trial slot
    /// without driving any transition.
    pub fn record_indeterminate(&self, provider: &str) {
        if let Ok(mut circuits) = self.circuits.lock() {
            if let Some(circuit) = circuits.get_mut(provider) {
                circuit.trial_inflight = false;
            }
        }
    }

    /// True when the circuit is Closed, or HalfOpen with the trial slot free.
    /// Performs the lazy Open -> HalfOpen transition when the timeout has elapsed.
    pub fn is_eligible(&self, provider: &str) -> bool {
        match self.circuits.lock() {
            Ok(mut circuits) => match circuits.get_mut(provider) {
                Some(circuit) => {
                    circuit.advance(provider, self.cfg.reset_timeout);
                    match circuit.state {
                        CircuitState::Closed => true,
                        CircuitState::HalfOpen => !circuit.trial_inflight,
                        CircuitState::Open => false,
                    }
                }
                None => true,
            },
            Err(_) => false,
        }
    }

    /// Claim the right to issue a call. For a HalfOpen circuit this consumes the
    /// single trial slot; at most one trial call runs at a time.
    pub fn try_acquire(&self, provider: &str) -> bool {
        match self.circuits.lock() {
            Ok(mut circuits) => {
                let circuit = circuits.entry(provider.to_string()).or_default();
                circuit.advance(provider, self.cfg.reset_timeout);
                match circuit.state {
                    CircuitState::Closed => true,
                    CircuitState::HalfOpen if !circuit.trial_inflight => {
                        circuit.trial_inflight = true;
                        true
                    }
                    _ => false,
                }
            }
            Err(_) => false,
        }
    }

    /// Current state (after the lazy transition). Unknown providers are Closed.
    pub fn state(&self, provider: &str) -> CircuitState {
        match self.circuits.lock() {
            Ok(mut circuits) => match circuits.get_mut(provider) {
                Some(circuit) => {
                    circuit.advance(provider, self.cfg.reset_timeout);
                    circuit.state
                }
                None => CircuitState::Closed,
            },
            Err(_) => CircuitState::Open,
        }
    }

    pub fn snapshot(&self, provider: &str) -> CircuitSnapshot {
        let now = Instant::now();
        match self.circuits.lock() {
            Ok(circuits) => match circuits.get(provider) {
                Some(circuit) => {
                    let open_remaining = match circuit.state {
                        CircuitState::Open => circuit.opened_at.and_then(|t| {
                            (t + self.cfg.reset_timeout).checked_duration_since(now)
                        }),
                        _ => None,
                    };
                    CircuitSnapshot {
                        state: circuit.state,
                        consecutive_failures: circuit.consecutive_failures,
                        open_remaining,
                    }
                }
                None => CircuitSnapshot {
                    state: CircuitState::Closed,
                    consecutive_failures: 0,
                    open_remaining: None,
                },
            },
            Err(_) => CircuitSnapshot {
                state: CircuitState::Open,
                consecutive_failures: 0,
                open_remaining: None,
            },
        }
    }
}

fn log_transition(provider: &str, from: CircuitState, to: CircuitState) {
    info!(
        provider = provider,
        from = from.as_str(),
        to = to.as_str(),
        "circuit breaker state change"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn breaker(threshold: u32, timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(threshold)
                .with_reset_timeout(timeout),
        )
    }

    #[test]
    fn test_config_defaults() {
        let cfg = CircuitBreakerConfig::default();
        assert_eq!(cfg.failure_threshold, 3);
        assert_eq!(cfg.reset_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_provider_is_closed_and_eligible() {
        let cb = breaker(3, Duration::from_secs(60));
        assert_eq!(cb.state("openai"), CircuitState::Closed);
        assert!(cb.is_eligible("openai"));
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let cb = breaker(3, Duration::from_secs(60));
        cb.record_result("openai", false);
        cb.record_result("openai", false);
        assert!(cb.is_eligible("openai"));

        cb.record_result("openai", false);
        assert_eq!(cb.state("openai"), CircuitState::Open);
        assert!(!cb.is_eligible("openai"));
        assert!(cb.snapshot("openai").open_remaining.is_some());
    }

    #[test]
    fn test_success_resets_counter() {
        let cb = breaker(3, Duration::from_secs(60));
        cb.record_result("openai", false);
        cb.record_result("openai", false);
        cb.record_result("openai", true);
        cb.record_result("openai", false);
        cb.record_result("openai", false);
        assert_eq!(cb.state("openai"), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_timeout_permits_one_trial() {
        let cb = breaker(2, Duration::from_millis(50));
        cb.record_result("openai", false);
        cb.record_result("openai", false);
        assert!(!cb.is_eligible("openai"));

        thread::sleep(Duration::from_millis(60));

        // First eligibility check after the timeout transitions to HalfOpen.
        assert!(cb.is_eligible("openai"));
        assert_eq!(cb.state("openai"), CircuitState::HalfOpen);

        // Exactly one trial slot.
        assert!(cb.try_acquire("openai"));
        assert!(!cb.try_acquire("openai"));
        assert!(!cb.is_eligible("openai"));
    }

    #[test]
    fn test_half_open_success_closes() {
        let cb = breaker(2, Duration::from_millis(50));
        cb.record_result("openai", false);
        cb.record_result("openai", false);
        thread::sleep(Duration::from_millis(60));
        assert!(cb.try_acquire("openai"));

        cb.record_result("openai", true);
        assert_eq!(cb.state("openai"), CircuitState::Closed);
        assert_eq!(cb.snapshot("openai").consecutive_failures, 0);
        assert!(cb.try_acquire("openai"));
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = breaker(2, Duration::from_millis(50));
        cb.record_result("openai", false);
        cb.record_result("openai", false);
        thread::sleep(Duration::from_millis(60));
        assert!(cb.try_acquire("openai"));

        cb.record_result("openai", false);
        assert_eq!(cb.state("openai"), CircuitState::Open);
        assert!(!cb.is_eligible("openai"));
    }

    #[test]
    fn test_indeterminate_releases_trial_without_transition() {
        let cb = breaker(2, Duration::from_millis(50));
        cb.record_result("openai", false);
        cb.record_result("openai", false);
        thread::sleep(Duration::from_millis(60));
        assert!(cb.try_acquire("openai"));
        assert!(!cb.is_eligible("openai"));

        cb.record_indeterminate("openai");
        assert_eq!(cb.state("openai"), CircuitState::HalfOpen);
        assert!(cb.try_acquire("openai"));
    }

    #[test]
    fn test_circuits_are_independent() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record_result("openai", false);
        assert_eq!(cb.state("openai"), CircuitState::Open);
        assert_eq!(cb.state("anthropic"), CircuitState::Closed);
        assert!(cb.is_eligible("anthropic"));
    }

    #[test]
    fn test_thread_safe() {
        use std::sync::Arc;

        let cb = Arc::new(breaker(1_000, Duration::from_secs(60)));
        let mut handles = vec![];
        for _ in 0..10 {
            let cb = Arc::clone(&cb);
            handles.push(thread::spawn(move || {
                for _ in 0..5 {
                    cb.record_result("openai", false);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cb.snapshot("openai").consecutive_failures, 50);
    }
}
