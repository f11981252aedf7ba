//! Health monitor — rolling per-provider outcome counters.
//!
//! Health degradation is advisory: the selector combines it with circuit state for
//! the final eligibility decision, it is not a hard block on its own.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// Smoothing factor for the latency EWMA.
const LATENCY_EWMA_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Default)]
struct HealthRecord {
    success_count: u64,
    failure_count: u64,
    consecutive_failures: u32,
    last_latency: Option<Duration>,
    avg_latency_ms: Option<f64>,
    last_checked_at: Option<Instant>,
}

impl HealthRecord {
    fn observe_latency(&mut self, latency: Duration) {
        let ms = latency.as_secs_f64() * 1_000.0;
        self.avg_latency_ms = Some(match self.avg_latency_ms {
            Some(avg) => avg + LATENCY_EWMA_ALPHA * (ms - avg),
            None => ms,
        });
        self.last_latency = Some(latency);
        self.last_checked_at = Some(Instant::now());
    }
}

/// Point-in-time view of one provider's health record.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub consecutive_failures: u32,
    pub last_latency: Option<Duration>,
    pub avg_latency: Option<Duration>,
    pub last_checked_at: Option<Instant>,
}

/// Tracks rolling success/failure counters and smoothed latency per provider.
pub struct HealthMonitor {
    failure_threshold: u32,
    records: Mutex<HashMap<String, HealthRecord>>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            failure_threshold: 3,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Record the outcome of one call attempt.
    pub fn record_outcome(&self, provider: &str, success: bool, latency: Duration) {
        if let Ok(mut records) = self.records.lock() {
            let record = records.entry(provider.to_string()).or_default();
            if success {
                record.success_count += 1;
                record.consecutive_failures = 0;
            } else {
                record.failure_count += 1;
                record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            }
            record.observe_latency(latency);
        }
    }

    /// Record an aborted call that received at least one byte of response.
    /// Updates latency observations only; consecutive failures are untouched.
    pub fn record_indeterminate(&self, provider: &str, latency: Duration) {
        if let Ok(mut records) = self.records.lock() {
            records
                .entry(provider.to_string())
                .or_default()
                .observe_latency(latency);
        }
    }

    /// False once consecutive failures reach the threshold. Unknown providers
    /// are healthy.
    pub fn is_healthy(&self, provider: &str) -> bool {
        self.records
            .lock()
            .map(|records| {
                records
                    .get(provider)
                    .map(|r| r.consecutive_failures < self.failure_threshold)
                    .unwrap_or(true)
            })
            .unwrap_or(true)
    }

    /// Smoothed average latency, if any call has been observed.
    pub fn avg_latency(&self, provider: &str) -> Option<Duration> {
        self.records.lock().ok().and_then(|records| {
            records
                .get(provider)
                .and_then(|r| r.avg_latency_ms)
                .map(|ms| Duration::from_secs_f64(ms / 1_000.0))
        })
    }

    /// Clear the rolling counters after a successful out-of-band probe.
    /// Latency observations survive; they feed the latency strategy, not health.
    pub fn reset(&self, provider: &str) {
        if let Ok(mut records) = self.records.lock() {
            let record = records.entry(provider.to_string()).or_default();
            record.success_count = 0;
            record.failure_count = 0;
            record.consecutive_failures = 0;
            record.last_checked_at = Some(Instant::now());
        }
    }

    pub fn snapshot(&self, provider: &str) -> Option<HealthSnapshot> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(provider).map(snapshot_of))
    }

    pub fn snapshot_all(&self) -> HashMap<String, HealthSnapshot> {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .map(|(name, r)| (name.clone(), snapshot_of(r)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn snapshot_of(record: &HealthRecord) -> HealthSnapshot {
    HealthSnapshot {
        success_count: record.success_count,
        failure_count: record.failure_count,
        consecutive_failures: record.consecutive_failures,
        last_latency: record.last_latency,
        avg_latency: record
            .avg_latency_ms
            .map(|ms| Duration::from_secs_f64(ms / 1_000.0)),
        last_checked_at: record.last_checked_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_healthy() {
        let monitor = HealthMonitor::new();
        assert!(monitor.is_healthy("openai"));
        assert!(monitor.snapshot("openai").is_none());
    }

    #[test]
    fn test_unhealthy_at_threshold() {
        let monitor = HealthMonitor::new();
        for _ in 0..2 {
            monitor.record_outcome("openai", false, Duration::from_millis(100));
        }
        assert!(monitor.is_healthy("openai"));

        monitor.record_outcome("openai", false, Duration::from_millis(100));
        assert!(!monitor.is_healthy("openai"));
        assert_eq!(monitor.snapshot("openai").unwrap().consecutive_failures, 3);
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let monitor = HealthMonitor::new();
        monitor.record_outcome("openai", false, Duration::from_millis(100));
        monitor.record_outcome("openai", false, Duration::from_millis(100));
        monitor.record_outcome("openai", true, Duration::from_millis(80));

        let snap = monitor.snapshot("openai").unwrap();
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.success_count, 1);
        assert_eq!(snap.failure_count, 2);
    }

    #[test]
    fn test_indeterminate_does_not_touch_failures() {
        let monitor = HealthMonitor::new();
        monitor.record_outcome("openai", false, Duration::from_millis(100));
        monitor.record_indeterminate("openai", Duration::from_millis(250));

        let snap = monitor.snapshot("openai").unwrap();
        assert_eq!(snap.consecutive_failures, 1);
        assert_eq!(snap.failure_count, 1);
        assert!(snap.avg_latency.is_some());
    }

    #[test]
    fn test_reset_clears_rolling_counters() {
        let monitor = HealthMonitor::new();
        monitor.record_outcome("openai", true, Duration::from_millis(80));
        for _ in 0..4 {
            monitor.record_outcome("openai", false, Duration::from_millis(100));
        }
        assert!(!monitor.is_healthy("openai"));

        monitor.reset("openai");
        assert!(monitor.is_healthy("openai"));

        let snap = monitor.snapshot("openai").unwrap();
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.failure_count, 0);
        assert_eq!(snap.success_count, 0);
        // Latency observations survive a reset.
        assert!(snap.avg_latency.is_some());
    }

    #[test]
    fn test_avg_latency_smoothing() {
        let monitor = HealthMonitor::new();
        monitor.record_outcome("openai", true, Duration::from_millis(100));
        let first = monitor.avg_latency("openai").unwrap();
        assert!(first >= Duration::from_millis(99) && first <= Duration::from_millis(101));

        monitor.record_outcome("openai", true, Duration::from_millis(200));
        let avg = monitor.avg_latency("openai").unwrap();
        assert!(avg > Duration::from_millis(100) && avg < Duration::from_millis(200));
    }

    #[test]
    fn test_configurable_threshold() {
        let monitor = HealthMonitor::new().with_failure_threshold(1);
        monitor.record_outcome("openai", false, Duration::from_millis(100));
        assert!(!monitor.is_healthy("openai"));
    }

    #[test]
    fn test_thread_safe_counters() {
        use std::sync::Arc;
        use std::thread;

        let monitor = Arc::new(HealthMonitor::new().with_failure_threshold(u32::MAX));
        let mut handles = vec![];
        for _ in 0..10 {
            let m = Arc::clone(&monitor);
            handles.push(thread::spawn(move || {
                for _ in 0..5 {
                    m.record_outcome("openai", false, Duration::from_millis(10));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(monitor.snapshot("openai").unwrap().failure_count, 50);
    }
}
