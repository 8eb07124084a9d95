use std::collections::BTreeMap;
use std::time::Duration;

/// Per-endpoint tallies, keyed by `ParsedRequest::endpoint_key` (§4.4).
#[derive(Debug, Clone, Default)]
pub struct EndpointStats {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub connection_errors: u64,
    pub mean_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
}

/// A 1-second time bucket, keyed by `floor((started_at_ns -
/// run_start_ns)/1e9)` (§3 invariants).
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBucket {
    pub count: u64,
    pub successes: u64,
    pub failures: u64,
    pub mean_latency_ms: f64,
    pub p95_latency_ms: f64,
}

/// An immutable snapshot of counters, percentiles, per-endpoint tallies,
/// and time-series buckets at the moment it was taken (§3).
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub run_duration: Duration,
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub connection_errors: u64,
    pub tps_instantaneous: f64,
    pub tps_mean: f64,
    pub mean_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub error_rate_pct: f64,
    pub timeout_rate_pct: f64,
    pub per_endpoint: BTreeMap<String, EndpointStats>,
    pub time_series: BTreeMap<u64, TimeSeriesBucket>,
    /// Only populated when a snapshot was requested with
    /// `include_response_times = true` (§4.4).
    pub response_times_sample: Vec<f64>,
}

impl Aggregate {
    /// Invariant 2 (§8): `sum(per-endpoint.total) == global.total`.
    #[must_use]
    pub fn endpoints_conserve_total(&self) -> bool {
        let summed: u64 = self.per_endpoint.values().map(|stats| stats.total).sum();
        summed == self.total_requests
    }

    /// Invariant 3 (§8): `P50 <= P95 <= P99 <= max_observed_latency`,
    /// checked only once at least one successful result has been
    /// observed (percentiles are undefined before that).
    #[must_use]
    pub fn percentiles_are_monotonic(&self) -> bool {
        if self.successes == 0 {
            return true;
        }
        self.p50_latency_ms <= self.p95_latency_ms && self.p95_latency_ms <= self.p99_latency_ms
    }
}
