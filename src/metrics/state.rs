use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::{Aggregate, EndpointStats, ErrorKind, RequestResult, TimeSeriesBucket};

use super::ring_buffer::RingBuffer;
use super::tdigest::TDigest;

const DEFAULT_RING_BUFFER_CAPACITY: usize = 100_000;

struct EndpointAccum {
    total: u64,
    successes: u64,
    failures: u64,
    timeouts: u64,
    connection_errors: u64,
    latency_sum_ms: f64,
    digest: TDigest,
}

impl Default for EndpointAccum {
    fn default() -> Self {
        Self {
            total: 0,
            successes: 0,
            failures: 0,
            timeouts: 0,
            connection_errors: 0,
            latency_sum_ms: 0.0,
            digest: TDigest::new(),
        }
    }
}

struct BucketAccum {
    count: u64,
    successes: u64,
    failures: u64,
    latency_sum_ms: f64,
    digest: TDigest,
}

impl Default for BucketAccum {
    fn default() -> Self {
        Self {
            count: 0,
            successes: 0,
            failures: 0,
            latency_sum_ms: 0.0,
            digest: TDigest::new(),
        }
    }
}

/// Single-writer mutable aggregation state (§4.4). Owned exclusively by
/// the metrics-consumer task; every other view of it is a point-in-time
/// `Aggregate` snapshot, never a shared reference into this struct.
pub struct MetricsState {
    run_start_ns: u64,
    total: u64,
    successes: u64,
    failures: u64,
    timeouts: u64,
    connection_errors: u64,
    global_digest: TDigest,
    per_endpoint: BTreeMap<String, EndpointAccum>,
    time_series: BTreeMap<u64, BucketAccum>,
    latest_bucket_seen: u64,
    /// Results whose bucket was at least 2 seconds stale and got
    /// redirected into the earliest still-open bucket (§3 invariants).
    pub late_result_redirects: u64,
    response_times: RingBuffer<f64>,
}

impl MetricsState {
    #[must_use]
    pub fn new(run_start_ns: u64) -> Self {
        Self::with_ring_capacity(run_start_ns, DEFAULT_RING_BUFFER_CAPACITY)
    }

    #[must_use]
    pub fn with_ring_capacity(run_start_ns: u64, ring_capacity: usize) -> Self {
        Self {
            run_start_ns,
            total: 0,
            successes: 0,
            failures: 0,
            timeouts: 0,
            connection_errors: 0,
            global_digest: TDigest::new(),
            per_endpoint: BTreeMap::new(),
            time_series: BTreeMap::new(),
            latest_bucket_seen: 0,
            late_result_redirects: 0,
            response_times: RingBuffer::new(ring_capacity),
        }
    }

    /// Fold one `RequestResult` into the running aggregates. Exactly one
    /// call per emitted result (§3 invariant).
    pub fn fold(&mut self, result: &RequestResult) {
        self.total = self.total.saturating_add(1);
        if result.ok {
            self.successes = self.successes.saturating_add(1);
        } else {
            self.failures = self.failures.saturating_add(1);
            match result.error_kind {
                ErrorKind::Timeout => self.timeouts = self.timeouts.saturating_add(1),
                ErrorKind::Connection => {
                    self.connection_errors = self.connection_errors.saturating_add(1);
                }
                ErrorKind::None | ErrorKind::Protocol | ErrorKind::Other => {}
            }
        }

        let endpoint = self
            .per_endpoint
            .entry(result.endpoint_key.clone())
            .or_default();
        endpoint.total = endpoint.total.saturating_add(1);
        if result.ok {
            endpoint.successes = endpoint.successes.saturating_add(1);
            endpoint.latency_sum_ms += result.elapsed_ms;
            endpoint.digest.record(result.elapsed_ms);
            self.global_digest.record(result.elapsed_ms);
            self.response_times.push(result.elapsed_ms);
        } else {
            endpoint.failures = endpoint.failures.saturating_add(1);
            match result.error_kind {
                ErrorKind::Timeout => endpoint.timeouts = endpoint.timeouts.saturating_add(1),
                ErrorKind::Connection => {
                    endpoint.connection_errors = endpoint.connection_errors.saturating_add(1);
                }
                ErrorKind::None | ErrorKind::Protocol | ErrorKind::Other => {}
            }
        }

        self.fold_time_series(result);
    }

    fn bucket_index_for(&self, started_at_ns: u64) -> u64 {
        // Results predating run_start clamp to bucket 0 (§3 invariants,
        // §9 open question).
        let elapsed_ns = started_at_ns.saturating_sub(self.run_start_ns);
        elapsed_ns / 1_000_000_000
    }

    fn fold_time_series(&mut self, result: &RequestResult) {
        let mut bucket_index = self.bucket_index_for(result.started_at_ns);

        if bucket_index + 1 < self.latest_bucket_seen {
            // More than 2 seconds stale relative to the latest bucket
            // observed: redirect into the earliest still-open bucket and
            // flag it, rather than mutate a bucket a snapshot may already
            // have read (§3 invariants).
            self.late_result_redirects = self.late_result_redirects.saturating_add(1);
            bucket_index = self.latest_bucket_seen.saturating_sub(1);
        } else if bucket_index > self.latest_bucket_seen {
            self.latest_bucket_seen = bucket_index;
        }

        let bucket = self.time_series.entry(bucket_index).or_default();
        bucket.count = bucket.count.saturating_add(1);
        if result.ok {
            bucket.successes = bucket.successes.saturating_add(1);
            bucket.latency_sum_ms += result.elapsed_ms;
            bucket.digest.record(result.elapsed_ms);
        } else {
            bucket.failures = bucket.failures.saturating_add(1);
        }
    }

    /// Assemble a point-in-time `Aggregate`. O(1) excluding the optional
    /// response-time sample copy (§4.4).
    #[must_use]
    pub fn full_aggregate(&mut self, run_duration: Duration, include_response_times: bool) -> Aggregate {
        let error_rate_pct = percentage(self.failures, self.total);
        let timeout_rate_pct = percentage(self.timeouts, self.total);
        let seconds = run_duration.as_secs_f64();
        let tps_mean = if seconds > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let total = self.total as f64;
            total / seconds
        } else {
            0.0
        };
        let current_bucket_count = self
            .time_series
            .get(&self.latest_bucket_seen)
            .map_or(0, |bucket| bucket.count);
        #[allow(clippy::cast_precision_loss)]
        let tps_instantaneous = current_bucket_count as f64;

        #[allow(clippy::cast_precision_loss)]
        let mean_latency_ms = if self.successes > 0 {
            let sum: f64 = self.per_endpoint.values().map(|e| e.latency_sum_ms).sum();
            sum / self.successes as f64
        } else {
            0.0
        };

        let p50 = self.global_digest.percentile(0.5);
        let p95 = self.global_digest.percentile(0.95);
        let p99 = self.global_digest.percentile(0.99);

        let per_endpoint = self
            .per_endpoint
            .iter_mut()
            .map(|(key, accum)| {
                #[allow(clippy::cast_precision_loss)]
                let mean = if accum.successes > 0 {
                    accum.latency_sum_ms / accum.successes as f64
                } else {
                    0.0
                };
                let stats = EndpointStats {
                    total: accum.total,
                    successes: accum.successes,
                    failures: accum.failures,
                    timeouts: accum.timeouts,
                    connection_errors: accum.connection_errors,
                    mean_latency_ms: mean,
                    p50_latency_ms: accum.digest.percentile(0.5),
                    p95_latency_ms: accum.digest.percentile(0.95),
                    p99_latency_ms: accum.digest.percentile(0.99),
                };
                (key.clone(), stats)
            })
            .collect();

        let time_series = self
            .time_series
            .iter_mut()
            .map(|(index, accum)| {
                #[allow(clippy::cast_precision_loss)]
                let mean = if accum.successes > 0 {
                    accum.latency_sum_ms / accum.successes as f64
                } else {
                    0.0
                };
                let bucket = TimeSeriesBucket {
                    count: accum.count,
                    successes: accum.successes,
                    failures: accum.failures,
                    mean_latency_ms: mean,
                    p95_latency_ms: accum.digest.percentile(0.95),
                };
                (*index, bucket)
            })
            .collect();

        let response_times_sample = if include_response_times {
            self.response_times.to_vec()
        } else {
            Vec::new()
        };

        Aggregate {
            run_duration,
            total_requests: self.total,
            successes: self.successes,
            failures: self.failures,
            timeouts: self.timeouts,
            connection_errors: self.connection_errors,
            tps_instantaneous,
            tps_mean,
            mean_latency_ms,
            p50_latency_ms: p50,
            p95_latency_ms: p95,
            p99_latency_ms: p99,
            error_rate_pct,
            timeout_rate_pct,
            per_endpoint,
            time_series,
            response_times_sample,
        }
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = (part as f64 / whole as f64) * 100.0;
    ratio
}
