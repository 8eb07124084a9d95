mod target;
mod tee;
mod vu;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{debug, info};

use crate::config::{EnvOverrides, ScenarioConfig};
use crate::domain::{RequestResult, RequestSource};
use crate::error::{SchedulerError, SchedulerResult, ValidationError};
use crate::http::{prepare, HttpExecutor, PreparedRequest, Transport};
use crate::shutdown::ShutdownReceiver;

pub use target::load_target;

use tee::ResultsSink;

/// How often the scheduler recomputes N(t) and reconciles the live VU
/// count against it (§4.5).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);
/// How long `stop_all` waits for in-flight requests to finish before
/// giving up on stragglers (§4.5).
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Resolve a `RequestSource` into the cached, substitution-applied
/// request templates a `Scheduler` hands to every VU (§4.1, §4.10).
/// Computed once per run, shared read-only thereafter.
///
/// # Errors
///
/// Returns `ValidationError::EmptyRequestSequence` if `source` yields no
/// requests, or any `ValidationError` `RequestPrep` surfaces for a
/// malformed template.
pub fn prepare_sequence(
    source: &dyn RequestSource,
    overrides: &EnvOverrides,
) -> Result<Arc<Vec<PreparedRequest>>, ValidationError> {
    let requests = source.requests();
    if requests.is_empty() {
        return Err(ValidationError::EmptyRequestSequence);
    }
    let prepared = requests
        .iter()
        .map(|request| prepare(request, overrides))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Arc::new(prepared))
}

struct VuHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Owns the live VU pool and converges it against a target-concurrency
/// function N(t) (§4.5). Generic over `Transport` so the whole run can
/// be driven against a fake transport in tests.
pub struct Scheduler<T: Transport> {
    executor: Arc<HttpExecutor<T>>,
    requests: Arc<Vec<PreparedRequest>>,
    think_time_ms: u64,
    iterations: u64,
    results_tx: ResultsSink,
    tick_interval: Duration,
    /// FIFO of live VUs: cancellation always pops the oldest-spawned
    /// first (§4.5 — "simplest to reason about under the 'count
    /// converges within one tick' requirement").
    vus: VecDeque<VuHandle>,
    retiring: Vec<VuHandle>,
    next_vu_id: u64,
}

impl<T: Transport + 'static> Scheduler<T> {
    #[must_use]
    pub fn new(
        executor: Arc<HttpExecutor<T>>,
        requests: Arc<Vec<PreparedRequest>>,
        think_time_ms: u64,
        iterations: u64,
        results_tx: mpsc::Sender<RequestResult>,
    ) -> Self {
        Self {
            executor,
            requests,
            think_time_ms,
            iterations,
            results_tx: ResultsSink::new(results_tx),
            tick_interval: DEFAULT_TICK_INTERVAL,
            vus: VecDeque::new(),
            retiring: Vec::new(),
            next_vu_id: 0,
        }
    }

    #[must_use]
    pub const fn current_count(&self) -> usize {
        self.vus.len()
    }

    /// Install or clear the secondary results tap a `StressController`
    /// tees a phase's own `RequestResult`s into (§4.6). Never affects
    /// the primary results channel every VU already backpressures on.
    pub fn set_tap(&self, tap: Option<mpsc::Sender<RequestResult>>) {
        self.results_tx.set_tap(tap);
    }

    fn spawn_vu(&mut self) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let vu_id = self.next_vu_id;
        self.next_vu_id = self.next_vu_id.saturating_add(1);

        let vu = vu::VirtualUser {
            vu_id,
            executor: Arc::clone(&self.executor),
            requests: Arc::clone(&self.requests),
            think_time_ms: self.think_time_ms,
            iterations: self.iterations,
            results_tx: self.results_tx.clone(),
            stop: stop_rx,
        };
        let join = tokio::spawn(vu.run());
        self.vus.push_back(VuHandle { stop_tx, join });
    }

    /// Converge the live VU count to `target`: spawn the shortfall, or
    /// signal the oldest-spawned surplus VUs to stop after their current
    /// request (§4.5). Synchronous — convergence of the *count* is
    /// immediate; convergence of the underlying tasks is eventual.
    pub fn reconcile(&mut self, target: u64) {
        #[allow(clippy::cast_possible_truncation)]
        let current = self.vus.len() as u64;
        if current < target {
            for _ in current..target {
                self.spawn_vu();
            }
        } else if current > target {
            let surplus = current - target;
            for _ in 0..surplus {
                let Some(handle) = self.vus.pop_front() else {
                    break;
                };
                let _ignored = handle.stop_tx.send(true);
                self.retiring.push(handle);
            }
        }
    }

    /// Hold a constant target for `hold`, used by the stress controller
    /// to drive one phase (§4.6). Reconciles once up front; VUs run
    /// indefinitely (`iterations == 0`) for the duration of the hold.
    pub async fn hold_constant(&mut self, target: u64, hold: Duration) {
        self.reconcile(target);
        tokio::time::sleep(hold).await;
    }

    /// Drive a full load-test scenario's tick loop (§4.5): recompute
    /// N(t) every `tick_interval`, reconcile, and stop when `t >=
    /// duration_seconds` or `shutdown` fires. Always ends by stopping
    /// every VU and waiting out the grace period.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::VuJoin` if a VU task panicked.
    pub async fn run_scenario(
        &mut self,
        config: &ScenarioConfig,
        run_start: Instant,
        shutdown: &mut ShutdownReceiver,
    ) -> SchedulerResult<()> {
        let duration = Duration::from_secs(config.duration_seconds);
        let mut ticker = interval(self.tick_interval);

        loop {
            tokio::select! {
                () = shutdown.recv() => {
                    info!("scheduler observed shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let elapsed = run_start.elapsed();
                    if elapsed >= duration {
                        break;
                    }
                    let target = target::load_target(config, elapsed.as_secs_f64());
                    debug!(target, current = self.current_count(), "reconciling VU pool");
                    self.reconcile(target);
                }
            }
        }

        self.stop_all(DEFAULT_GRACE_PERIOD).await
    }

    /// Signal every live VU to stop and wait up to `grace` for all tasks
    /// (live and already-retiring) to finish. Stragglers past `grace`
    /// are abandoned; they will still observe `stop` and exit on their
    /// own, they are just no longer awaited.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::VuJoin` if a VU task panicked.
    pub async fn stop_all(&mut self, grace: Duration) -> SchedulerResult<()> {
        while let Some(handle) = self.vus.pop_front() {
            let _ignored = handle.stop_tx.send(true);
            self.retiring.push(handle);
        }

        let retiring = std::mem::take(&mut self.retiring);
        let joins = retiring.into_iter().map(|handle| handle.join);

        match timeout(grace, join_all(joins)).await {
            Ok(results) => {
                for result in results {
                    result.map_err(|source| SchedulerError::VuJoin { source })?;
                }
                Ok(())
            }
            Err(_elapsed) => {
                info!("grace period elapsed with VU tasks still draining");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadScenarioKind;
    use crate::domain::ManualRequestSource;
    use crate::http::TransportOutcome;

    #[derive(Clone)]
    struct AlwaysOkTransport;

    impl Transport for AlwaysOkTransport {
        async fn send(&self, _prepared: &PreparedRequest) -> TransportOutcome {
            TransportOutcome::Response {
                status_code: 200,
                bytes_received: 1,
            }
        }
    }

    fn scheduler(results_tx: mpsc::Sender<RequestResult>) -> Scheduler<AlwaysOkTransport> {
        let source = ManualRequestSource::new("http://localhost/ping");
        let requests = prepare_sequence(&source, &EnvOverrides::default()).expect("valid sequence");
        let executor = Arc::new(HttpExecutor::new(AlwaysOkTransport, Instant::now(), 0));
        Scheduler::new(executor, requests, 0, 0, results_tx)
    }

    #[tokio::test]
    async fn reconcile_spawns_up_to_target() {
        let (tx, _rx) = mpsc::channel(1024);
        let mut scheduler = scheduler(tx);
        scheduler.reconcile(5);
        assert_eq!(scheduler.current_count(), 5);
    }

    #[tokio::test]
    async fn reconcile_cancels_oldest_first_down_to_target() {
        let (tx, _rx) = mpsc::channel(1024);
        let mut scheduler = scheduler(tx);
        scheduler.reconcile(10);
        scheduler.reconcile(3);
        assert_eq!(scheduler.current_count(), 3);
        assert_eq!(scheduler.retiring.len(), 7);
    }

    #[tokio::test]
    async fn stop_all_drains_every_vu_within_grace() {
        let (tx, mut rx) = mpsc::channel(1024);
        let mut scheduler = scheduler(tx);
        scheduler.reconcile(4);
        scheduler
            .stop_all(Duration::from_secs(1))
            .await
            .expect("vu tasks do not panic");
        assert_eq!(scheduler.current_count(), 0);
        drop(scheduler);
        // at least one result should have been emitted before VUs stopped
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn tapped_results_reach_both_primary_and_tap() {
        let (tx, mut rx) = mpsc::channel(1024);
        let mut scheduler = scheduler(tx);
        let (tap_tx, mut tap_rx) = mpsc::channel(1024);
        scheduler.set_tap(Some(tap_tx));
        scheduler.reconcile(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler
            .stop_all(Duration::from_secs(1))
            .await
            .expect("vu tasks do not panic");
        drop(scheduler);
        assert!(rx.recv().await.is_some());
        assert!(tap_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn run_scenario_converges_then_stops_after_duration() {
        let (tx, _rx) = mpsc::channel(4096);
        let mut scheduler = scheduler(tx);
        let config = ScenarioConfig {
            users: 3,
            ramp_up_seconds: 0,
            duration_seconds: 1,
            iterations: 0,
            think_time_ms: 0,
            scenario: LoadScenarioKind::Constant,
            spike_users: 0,
            spike_duration_seconds: 0,
            sla_p95_ms: None,
            sla_p99_ms: None,
            sla_error_rate_pct: None,
        };
        let shutdown = crate::shutdown::ShutdownSender::new();
        let mut receiver = shutdown.subscribe();
        scheduler
            .run_scenario(&config, Instant::now(), &mut receiver)
            .await
            .expect("scenario run does not panic");
        assert_eq!(scheduler.current_count(), 0);
    }

    #[derive(Clone)]
    struct FixedLatencyTransport(Duration);

    impl Transport for FixedLatencyTransport {
        async fn send(&self, _prepared: &PreparedRequest) -> TransportOutcome {
            tokio::time::sleep(self.0).await;
            TransportOutcome::Response {
                status_code: 200,
                bytes_received: 1,
            }
        }
    }

    /// Constant load holds a fixed concurrency for the whole run and, with
    /// every request succeeding at a known latency, throughput should stay
    /// above the floor implied by `users * duration / latency`.
    #[tokio::test]
    async fn s1_constant_load_meets_throughput_floor_with_all_200s() {
        let source = ManualRequestSource::new("http://localhost/ping");
        let requests = prepare_sequence(&source, &EnvOverrides::default()).expect("valid sequence");
        let executor = Arc::new(HttpExecutor::new(
            FixedLatencyTransport(Duration::from_millis(10)),
            Instant::now(),
            0,
        ));
        let (tx, mut rx) = mpsc::channel(8192);
        let mut scheduler = Scheduler::new(executor, requests, 0, 0, tx);
        let config = ScenarioConfig {
            users: 5,
            ramp_up_seconds: 0,
            duration_seconds: 3,
            iterations: 0,
            think_time_ms: 0,
            scenario: LoadScenarioKind::Constant,
            spike_users: 0,
            spike_duration_seconds: 0,
            sla_p95_ms: None,
            sla_p99_ms: None,
            sla_error_rate_pct: None,
        };
        let shutdown = crate::shutdown::ShutdownSender::new();
        let mut receiver = shutdown.subscribe();
        scheduler
            .run_scenario(&config, Instant::now(), &mut receiver)
            .await
            .expect("scenario run does not panic");
        drop(scheduler);

        let mut total = 0u64;
        let mut successes = 0u64;
        while let Some(result) = rx.recv().await {
            total += 1;
            if result.ok {
                successes += 1;
            }
        }

        let floor = 5.0 * 3.0 * (1000.0 / 10.0) * 0.5;
        assert!(
            (total as f64) >= floor,
            "expected at least {floor} requests, got {total}"
        );
        assert_eq!(successes, total);
    }

    /// A gradual ramp's active VU count should track the linear target
    /// function at any point during the ramp, converging to the full
    /// user count once ramp_up_seconds has elapsed.
    #[tokio::test]
    async fn s2_gradual_ramp_tracks_target_concurrency_over_time() {
        let (tx, _rx) = mpsc::channel(1024);
        let mut scheduler = scheduler(tx);
        let config = ScenarioConfig {
            users: 10,
            ramp_up_seconds: 2,
            duration_seconds: 4,
            iterations: 0,
            think_time_ms: 0,
            scenario: LoadScenarioKind::Gradual,
            spike_users: 0,
            spike_duration_seconds: 0,
            sla_p95_ms: None,
            sla_p99_ms: None,
            sla_error_rate_pct: None,
        };

        scheduler.reconcile(load_target(&config, 1.0));
        assert_eq!(scheduler.current_count(), 5);

        scheduler.reconcile(load_target(&config, 3.0));
        assert_eq!(scheduler.current_count(), 10);

        scheduler
            .stop_all(Duration::from_secs(1))
            .await
            .expect("vu tasks do not panic");
    }

    #[derive(Clone)]
    struct CountingTransport(Arc<std::sync::atomic::AtomicU64>);

    impl Transport for CountingTransport {
        async fn send(&self, _prepared: &PreparedRequest) -> TransportOutcome {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            TransportOutcome::Response {
                status_code: 200,
                bytes_received: 1,
            }
        }
    }

    /// A slow consumer reading off a tiny channel must never lose a
    /// result: every VU send backpressures instead of dropping, so the
    /// number folded by the consumer always equals the number attempted.
    #[tokio::test]
    async fn s6_backpressure_preserves_every_result_under_a_slow_consumer() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let source = ManualRequestSource::new("http://localhost/ping");
        let requests = prepare_sequence(&source, &EnvOverrides::default()).expect("valid sequence");
        let attempts = Arc::new(AtomicU64::new(0));
        let executor = Arc::new(HttpExecutor::new(
            CountingTransport(Arc::clone(&attempts)),
            Instant::now(),
            0,
        ));
        let (tx, mut rx) = mpsc::channel(4);
        let mut scheduler = Scheduler::new(executor, requests, 0, 0, tx);

        let drained = Arc::new(AtomicU64::new(0));
        let drained_clone = Arc::clone(&drained);
        let consumer = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                drained_clone.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });

        let config = ScenarioConfig {
            users: 4,
            ramp_up_seconds: 0,
            duration_seconds: 1,
            iterations: 0,
            think_time_ms: 0,
            scenario: LoadScenarioKind::Constant,
            spike_users: 0,
            spike_duration_seconds: 0,
            sla_p95_ms: None,
            sla_p99_ms: None,
            sla_error_rate_pct: None,
        };
        let shutdown = crate::shutdown::ShutdownSender::new();
        let mut receiver = shutdown.subscribe();
        scheduler
            .run_scenario(&config, Instant::now(), &mut receiver)
            .await
            .expect("scenario run does not panic");
        drop(scheduler);

        consumer.await.expect("consumer task does not panic");

        let sent = attempts.load(Ordering::SeqCst);
        assert!(sent > 4, "expected backpressure to be exercised, only sent {sent}");
        assert_eq!(drained.load(Ordering::SeqCst), sent);
    }
}
