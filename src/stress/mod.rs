//! `StressController` (§4.6): the outer control loop that promotes the
//! `Scheduler` through a sequence of phases derived from a
//! `StressConfig`, evaluating the SLA at the end of each one, and
//! halting on the first breach.

mod phases;

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::StressConfig;
use crate::domain::{PhaseResult, StressOutcome};
use crate::error::StressResult;
use crate::http::Transport;
use crate::metrics::spawn_consumer;
use crate::scheduler::Scheduler;
use crate::shutdown::ShutdownReceiver;
use crate::sla::{self, Thresholds};

use phases::phase_plan;

/// Capacity of the per-phase tap channel (§4.6): sized far below the
/// main results channel since it only needs to survive one
/// `step_interval_seconds` window's worth of traffic, fed best-effort
/// from `ResultsSink` (a full tap channel drops the tapped sample, not
/// the primary one).
const PHASE_TAP_CAPACITY: usize = 16_384;

/// Run every phase `config` plans (§4.6), in order, stopping at the
/// first SLA breach or when the plan is exhausted. Always leaves the
/// scheduler's VU pool stopped before returning.
///
/// # Errors
///
/// Returns `StressError::PhaseMetrics` if a phase's metrics consumer
/// task panicked, or `StressError::VuJoin` if the scheduler's final
/// `stop_all` observed a panicked VU task.
pub async fn run_stress_test<T: Transport + 'static>(
    config: &StressConfig,
    scheduler: &mut Scheduler<T>,
    run_start: Instant,
    run_start_ns: u64,
    shutdown: &mut ShutdownReceiver,
) -> StressResult<StressOutcome> {
    let thresholds = Thresholds::from(config);
    let plan = phase_plan(config);

    let mut phases = Vec::with_capacity(plan.len());
    let mut breaking_point = None;
    let mut max_sustainable_load = None;

    for (phase_index, spec) in plan.into_iter().enumerate() {
        if shutdown.has_fired() {
            info!(phase_index, "stress run observed shutdown before phase start, halting");
            break;
        }

        info!(phase_index, target = spec.target_users, "starting stress phase");

        let (phase_aggregate, reached_users) =
            run_phase(scheduler, spec.target_users, spec.duration, run_start, run_start_ns, shutdown).await?;

        let verdict = sla::evaluate(&phase_aggregate, &thresholds);
        let breached = !verdict.pass;

        if breached {
            warn!(
                phase_index,
                target = spec.target_users,
                violations = verdict.violations.len(),
                "stress phase breached SLA, halting"
            );
        }

        phases.push(PhaseResult {
            phase_index,
            target_users: spec.target_users,
            reached_users,
            duration: spec.duration,
            aggregate: phase_aggregate,
            verdict,
            breached,
        });

        if breached {
            breaking_point = Some(spec.target_users);
            break;
        }

        max_sustainable_load = Some(spec.target_users);
    }

    scheduler
        .stop_all(crate::scheduler::DEFAULT_GRACE_PERIOD)
        .await
        .map_err(|source| crate::error::StressError::VuJoin {
            source: join_error_from_scheduler(source),
        })?;

    Ok(StressOutcome {
        phases,
        breaking_point,
        max_sustainable_load,
    })
}

/// Hold one phase at `target_users` for `duration`, teeing every
/// `RequestResult` emitted during the hold into a fresh per-phase
/// `MetricsCollector` (§4.6 step 2) so the phase's percentiles are
/// computed only from samples observed during its own window — the
/// "diff from phase start" effect falls out naturally from
/// the tapped consumer never having seen anything before the phase.
async fn run_phase<T: Transport + 'static>(
    scheduler: &mut Scheduler<T>,
    target_users: u64,
    duration: Duration,
    run_start: Instant,
    run_start_ns: u64,
    shutdown: &mut ShutdownReceiver,
) -> StressResult<(crate::domain::Aggregate, u64)> {
    let phase_start = Instant::now();
    #[allow(clippy::cast_possible_truncation)]
    let phase_start_ns = run_start_ns
        .saturating_add(phase_start.saturating_duration_since(run_start).as_nanos() as u64);

    let (tap_tx, tap_rx) = mpsc::channel(PHASE_TAP_CAPACITY);
    let phase_metrics = spawn_consumer(tap_rx, phase_start, phase_start_ns);
    scheduler.set_tap(Some(tap_tx));

    tokio::select! {
        () = scheduler.hold_constant(target_users, duration) => {}
        () = shutdown.recv() => {
            warn!("shutdown observed mid-phase, cutting the hold short");
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let reached_users = scheduler.current_count() as u64;
    scheduler.set_tap(None);

    let aggregate = phase_metrics.join().await?;
    Ok((aggregate, reached_users))
}

/// `Scheduler::stop_all` already reports VU panics as `SchedulerError`;
/// the stress controller re-homes that failure under its own error type
/// rather than depending on `SchedulerError` directly, keeping one
/// error enum per subsystem (§4.9).
fn join_error_from_scheduler(source: crate::error::SchedulerError) -> tokio::task::JoinError {
    match source {
        crate::error::SchedulerError::VuJoin { source } | crate::error::SchedulerError::TickJoin { source } => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvOverrides, StressScenarioKind};
    use crate::domain::ManualRequestSource;
    use crate::http::{HttpExecutor, PreparedRequest, TransportOutcome};
    use crate::scheduler::prepare_sequence;
    use crate::shutdown::ShutdownSender;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc as tokio_mpsc;

    /// Latency scales with how many requests are concurrently in flight,
    /// which under zero think-time tracks the scheduler's target
    /// concurrency closely enough to exercise S5 (§8): "mock latency =
    /// target_users ms".
    #[derive(Clone)]
    struct LatencyScalesWithConcurrencyTransport {
        in_flight: Arc<AtomicU64>,
    }

    impl Transport for LatencyScalesWithConcurrencyTransport {
        async fn send(&self, _prepared: &PreparedRequest) -> TransportOutcome {
            let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(concurrent)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            TransportOutcome::Response {
                status_code: 200,
                bytes_received: 1,
            }
        }
    }

    fn test_scheduler() -> (
        Scheduler<LatencyScalesWithConcurrencyTransport>,
        tokio_mpsc::Receiver<crate::domain::RequestResult>,
    ) {
        let source = ManualRequestSource::new("http://localhost/ping");
        let requests = prepare_sequence(&source, &EnvOverrides::default()).expect("valid sequence");
        let transport = LatencyScalesWithConcurrencyTransport {
            in_flight: Arc::new(AtomicU64::new(0)),
        };
        let executor = Arc::new(HttpExecutor::new(transport, Instant::now(), 0));
        let (tx, rx) = tokio_mpsc::channel(8192);
        (Scheduler::new(executor, requests, 0, 0, tx), rx)
    }

    fn stress_config(sla_p95_ms: f64) -> StressConfig {
        StressConfig {
            scenario: StressScenarioKind::LinearOverload,
            initial_users: 2,
            step_users: 2,
            step_interval_seconds: 1,
            max_users: 8,
            think_time_ms: 0,
            spike_users: None,
            spike_hold_seconds: None,
            soak_users: None,
            soak_duration_seconds: None,
            sla_p95_ms,
            sla_p99_ms: sla_p95_ms * 2.0,
            sla_error_rate_pct: 50.0,
            sla_timeout_rate_pct: 50.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn halts_on_first_phase_that_breaches_sla() {
        let (mut scheduler, _rx) = test_scheduler();
        // Even the first phase's ~2ms-scale latency clears this floor.
        let config = stress_config(0.1);
        let run_start = Instant::now();
        let shutdown = ShutdownSender::new();
        let mut receiver = shutdown.subscribe();

        let outcome = run_stress_test(&config, &mut scheduler, run_start, 0, &mut receiver)
            .await
            .expect("stress run does not panic");

        assert_eq!(outcome.phases.len(), 1);
        let first = &outcome.phases[0];
        assert!(first.breached);
        assert_eq!(outcome.breaking_point, Some(first.target_users));
        assert_eq!(outcome.max_sustainable_load, None);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_every_phase_when_sla_never_breaches() {
        let (mut scheduler, _rx) = test_scheduler();
        // No realistic mock latency at these concurrencies clears this.
        let config = stress_config(10_000.0);
        let run_start = Instant::now();
        let shutdown = ShutdownSender::new();
        let mut receiver = shutdown.subscribe();

        let outcome = run_stress_test(&config, &mut scheduler, run_start, 0, &mut receiver)
            .await
            .expect("stress run does not panic");

        assert_eq!(outcome.breaking_point, None);
        assert_eq!(outcome.max_sustainable_load, Some(8));
        assert_eq!(outcome.phases.len(), 4);
        assert!(outcome.phases.iter().all(|phase| !phase.breached));
    }
}
