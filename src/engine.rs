//! Top-level orchestration (§6): wires `RequestSource` → `Scheduler` →
//! `MetricsCollector` → `SLA evaluator` into the two entry points an
//! external CLI calls, `run_load_test` and `run_stress_test`, each
//! producing a `RunOutcome` whose `verdict` drives the process exit
//! code (0 pass / 1 SLA fail / 2 `EngineError`) — the exit-code mapping
//! itself is the external CLI's job, not this crate's.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::{EnvOverrides, ScenarioConfig, StressConfig};
use crate::domain::{Aggregate, RequestSource, StressOutcome, Verdict};
use crate::error::EngineResult;
use crate::http::{build_client, HttpClientConfig, HttpExecutor, ReqwestTransport};
use crate::metrics::spawn_consumer;
use crate::scheduler::{prepare_sequence, Scheduler};
use crate::shutdown::ShutdownReceiver;
use crate::sla::{self, Thresholds};

/// Capacity of the primary results channel every VU backpressures on
/// (§4.3, §5): sized so transient bursts do not block in steady state
/// but a stalled consumer still caps throughput rather than growing
/// memory without bound.
pub const RESULTS_CHANNEL_CAPACITY: usize = 50_000;

/// What a run produced, independent of which mode drove it (§6).
/// `verdict` is what an external CLI maps to an exit code; `detail`
/// carries the mode-specific payload a report renderer consumes.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub verdict: Verdict,
    pub detail: RunDetail,
}

/// Mode-specific payload of a `RunOutcome`.
#[derive(Debug, Clone)]
pub enum RunDetail {
    Load { aggregate: Aggregate },
    Stress(StressOutcome),
}

/// Run a fixed-shape, fixed-duration load test (§4.5) to completion and
/// evaluate its SLA against `config`'s thresholds. `config` must already
/// have passed `ScenarioConfig::validate`.
///
/// # Errors
///
/// Returns `EngineError::Http` if the shared client fails to build,
/// `EngineError::Validation` if `source`/`overrides` produce an invalid
/// request sequence, `EngineError::Scheduler` if a VU task panicked, or
/// `EngineError::Metrics` if the metrics consumer task panicked.
pub async fn run_load_test(
    config: &ScenarioConfig,
    source: &dyn RequestSource,
    overrides: &EnvOverrides,
    http_config: &HttpClientConfig,
    shutdown: &mut ShutdownReceiver,
) -> EngineResult<RunOutcome> {
    let client = build_client(http_config)?;
    let requests = prepare_sequence(source, overrides)?;

    let run_start = Instant::now();
    let run_start_ns = 0;

    let transport = ReqwestTransport::new(client);
    let executor = Arc::new(HttpExecutor::new(transport, run_start, run_start_ns));

    let (results_tx, results_rx) = tokio::sync::mpsc::channel(RESULTS_CHANNEL_CAPACITY);
    let metrics = spawn_consumer(results_rx, run_start, run_start_ns);

    let mut scheduler = Scheduler::new(
        executor,
        requests,
        config.think_time_ms,
        config.iterations,
        results_tx,
    );

    scheduler.run_scenario(config, run_start, shutdown).await?;
    let aggregate = metrics.join().await?;

    let thresholds = Thresholds::from(config);
    let verdict = sla::evaluate(&aggregate, &thresholds);
    if !verdict.pass {
        info!(violations = verdict.violations.len(), "load test finished with SLA violations");
    }

    Ok(RunOutcome {
        verdict,
        detail: RunDetail::Load { aggregate },
    })
}

/// Run a phased stress test (§4.6) to its breaking point or plan
/// exhaustion. `config` must already have passed `StressConfig::validate`.
///
/// # Errors
///
/// Returns `EngineError::Http` if the shared client fails to build,
/// `EngineError::Validation` if `source`/`overrides` produce an invalid
/// request sequence, `EngineError::Stress` if a phase's metrics consumer
/// or the final VU join observed a panic, or `EngineError::Metrics` if
/// the overall draining consumer's task panicked.
pub async fn run_stress_test(
    config: &StressConfig,
    source: &dyn RequestSource,
    overrides: &EnvOverrides,
    http_config: &HttpClientConfig,
    shutdown: &mut ShutdownReceiver,
) -> EngineResult<RunOutcome> {
    let client = build_client(http_config)?;
    let requests = prepare_sequence(source, overrides)?;

    let run_start = Instant::now();
    let run_start_ns = 0;

    let transport = ReqwestTransport::new(client);
    let executor = Arc::new(HttpExecutor::new(transport, run_start, run_start_ns));

    // The stress controller computes every phase's percentiles from its
    // own tap (§4.6), never from this channel — but every VU still
    // backpressures on it (§4.3), so something must keep draining it for
    // the lifetime of a long stress run. A plain consumer that discards
    // its final aggregate does that job; its join still surfaces a
    // panicked consumer task as a real error instead of letting VUs
    // silently deadlock on a full channel.
    let (results_tx, results_rx) = tokio::sync::mpsc::channel(RESULTS_CHANNEL_CAPACITY);
    let overall_metrics = spawn_consumer(results_rx, run_start, run_start_ns);

    let mut scheduler = Scheduler::new(executor, requests, config.think_time_ms, 0, results_tx);

    let outcome =
        crate::stress::run_stress_test(config, &mut scheduler, run_start, run_start_ns, shutdown)
            .await?;
    let _overall_aggregate = overall_metrics.join().await?;

    let verdict = outcome.phases.last().map_or_else(Verdict::passing, |phase| {
        if phase.breached {
            phase.verdict.clone()
        } else {
            Verdict::passing()
        }
    });

    Ok(RunOutcome {
        verdict,
        detail: RunDetail::Stress(outcome),
    })
}
