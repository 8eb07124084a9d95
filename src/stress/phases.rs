use std::time::Duration;

use crate::config::{StressConfig, StressScenarioKind};

/// One planned phase, before it has been run: a target concurrency held
/// for a fixed duration (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PhaseSpec {
    pub(super) target_users: u64,
    pub(super) duration: Duration,
}

/// Derive the full phase sequence for `config` (§4.6). This is a plan,
/// not a guarantee every phase will run — the controller halts the
/// sequence early on the first SLA breach.
pub(super) fn phase_plan(config: &StressConfig) -> Vec<PhaseSpec> {
    match config.scenario {
        StressScenarioKind::LinearOverload => linear_overload_plan(config),
        StressScenarioKind::SpikeStress => spike_stress_plan(config),
        StressScenarioKind::SoakStress => {
            let mut plan = soak_plan(config);
            plan.extend(linear_overload_plan(config));
            plan
        }
    }
}

/// Phase `k` targets `initial_users + k * step_users`, each held for
/// `step_interval_seconds`; the plan stops once a target would exceed
/// `max_users` (§4.6: "stop when target > max_users or SLA breached" —
/// the SLA half of that is the controller's job, not the plan's).
fn linear_overload_plan(config: &StressConfig) -> Vec<PhaseSpec> {
    let duration = Duration::from_secs(config.step_interval_seconds);
    let mut plan = Vec::new();
    let mut target = config.initial_users;
    while target <= config.max_users {
        plan.push(PhaseSpec {
            target_users: target,
            duration,
        });
        target = target.saturating_add(config.step_users);
    }
    plan
}

/// A single phase at `spike_users` held for `spike_hold_seconds`.
/// `StressConfig::validate` guarantees both are present and positive
/// before a `spike_stress` run reaches this plan.
fn spike_stress_plan(config: &StressConfig) -> Vec<PhaseSpec> {
    let target = config.spike_users.unwrap_or(config.initial_users);
    let duration = Duration::from_secs(config.spike_hold_seconds.unwrap_or(config.step_interval_seconds));
    vec![PhaseSpec {
        target_users: target,
        duration,
    }]
}

/// A single soak phase at `soak_users` held for `soak_duration_seconds`,
/// prepended ahead of the linear-overload ramp (§4.6).
fn soak_plan(config: &StressConfig) -> Vec<PhaseSpec> {
    let target = config.soak_users.unwrap_or(config.initial_users);
    let duration = Duration::from_secs(config.soak_duration_seconds.unwrap_or(config.step_interval_seconds));
    vec![PhaseSpec {
        target_users: target,
        duration,
    }]
}
