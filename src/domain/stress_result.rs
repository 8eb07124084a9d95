use std::time::Duration;

use super::{Aggregate, Verdict};

/// One phase of a stress run (§3, §4.6): the scheduler held `target_users`
/// for (up to) `duration`; `aggregate` is the phase-window aggregate
/// (counters diffed from phase start, percentiles from a fresh per-phase
/// digest); `breached` is true exactly when this phase is the breaking
/// point.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    pub phase_index: usize,
    pub target_users: u64,
    pub reached_users: u64,
    pub duration: Duration,
    pub aggregate: Aggregate,
    pub verdict: Verdict,
    pub breached: bool,
}

/// Full result of a stress run (§4.6, §6): every phase that ran, plus
/// the two headline numbers derived from them. `breaking_point` is
/// `None` when every planned phase passed its SLA check — the ramp
/// simply ran out of phases (`target > max_users`) before anything
/// broke. `max_sustainable_load` is `None` only when the very first
/// phase breached, so no target was ever sustained for a full window.
#[derive(Debug, Clone)]
pub struct StressOutcome {
    pub phases: Vec<PhaseResult>,
    pub breaking_point: Option<u64>,
    pub max_sustainable_load: Option<u64>,
}
