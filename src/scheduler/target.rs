use crate::config::{LoadScenarioKind, ScenarioConfig};

/// Evaluate the load-test target-concurrency function N(t) at
/// `elapsed_seconds` (§4.5).
#[must_use]
pub fn load_target(config: &ScenarioConfig, elapsed_seconds: f64) -> u64 {
    match config.scenario {
        LoadScenarioKind::Constant => config.users,
        LoadScenarioKind::Gradual => gradual_target(config, elapsed_seconds),
        LoadScenarioKind::Spike => spike_target(config, elapsed_seconds),
    }
}

#[allow(clippy::cast_precision_loss)]
fn gradual_target(config: &ScenarioConfig, elapsed_seconds: f64) -> u64 {
    if config.ramp_up_seconds == 0 || elapsed_seconds >= config.ramp_up_seconds as f64 {
        return config.users;
    }
    let fraction = (elapsed_seconds / config.ramp_up_seconds as f64).clamp(0.0, 1.0);
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let target = (fraction * config.users as f64).round() as u64;
    target
}

/// Spike window starts at `duration/2` and runs for
/// `spike_duration_seconds` per §9/S3: it spans
/// `[duration/2, duration/2 + spike_duration_seconds)`.
#[allow(clippy::cast_precision_loss)]
fn spike_target(config: &ScenarioConfig, elapsed_seconds: f64) -> u64 {
    if config.scenario != LoadScenarioKind::Spike {
        return config.users;
    }
    let duration = config.duration_seconds as f64;
    let start = duration / 2.0;
    let end = start + config.spike_duration_seconds as f64;
    if elapsed_seconds >= start && elapsed_seconds < end {
        config.users.saturating_add(config.spike_users)
    } else {
        config.users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(scenario: LoadScenarioKind) -> ScenarioConfig {
        ScenarioConfig {
            users: 10,
            ramp_up_seconds: 20,
            duration_seconds: 60,
            iterations: 0,
            think_time_ms: 0,
            scenario,
            spike_users: 5,
            spike_duration_seconds: 10,
            sla_p95_ms: None,
            sla_p99_ms: None,
            sla_error_rate_pct: None,
        }
    }

    #[test]
    fn constant_holds_target_for_whole_duration() {
        let config = config(LoadScenarioKind::Constant);
        assert_eq!(load_target(&config, 0.0), 10);
        assert_eq!(load_target(&config, 59.0), 10);
    }

    #[test]
    fn gradual_ramps_linearly_then_holds() {
        let config = config(LoadScenarioKind::Gradual);
        assert_eq!(load_target(&config, 0.0), 0);
        assert_eq!(load_target(&config, 10.0), 5);
        assert_eq!(load_target(&config, 20.0), 10);
        assert_eq!(load_target(&config, 45.0), 10);
    }

    #[test]
    fn spike_adds_users_only_inside_window_starting_at_half_duration() {
        let config = config(LoadScenarioKind::Spike);
        // window = [duration/2, duration/2 + spike_duration) = [30, 40)
        assert_eq!(load_target(&config, 10.0), 10);
        assert_eq!(load_target(&config, 30.0), 15);
        assert_eq!(load_target(&config, 39.0), 15);
        assert_eq!(load_target(&config, 40.0), 10);
        assert_eq!(load_target(&config, 50.0), 10);
    }

    /// S3 (spec.md §8): `{users:2, duration:6, spike_users:8,
    /// spike_duration:2}` must trace 2 for `[0,3)`, 10 for `[3,5)`, 2 for
    /// `[5,6)` — this is the literal worked example the window bounds
    /// must satisfy, not just internal self-consistency.
    #[test]
    fn spike_matches_s3_worked_example_trace() {
        let config = ScenarioConfig {
            users: 2,
            ramp_up_seconds: 0,
            duration_seconds: 6,
            iterations: 0,
            think_time_ms: 0,
            scenario: LoadScenarioKind::Spike,
            spike_users: 8,
            spike_duration_seconds: 2,
            sla_p95_ms: None,
            sla_p99_ms: None,
            sla_error_rate_pct: None,
        };

        for t in [0.0, 1.0, 2.0, 2.9] {
            assert_eq!(load_target(&config, t), 2, "expected base load at t={t}");
        }
        for t in [3.0, 3.5, 4.0, 4.9] {
            assert_eq!(load_target(&config, t), 10, "expected spiked load at t={t}");
        }
        for t in [5.0, 5.5, 5.9] {
            assert_eq!(load_target(&config, t), 2, "expected base load at t={t}");
        }
    }
}
