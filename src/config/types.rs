use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// `KEY=VALUE` substitutions applied during `RequestPrep`. Substitution
/// is literal token replacement (`{{KEY}}` → `VALUE`); a token with no
/// binding is left as-is, per §4.1 — that is policy, not an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EnvOverrides(pub BTreeMap<String, String>);

impl EnvOverrides {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Shape of the target-concurrency function `N(t)` for a load test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadScenarioKind {
    Constant,
    Gradual,
    Spike,
}

/// `{users, ramp_up_seconds, duration_seconds, iterations, think_time_ms,
/// scenario, spike_users, spike_duration_seconds, sla_*}` — see §6.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub users: u64,
    #[serde(default)]
    pub ramp_up_seconds: u64,
    pub duration_seconds: u64,
    #[serde(default)]
    pub iterations: u64,
    #[serde(default)]
    pub think_time_ms: u64,
    pub scenario: LoadScenarioKind,
    #[serde(default)]
    pub spike_users: u64,
    #[serde(default)]
    pub spike_duration_seconds: u64,
    pub sla_p95_ms: Option<f64>,
    pub sla_p99_ms: Option<f64>,
    pub sla_error_rate_pct: Option<f64>,
}

impl ScenarioConfig {
    /// Validates the invariants §6/§9 describe before a run starts.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` describing the first invariant that
    /// does not hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.users < 1 {
            return Err(ValidationError::UsersTooSmall { value: self.users });
        }
        if self.duration_seconds < 1 {
            return Err(ValidationError::DurationTooSmall {
                value: self.duration_seconds,
            });
        }
        if self.ramp_up_seconds > self.duration_seconds {
            return Err(ValidationError::RampUpExceedsDuration {
                ramp_up: self.ramp_up_seconds,
                duration: self.duration_seconds,
            });
        }
        if self.scenario == LoadScenarioKind::Spike {
            if self.spike_duration_seconds == 0 {
                return Err(ValidationError::SpikeDurationZero);
            }
            // The spike window starts at duration/2 and runs for
            // spike_duration_seconds (§9, S3): it spans
            // [duration/2, duration/2 + spike_duration_seconds) and must
            // fit inside [0, duration].
            let half_duration = self.duration_seconds / 2;
            if half_duration + self.spike_duration_seconds > self.duration_seconds {
                return Err(ValidationError::SpikeWindowExceedsDuration {
                    spike_duration: self.spike_duration_seconds,
                    duration: self.duration_seconds,
                });
            }
        }
        Ok(())
    }
}

/// Shape of the phase sequence for a stress test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StressScenarioKind {
    LinearOverload,
    SpikeStress,
    SoakStress,
}

/// `{scenario, initial_users, step_users, step_interval_seconds,
/// max_users, think_time_ms, spike_*, soak_*, sla_*}` — see §6.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StressConfig {
    pub scenario: StressScenarioKind,
    pub initial_users: u64,
    pub step_users: u64,
    pub step_interval_seconds: u64,
    pub max_users: u64,
    #[serde(default)]
    pub think_time_ms: u64,
    pub spike_users: Option<u64>,
    pub spike_hold_seconds: Option<u64>,
    pub soak_users: Option<u64>,
    pub soak_duration_seconds: Option<u64>,
    pub sla_p95_ms: f64,
    pub sla_p99_ms: f64,
    pub sla_error_rate_pct: f64,
    pub sla_timeout_rate_pct: f64,
}

impl StressConfig {
    /// # Errors
    ///
    /// Returns a `ValidationError` describing the first invariant that
    /// does not hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.initial_users < 1 {
            return Err(ValidationError::InitialUsersTooSmall {
                value: self.initial_users,
            });
        }
        if self.step_users < 1 {
            return Err(ValidationError::StepUsersTooSmall {
                value: self.step_users,
            });
        }
        if self.step_interval_seconds < 1 {
            return Err(ValidationError::StepIntervalTooSmall {
                value: self.step_interval_seconds,
            });
        }
        if self.max_users < self.initial_users {
            return Err(ValidationError::MaxUsersBelowInitial {
                max_users: self.max_users,
                initial_users: self.initial_users,
            });
        }
        match self.scenario {
            StressScenarioKind::SoakStress => {
                let soak_ok = self.soak_users.is_some_and(|value| value > 0)
                    && self.soak_duration_seconds.is_some_and(|value| value > 0);
                if !soak_ok {
                    return Err(ValidationError::SoakParamsMissing);
                }
            }
            StressScenarioKind::SpikeStress => {
                let spike_ok = self.spike_users.is_some_and(|value| value > 0)
                    && self.spike_hold_seconds.is_some_and(|value| value > 0);
                if !spike_ok {
                    return Err(ValidationError::SpikeStressParamsMissing);
                }
            }
            StressScenarioKind::LinearOverload => {}
        }
        Ok(())
    }
}
