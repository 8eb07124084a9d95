use thiserror::Error;

/// Errors surfaced before a run starts: a malformed `ScenarioConfig` or
/// `StressConfig`. These never occur once a run is in flight.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("users must be >= 1, got {value}")]
    UsersTooSmall { value: u64 },
    #[error("duration_seconds must be >= 1, got {value}")]
    DurationTooSmall { value: u64 },
    #[error("ramp_up_seconds ({ramp_up}) must not exceed duration_seconds ({duration})")]
    RampUpExceedsDuration { ramp_up: u64, duration: u64 },
    #[error("spike scenario requires spike_duration_seconds > 0")]
    SpikeDurationZero,
    #[error("spike window (starting at duration/2, width {spike_duration}) exceeds duration_seconds ({duration})")]
    SpikeWindowExceedsDuration { spike_duration: u64, duration: u64 },
    #[error("initial_users must be >= 1, got {value}")]
    InitialUsersTooSmall { value: u64 },
    #[error("step_users must be >= 1, got {value}")]
    StepUsersTooSmall { value: u64 },
    #[error("step_interval_seconds must be >= 1, got {value}")]
    StepIntervalTooSmall { value: u64 },
    #[error("max_users ({max_users}) must be >= initial_users ({initial_users})")]
    MaxUsersBelowInitial { max_users: u64, initial_users: u64 },
    #[error("soak_stress requires soak_users > 0 and soak_duration_seconds > 0")]
    SoakParamsMissing,
    #[error("spike_stress requires spike_users > 0 and spike_hold_seconds > 0")]
    SpikeStressParamsMissing,
    #[error("request sequence must not be empty")]
    EmptyRequestSequence,
    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
