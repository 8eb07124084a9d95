use thiserror::Error;

use super::{HttpError, MetricsError, SchedulerError, StressError, ValidationError};

/// Startup- and run-level failures the engine surfaces to its caller.
///
/// Transport errors (timeouts, connection resets, protocol errors) are
/// *data*, carried on `RequestResult`, and never reach this type — see
/// §7 of the design notes. `EngineError` is reserved for configuration
/// mistakes made before a run starts and for fatal failures of the
/// scheduling/aggregation machinery itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("http error: {0}")]
    Http(#[from] HttpError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("stress error: {0}")]
    Stress(#[from] StressError),
}

pub type EngineResult<T> = Result<T, EngineError>;
