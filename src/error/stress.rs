use thiserror::Error;

use super::MetricsError;

pub type StressResult<T> = Result<T, StressError>;

#[derive(Debug, Error)]
pub enum StressError {
    #[error("per-phase metrics consumer failed: {0}")]
    PhaseMetrics(#[from] MetricsError),
    #[error("vu task panicked or was cancelled while driving a stress phase: {source}")]
    VuJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}
