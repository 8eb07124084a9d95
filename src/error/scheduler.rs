use thiserror::Error;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler tick task panicked or was cancelled: {source}")]
    TickJoin {
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("vu task panicked or was cancelled: {source}")]
    VuJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}
