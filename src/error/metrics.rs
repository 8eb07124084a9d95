use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics consumer task panicked or was cancelled: {source}")]
    ConsumerJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}
