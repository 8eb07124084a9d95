use thiserror::Error;

/// Failures that can occur while building the shared HTTP client or a
/// request template. Transport failures during `execute()` are never
/// represented here — they are classified into `RequestResult.error_kind`
/// (see `crate::domain::ErrorKind`) and never propagate as errors.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("redirect_limit must be <= {max}, got {value}")]
    RedirectLimitTooLarge { value: u32, max: u32 },
}
