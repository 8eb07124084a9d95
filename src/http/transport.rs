use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{redirect, Client, ClientBuilder};

use crate::domain::ErrorKind;
use crate::error::HttpError;

use super::prep::PreparedRequest;

/// Default per-request timeout (§4.2).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default redirect hop cap (§4.2).
pub const DEFAULT_REDIRECT_LIMIT: u32 = 10;
/// Upper bound accepted for a caller-supplied redirect limit.
pub const MAX_REDIRECT_LIMIT: u32 = 20;
const POOL_MAX_IDLE_PER_HOST: usize = 1000;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-construction knobs exposed to the caller; everything else in
/// §4.2's client description (HTTP/2 with HTTP/1.1 fallback, pool sizing,
/// keepalive) is fixed.
#[derive(Debug, Clone, Copy)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
    pub redirect_limit: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
        }
    }
}

/// Build the shared `reqwest::Client` described in §4.2: HTTP/2 with
/// HTTP/1.1 fallback, a pooled keepalive connection budget, and a bounded
/// redirect policy.
///
/// # Errors
///
/// Returns `HttpError::RedirectLimitTooLarge` if `config.redirect_limit`
/// exceeds `MAX_REDIRECT_LIMIT`, or `HttpError::BuildClientFailed` if the
/// underlying TLS backend fails to initialize.
pub fn build_client(config: &HttpClientConfig) -> Result<Client, HttpError> {
    if config.redirect_limit > MAX_REDIRECT_LIMIT {
        return Err(HttpError::RedirectLimitTooLarge {
            value: config.redirect_limit,
            max: MAX_REDIRECT_LIMIT,
        });
    }

    let builder: ClientBuilder = Client::builder()
        .timeout(config.request_timeout)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(POOL_IDLE_TIMEOUT))
        .redirect(redirect::Policy::limited(config.redirect_limit as usize));

    builder
        .build()
        .map_err(|source| HttpError::BuildClientFailed { source })
}

/// What a transport observed for one request, before it is folded into a
/// `RequestResult` (§4.2 step 3-4). Never carries a `Result` — every
/// outcome, success or failure, is representable.
#[derive(Debug)]
pub enum TransportOutcome {
    Response { status_code: u16, bytes_received: u64 },
    Failure { kind: ErrorKind, message: String },
}

/// Seam between `HTTPExecutor` and the network (§4.2, §9): generic
/// rather than `dyn` so `HTTPExecutor<T>` stays `Send + Sync` without a
/// vtable, keeping static dispatch on the hot path. `ReqwestTransport`
/// is the only production implementation; tests substitute a
/// deterministic fake.
pub trait Transport: Send + Sync {
    fn send(&self, prepared: &PreparedRequest) -> impl Future<Output = TransportOutcome> + Send;
}

/// Production transport: issues the request over the shared pooled
/// client and drains the response body without decoding it, counting
/// bytes only.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, prepared: &PreparedRequest) -> TransportOutcome {
        let mut builder = self
            .client
            .request(prepared.method.clone(), prepared.url.clone())
            .headers(prepared.headers.clone());
        if let Some(body) = prepared.body.clone() {
            builder = builder.body(body);
        }

        match builder.send().await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                match drain_response_body(response).await {
                    Ok(bytes_received) => TransportOutcome::Response {
                        status_code,
                        bytes_received,
                    },
                    Err(source) => TransportOutcome::Failure {
                        kind: classify(&source),
                        message: source.to_string(),
                    },
                }
            }
            Err(source) => TransportOutcome::Failure {
                kind: classify(&source),
                message: source.to_string(),
            },
        }
    }
}

async fn drain_response_body(response: reqwest::Response) -> Result<u64, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        total_bytes = total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    }
    Ok(total_bytes)
}

fn classify(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_connect() {
        ErrorKind::Connection
    } else if error.is_decode() || error.is_body() {
        ErrorKind::Protocol
    } else {
        ErrorKind::Other
    }
}
