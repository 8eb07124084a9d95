use std::time::Instant;

use crate::domain::{truncate_error_message, ErrorKind, RequestResult};

use super::prep::PreparedRequest;
use super::transport::{ReqwestTransport, Transport, TransportOutcome};

/// Drives one request through a `Transport` and turns the outcome into a
/// `RequestResult` (§4.2). Generic over `Transport` so tests can swap in
/// a deterministic fake without touching the network; production code
/// uses the `ReqwestTransport` default.
#[derive(Debug, Clone)]
pub struct HttpExecutor<T: Transport = ReqwestTransport> {
    transport: T,
    run_start: Instant,
    run_start_ns: u64,
}

impl<T: Transport> HttpExecutor<T> {
    #[must_use]
    pub const fn new(transport: T, run_start: Instant, run_start_ns: u64) -> Self {
        Self {
            transport,
            run_start,
            run_start_ns,
        }
    }

    /// Issue `prepared` and return a `RequestResult`. Never fails:
    /// transport errors are classified into `error_kind` data rather than
    /// propagated (§4.2 step 6, §7).
    pub async fn execute(&self, prepared: &PreparedRequest, vu_id: u64) -> RequestResult {
        let started_at = Instant::now();
        #[allow(clippy::cast_possible_truncation)]
        let started_at_ns = self
            .run_start_ns
            .saturating_add(started_at.saturating_duration_since(self.run_start).as_nanos() as u64);

        let outcome = self.transport.send(prepared).await;
        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;

        let (status_code, bytes_received, ok, error_kind, error_message) = match outcome {
            TransportOutcome::Response {
                status_code,
                bytes_received,
            } => {
                let ok = (200..400).contains(&status_code);
                (status_code, bytes_received, ok, ErrorKind::None, String::new())
            }
            TransportOutcome::Failure { kind, message } => {
                (0, 0, false, kind, truncate_error_message(&message))
            }
        };

        RequestResult {
            request_name: prepared.name.clone(),
            endpoint_key: prepared.endpoint_key.clone(),
            folder_path: prepared.folder_path.clone(),
            url: prepared.url.to_string(),
            method: method_as_str(&prepared.method),
            status_code,
            elapsed_ms,
            bytes_received,
            ok,
            error_kind,
            error_message,
            started_at_ns,
            vu_id,
        }
    }
}

const fn method_as_str(method: &reqwest::Method) -> &'static str {
    match *method {
        reqwest::Method::GET => "GET",
        reqwest::Method::POST => "POST",
        reqwest::Method::PUT => "PUT",
        reqwest::Method::PATCH => "PATCH",
        reqwest::Method::DELETE => "DELETE",
        reqwest::Method::HEAD => "HEAD",
        reqwest::Method::OPTIONS => "OPTIONS",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::config::EnvOverrides;
    use crate::domain::ParsedRequest;
    use crate::http::prep::prepare;

    #[derive(Clone)]
    struct ScriptedTransport {
        calls: Arc<AtomicU64>,
        outcome: fn() -> TransportOutcome,
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, _prepared: &PreparedRequest) -> TransportOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn prepared(url: &str) -> PreparedRequest {
        let req = ParsedRequest::manual(url);
        prepare(&req, &EnvOverrides::default()).expect("valid url")
    }

    #[tokio::test]
    async fn successful_response_is_ok_and_carries_status() {
        let transport = ScriptedTransport {
            calls: Arc::new(AtomicU64::new(0)),
            outcome: || TransportOutcome::Response {
                status_code: 200,
                bytes_received: 42,
            },
        };
        let executor = HttpExecutor::new(transport, Instant::now(), 0);
        let result = executor.execute(&prepared("http://localhost/ping"), 1).await;

        assert!(result.ok);
        assert_eq!(result.status_code, 200);
        assert_eq!(result.bytes_received, 42);
        assert_eq!(result.error_kind, ErrorKind::None);
        assert!(result.is_consistent());
    }

    #[tokio::test]
    async fn server_error_status_is_not_ok_but_has_no_error_kind() {
        let transport = ScriptedTransport {
            calls: Arc::new(AtomicU64::new(0)),
            outcome: || TransportOutcome::Response {
                status_code: 503,
                bytes_received: 0,
            },
        };
        let executor = HttpExecutor::new(transport, Instant::now(), 0);
        let result = executor.execute(&prepared("http://localhost/ping"), 1).await;

        assert!(!result.ok);
        assert_eq!(result.status_code, 503);
        assert_eq!(result.error_kind, ErrorKind::None);
    }

    #[tokio::test]
    async fn transport_failure_yields_zero_status_and_classified_kind() {
        let transport = ScriptedTransport {
            calls: Arc::new(AtomicU64::new(0)),
            outcome: || TransportOutcome::Failure {
                kind: ErrorKind::Timeout,
                message: "deadline exceeded".to_owned(),
            },
        };
        let executor = HttpExecutor::new(transport, Instant::now(), 0);
        let result = executor.execute(&prepared("http://localhost/ping"), 1).await;

        assert!(!result.ok);
        assert_eq!(result.status_code, 0);
        assert_eq!(result.error_kind, ErrorKind::Timeout);
        assert!(result.is_consistent());
    }

    #[tokio::test]
    async fn never_skips_stamping_started_at() {
        let transport = ScriptedTransport {
            calls: Arc::new(AtomicU64::new(0)),
            outcome: || TransportOutcome::Response {
                status_code: 200,
                bytes_received: 1,
            },
        };
        let run_start = Instant::now();
        let executor = HttpExecutor::new(transport, run_start, 1_000);
        let result = executor.execute(&prepared("http://localhost/ping"), 7).await;
        assert!(result.started_at_ns >= 1_000);
        assert_eq!(result.vu_id, 7);
    }
}
