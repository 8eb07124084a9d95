/// Classification of a failed request, captured once at the point the
/// transport error is observed so it never needs re-parsing downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    None,
    Timeout,
    Connection,
    Protocol,
    Other,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::None => "none",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Other => "other",
        }
    }
}

/// Emitted once per attempted request by `HttpExecutor::execute`. Never
/// constructed any other way — in particular there is no `Result`-typed
/// error path; every outcome, success or failure, is a `RequestResult`.
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub request_name: String,
    /// Per-endpoint aggregation key (§4.4): `ParsedRequest::endpoint_key`
    /// carried forward from the `PreparedRequest` this result was
    /// produced from — the request name when one was authored,
    /// otherwise `"METHOD url"`.
    pub endpoint_key: String,
    pub folder_path: Vec<String>,
    pub url: String,
    pub method: &'static str,
    pub status_code: u16,
    pub elapsed_ms: f64,
    pub bytes_received: u64,
    pub ok: bool,
    pub error_kind: ErrorKind,
    pub error_message: String,
    pub started_at_ns: u64,
    pub vu_id: u64,
}

/// Cap applied to `error_message` per §4.2: short, human-readable, never
/// unbounded (avoids e.g. an entire HTML error page ending up in a log
/// line).
pub const ERROR_MESSAGE_MAX_CHARS: usize = 200;

#[must_use]
pub fn truncate_error_message(message: &str) -> String {
    if message.chars().count() <= ERROR_MESSAGE_MAX_CHARS {
        return message.to_owned();
    }
    let mut truncated: String = message.chars().take(ERROR_MESSAGE_MAX_CHARS).collect();
    truncated.push('\u{2026}');
    truncated
}

impl RequestResult {
    /// `status_code == 0 ⇒ ok == false` and `ok == true ⇒ error_kind ==
    /// none`, checked once at construction rather than trusted at every
    /// call site.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.status_code == 0 && self.ok {
            return false;
        }
        if self.ok && self.error_kind != ErrorKind::None {
            return false;
        }
        self.elapsed_ms >= 0.0
    }
}
