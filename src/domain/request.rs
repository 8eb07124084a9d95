use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// HTTP method of a `ParsedRequest`. Only the methods a Postman v2.1
/// collection or a manual single-URL run can produce are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

/// A request body as carried by a `ParsedRequest`, before `RequestPrep`
/// has encoded it to bytes. `None` for bodyless requests (GET, most
/// manual runs).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody {
    Raw(String),
    Form(BTreeMap<String, String>),
}

/// An immutable request template, produced by an external collection
/// loader (Postman v2.1) or a single-URL manual run. Everything here is
/// set once at parse time and never mutated for the lifetime of a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParsedRequest {
    pub name: String,
    pub folder_path: Vec<String>,
    pub method: HttpMethod,
    pub url: String,
    /// Ordered, case-insensitively-keyed header pairs as authored; case
    /// folding happens in `RequestPrep`, not here.
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub query_params: Vec<(String, String)>,
}

impl ParsedRequest {
    /// Build the single `ParsedRequest` a manual (non-collection) run
    /// produces: `method=GET`, no body, `name="manual"`.
    #[must_use]
    pub fn manual(url: impl Into<String>) -> Self {
        Self {
            name: "manual".to_owned(),
            folder_path: Vec::new(),
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            query_params: Vec::new(),
        }
    }

    /// Stable identity for cache keying — the full folder path joined
    /// with the request name distinguishes same-named requests that live
    /// in different Postman folders.
    #[must_use]
    pub fn identity(&self) -> String {
        let mut id = self.folder_path.join("/");
        if !id.is_empty() {
            id.push('/');
        }
        id.push_str(&self.name);
        id
    }

    /// Key used for per-endpoint aggregation: the request name when one
    /// was authored, otherwise `(method, url)`.
    #[must_use]
    pub fn endpoint_key(&self) -> String {
        if self.name.is_empty() || self.name == "manual" {
            format!("{} {}", self.method.as_str(), self.url)
        } else {
            self.name.clone()
        }
    }
}

/// A source of requests a VU iterates over in order: either a single
/// manual request or an ordered Postman-folder sequence. The collection
/// parser that produces a `SequenceRequestSource` lives outside this
/// crate; both implementations here are plain in-memory lists.
pub trait RequestSource: Send + Sync {
    fn requests(&self) -> &[ParsedRequest];
}

#[derive(Debug, Clone)]
pub struct ManualRequestSource {
    request: [ParsedRequest; 1],
}

impl ManualRequestSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            request: [ParsedRequest::manual(url)],
        }
    }
}

impl RequestSource for ManualRequestSource {
    fn requests(&self) -> &[ParsedRequest] {
        &self.request
    }
}

#[derive(Debug, Clone)]
pub struct SequenceRequestSource {
    requests: Vec<ParsedRequest>,
}

impl SequenceRequestSource {
    #[must_use]
    pub fn new(requests: Vec<ParsedRequest>) -> Self {
        Self { requests }
    }
}

impl RequestSource for SequenceRequestSource {
    fn requests(&self) -> &[ParsedRequest] {
        &self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_request_has_no_body_and_is_get() {
        let req = ParsedRequest::manual("http://localhost/ping");
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.body.is_none());
        assert_eq!(req.name, "manual");
    }

    #[test]
    fn identity_joins_folder_and_name() {
        let req = ParsedRequest {
            folder_path: vec!["auth".to_owned(), "login".to_owned()],
            ..ParsedRequest::manual("http://localhost")
        };
        assert_eq!(req.identity(), "auth/login/manual");
    }

    #[test]
    fn endpoint_key_prefers_name_over_method_url() {
        let named = ParsedRequest {
            name: "Login".to_owned(),
            ..ParsedRequest::manual("http://localhost/login")
        };
        assert_eq!(named.endpoint_key(), "Login");

        let manual = ParsedRequest::manual("http://localhost/login");
        assert_eq!(manual.endpoint_key(), "GET http://localhost/login");
    }
}
