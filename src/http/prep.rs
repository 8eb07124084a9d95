use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use crate::config::EnvOverrides;
use crate::domain::{HttpMethod, ParsedRequest, RequestBody};
use crate::error::ValidationError;

/// The normalized, fully-resolved form of a `ParsedRequest`: headers and
/// body computed once and cached for the lifetime of the run (§4.1).
/// `HTTPExecutor::execute` only ever reads from this; it never touches
/// `ParsedRequest` again.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub endpoint_key: String,
    pub folder_path: Vec<String>,
    pub name: String,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

const fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

/// Substitute `{{key}}` tokens against `overrides`. Literal replacement;
/// a token with no binding is left exactly as authored (§4.1 — policy,
/// not an error).
#[must_use]
pub fn substitute_vars(template: &str, overrides: &EnvOverrides) -> String {
    if !template.contains("{{") {
        return template.to_owned();
    }
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}") else {
            out.push_str(rest);
            rest = "";
            break;
        };
        out.push_str(&rest[..start]);
        let key = rest[start + 2..start + end].trim();
        match overrides.get(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &rest[start + end + 2..];
    }
    out.push_str(rest);
    out
}

/// Normalize one `ParsedRequest` into a `PreparedRequest`, substituting
/// `{{var}}` tokens in the URL, header values, and any raw/form body
/// against `overrides` (§4.1). Performs no network I/O.
///
/// # Errors
///
/// Returns `ValidationError::InvalidUrl` if the substituted URL does not
/// parse.
pub fn prepare(req: &ParsedRequest, overrides: &EnvOverrides) -> Result<PreparedRequest, ValidationError> {
    let substituted_url = substitute_vars(&req.url, overrides);
    let url = Url::parse(&substituted_url).map_err(|source| ValidationError::InvalidUrl {
        url: substituted_url.clone(),
        source,
    })?;

    let mut headers = HeaderMap::with_capacity(req.headers.len());
    for (key, value) in &req.headers {
        let Ok(name) = HeaderName::try_from(key.as_str()) else {
            continue;
        };
        let substituted = substitute_vars(value, overrides);
        let Ok(header_value) = HeaderValue::from_str(&substituted) else {
            continue;
        };
        headers.insert(name, header_value);
    }

    let body = req.body.as_ref().map(|body| encode_body(body, overrides, &mut headers));

    Ok(PreparedRequest {
        endpoint_key: req.endpoint_key(),
        folder_path: req.folder_path.clone(),
        name: req.name.clone(),
        method: reqwest_method(req.method),
        url,
        headers,
        body,
    })
}

fn encode_body(body: &RequestBody, overrides: &EnvOverrides, headers: &mut HeaderMap) -> Bytes {
    match body {
        RequestBody::Raw(text) => Bytes::from(substitute_vars(text, overrides).into_bytes()),
        RequestBody::Form(fields) => {
            let encoded = encode_form(fields, overrides);
            if !headers.contains_key(reqwest::header::CONTENT_TYPE) {
                headers.insert(
                    reqwest::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
            }
            Bytes::from(encoded.into_bytes())
        }
    }
}

fn encode_form(fields: &BTreeMap<String, String>, overrides: &EnvOverrides) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, &substitute_vars(value, overrides));
    }
    serializer.finish()
}
