//! HTTP transport for REST-speaking engines
//!
//! Adapters talk JSON over [`HttpTransport`]. The production implementation
//! is [`UreqTransport`]; tests swap in
//! [`RecordingTransport`](crate::testing::RecordingTransport).
//!
//! Non-2xx statuses are returned as responses, not errors, so each adapter
//! decides what a 404 or 409 means for it. Only transport-level failures
//! (connection refused, timeout, unreadable body) become
//! [`VdbError::BackendUnavailable`].

use serde_json::Value as JsonValue;
use std::time::Duration;
use strata_vdb_core::{VdbError, VdbResult};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Status plus decoded body
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body; a non-JSON body is kept as a JSON string, an empty one as `None`
    pub body: Option<JsonValue>,
}

impl HttpResponse {
    /// Response with a JSON body
    pub fn json(status: u16, body: JsonValue) -> Self {
        HttpResponse {
            status,
            body: Some(body),
        }
    }

    /// Response without a body
    pub fn empty(status: u16) -> Self {
        HttpResponse { status, body: None }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 404
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Body of a successful response, or `BackendRejected`
    pub fn into_success(self, backend: &str) -> VdbResult<Option<JsonValue>> {
        if self.is_success() {
            return Ok(self.body);
        }
        let message = match self.body {
            Some(JsonValue::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Err(VdbError::BackendRejected {
            backend: backend.to_string(),
            status: self.status,
            message,
        })
    }
}

/// JSON request/response channel to one engine
pub trait HttpTransport: Send + Sync {
    /// Send `body` (if any) to `path`, relative to the engine's base URL
    fn request(&self, method: Method, path: &str, body: Option<&JsonValue>)
        -> VdbResult<HttpResponse>;
}

/// Blocking HTTP transport over `ureq`
///
/// Building one does no I/O; the first request opens the connection.
pub struct UreqTransport {
    backend: String,
    base_url: String,
    headers: Vec<(String, String)>,
    agent: ureq::Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values may carry credentials
        f.debug_struct("UreqTransport")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl UreqTransport {
    /// Transport for `backend` rooted at `base_url`
    pub fn new(backend: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        UreqTransport {
            backend: backend.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: Vec::new(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Builder: send a header with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn decorate<B>(&self, mut request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request.header("Accept", "application/json")
    }

    fn unavailable(&self, message: impl std::fmt::Display) -> VdbError {
        VdbError::unavailable(&self.backend, message.to_string())
    }
}

impl HttpTransport for UreqTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> VdbResult<HttpResponse> {
        let url = format!("{}{}", self.base_url, path);
        let payload = body.map(serde_json::to_vec).transpose()?;

        tracing::debug!(
            target: "strata::vdb::http",
            backend = %self.backend,
            method = method.as_str(),
            path = %path,
            "Sending request"
        );

        let result = match (method, payload) {
            (Method::Get, _) => self.decorate(self.agent.get(&url)).call(),
            (Method::Delete, _) => self.decorate(self.agent.delete(&url)).call(),
            (Method::Post, payload) => self
                .decorate(self.agent.post(&url))
                .header("Content-Type", "application/json")
                .send(&payload.unwrap_or_else(|| b"{}".to_vec())[..]),
            (Method::Put, payload) => self
                .decorate(self.agent.put(&url))
                .header("Content-Type", "application/json")
                .send(&payload.unwrap_or_else(|| b"{}".to_vec())[..]),
        };
        let mut response = result.map_err(|e| self.unavailable(e))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.unavailable(format!("failed to read response: {}", e)))?;

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(JsonValue::String(text)))
        };
        Ok(HttpResponse { status, body })
    }
}
