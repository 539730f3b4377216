//! In-process fakes for adapter tests
//!
//! [`RecordingTransport`] replays scripted responses keyed by method and path
//! and records every request it receives, so adapter tests can assert both
//! what was sent and how responses are interpreted.

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use strata_vdb_core::{VdbError, VdbResult};

use crate::transport::{HttpResponse, HttpTransport, Method};

/// One request seen by the fake
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Method
    pub method: Method,
    /// Path (including query string)
    pub path: String,
    /// JSON body, if any
    pub body: Option<JsonValue>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

/// Scripted HTTP fake
///
/// Responses queued for the same route are served in order; the last one
/// repeats. Unscripted routes answer 404.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl RecordingTransport {
    /// Create an empty fake
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    /// Queue a JSON response for `method path`
    pub fn respond(&self, method: Method, path: &str, status: u16, body: JsonValue) -> &Self {
        self.push(method, path, Scripted::Respond(HttpResponse::json(status, body)));
        self
    }

    /// Queue a body-less response for `method path`
    pub fn respond_empty(&self, method: Method, path: &str, status: u16) -> &Self {
        self.push(method, path, Scripted::Respond(HttpResponse::empty(status)));
        self
    }

    /// Queue a transport failure for `method path`
    pub fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Scripted::Fail(message.to_string()));
        self
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Requests received for `method path`
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Number of requests received for `method path`
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    /// Body of the most recent request to `method path`
    pub fn last_body(&self, method: Method, path: &str) -> Option<JsonValue> {
        self.requests_to(method, path)
            .pop()
            .and_then(|r| r.body)
    }
}

impl HttpTransport for RecordingTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> VdbResult<HttpResponse> {
        self.requests.lock().push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let scripted = {
            let mut routes = self.routes.lock();
            match routes.get_mut(&(method, path.to_string())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(VdbError::unavailable("fake", message)),
            None => Ok(HttpResponse::empty(404)),
        }
    }
}
