//! Mock transport for testing
//!
//! MockTransport allows scripting LRS responses for unit tests, enabling
//! fast, deterministic testing of session logic. Queue responses before
//! driving an operation; every executed request is recorded for
//! assertion.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::NetworkError;

/// Scriptable [`Transport`] implementation
///
/// Each `execute` consumes one queued response, in FIFO order. Running out
/// of queued responses fails the request, which keeps a test honest about
/// how many exchanges an operation performs.
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, NetworkError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response with the given status and body
    pub fn queue_response(&self, status: u16, body: &str) {
        self.queue(Ok(HttpResponse {
            status,
            etag: None,
            body: body.to_string(),
        }));
    }

    /// Queue a response carrying an ETag header
    pub fn queue_response_with_etag(&self, status: u16, body: &str, etag: &str) {
        self.queue(Ok(HttpResponse {
            status,
            etag: Some(etag.to_string()),
            body: body.to_string(),
        }));
    }

    /// Queue a transport-level failure
    pub fn queue_transport_error(&self, message: &str) {
        self.queue(Err(NetworkError::Transport(message.to_string())));
    }

    fn queue(&self, response: Result<HttpResponse, NetworkError>) {
        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .push_back(response);
    }

    /// All requests executed so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("mock request log poisoned")
            .clone()
    }

    /// Number of requests executed so far
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .expect("mock request log poisoned")
            .len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        self.requests
            .lock()
            .expect("mock request log poisoned")
            .push(request);

        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(NetworkError::Transport(
                    "no queued response in MockTransport".to_string(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrs::transport::Method;
    use url::Url;

    fn request() -> HttpRequest {
        HttpRequest::new(Method::Get, Url::parse("https://lrs.example.com/x").unwrap())
    }

    #[tokio::test]
    async fn responses_are_consumed_in_order() {
        let transport = MockTransport::new();
        transport.queue_response(200, "first");
        transport.queue_response(404, "second");

        let first = transport.execute(request()).await.unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(first.body, "first");

        let second = transport.execute(request()).await.unwrap();
        assert_eq!(second.status, 404);
    }

    #[tokio::test]
    async fn empty_queue_is_a_transport_error() {
        let transport = MockTransport::new();
        let err = transport.execute(request()).await.unwrap_err();
        assert!(err.to_string().contains("no queued response"));
    }

    #[tokio::test]
    async fn requests_are_recorded() {
        let transport = MockTransport::new();
        transport.queue_response(204, "");
        transport.execute(request()).await.unwrap();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].method, Method::Get);
    }
}
