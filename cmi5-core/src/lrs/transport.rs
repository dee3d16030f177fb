//! Transport abstraction over the browser/host HTTP stack
//!
//! All LRS traffic flows through a single trait so the protocol client can
//! be exercised against a scripted mock. There is exactly one real
//! implementation; transport selection branching for legacy environments is
//! deliberately absent.

use async_trait::async_trait;
use url::Url;

use crate::error::NetworkError;

/// HTTP methods used by the cmi5 protocol operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// A single outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a body
    pub fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a header by name, case-insensitively
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Look up a query parameter by name
    pub fn query_value(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// A completed exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub body: String,
}

/// The single seam between the protocol client and the network
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange
    ///
    /// Transport-level failures (DNS, refused connection, aborted body) are
    /// [`NetworkError::Transport`]; any received response, whatever its
    /// status, is returned for the caller to classify.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError>;
}

/// The real transport, backed by reqwest
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response
            .text()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, etag, body })
    }
}
