//! Blocking request/response primitives.
//!
//! The delivery engine only needs status codes, headers and bodies, so the
//! wire is hidden behind [`Transport`]. Production code uses
//! [`ReqwestTransport`](super::ReqwestTransport); tests script responses.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        };
        f.write_str(s)
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Raw bytes streamed from a local file.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query or form field by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        let form: &[(String, String)] = match &self.body {
            Some(Body::Form(fields)) => fields.as_slice(),
            _ => &[],
        };
        self.query
            .iter()
            .chain(form.iter())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A received response. Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status < 300
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse JSON response: {e}"))
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No response was received (refused, DNS, timeout, TLS).
    #[error("{0}")]
    Connection(String),

    /// The HTTP client itself could not be constructed.
    #[error("failed to initialize HTTP client: {0}")]
    Setup(String),

    /// The request was rejected before it reached the network (bad URL, header).
    #[error("invalid request: {0}")]
    Request(String),

    #[error("failed to read request body {path}: {source}")]
    Body {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<TransportError> for ServiceError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Connection(message) => ServiceError::Connection(message),
            TransportError::Setup(message) => ServiceError::Connection(message),
            TransportError::Request(message) => ServiceError::InvalidRequest(message),
            TransportError::Body { path, source } => ServiceError::Body { path, source },
        }
    }
}

/// Sends one request and blocks until the response arrives.
///
/// Implementations return every received response, whatever its status;
/// status interpretation belongs to the session.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
