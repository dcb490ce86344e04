//! [`Transport`] backed by reqwest.

use std::time::Duration;

use super::transport::{Body, HttpRequest, HttpResponse, Method, Transport, TransportError};

/// Settings for the production transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub user_agent: String,
    /// Per-request timeout; `None` keeps the client default (no timeout).
    pub timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("anthill/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
        }
    }
}

/// Blocking transport: each call is driven to completion on a private runtime.
pub struct ReqwestTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Setup(format!("Failed to create tokio runtime: {e}")))?;

        Ok(Self { client, runtime })
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(Body::Form(fields)) => builder.form(&fields),
            Some(Body::Bytes(bytes)) => builder.body(bytes),
            Some(Body::File(path)) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|source| TransportError::Body { path, source })?;
                builder.body(reqwest::Body::from(file))
            }
            None => builder,
        };

        let response = builder.send().await.map_err(send_error)?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let mut result = HttpResponse::new(status, body.to_vec());
        for (name, value) in headers {
            result = result.with_header(&name, value);
        }
        Ok(result)
    }
}

/// Only failures on the wire count as connection failures.
fn send_error(e: reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::trace!(method = %request.method, url = %request.url, "sending request");
        self.runtime.block_on(self.execute(request))
    }
}
