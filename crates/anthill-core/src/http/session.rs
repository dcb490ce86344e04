//! Authenticated session shared by every service client in a run.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::transport::{Body, HttpRequest, HttpResponse, Transport};
use crate::error::{Result, ServiceError};

/// Ordered request fields with dictionary-style replacement on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Params::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing a previous value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn extend(&mut self, other: Params) {
        for (k, v) in other.0 {
            self.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Carries the transport and the bearer token for one delivery run.
///
/// The token is write-once: it is set by a successful authentication and
/// read by every later call. There is no refresh.
pub struct Session {
    transport: Arc<dyn Transport>,
    token: OnceLock<String>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            token: OnceLock::new(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.get().map(String::as_str)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.get().is_some()
    }

    /// Store the bearer token. Fails if the session already holds one.
    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        self.token.set(token.into()).map_err(|_| {
            ServiceError::InvalidRequest("session is already authenticated".to_string())
        })
    }

    /// Send a request as-is, without a token.
    ///
    /// Any status of 300 or above becomes [`ServiceError::Remote`].
    pub fn fetch(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "remote call");
        let response = self.transport.send(request)?;
        if !response.is_success() {
            return Err(ServiceError::Remote {
                code: response.status(),
                message: response.text(),
                response: Box::new(response),
            });
        }
        Ok(response)
    }

    /// GET with `params` in the query string plus the session token.
    pub fn get(&self, url: &str, params: Params) -> Result<HttpResponse> {
        let query = self.authorize(params);
        self.fetch(HttpRequest::get(url).with_query(query.into_vec()))
    }

    /// POST `form` as URL-encoded fields plus the session token.
    pub fn post(&self, url: &str, form: Params) -> Result<HttpResponse> {
        let form = self.authorize(form);
        self.fetch(HttpRequest::post(url).with_body(Body::Form(form.into_vec())))
    }

    /// PUT a raw body; `query` and the token travel in the query string.
    pub fn put(
        &self,
        url: &str,
        query: Params,
        body: Body,
        headers: Params,
    ) -> Result<HttpResponse> {
        let query = self.authorize(query);
        self.fetch(
            HttpRequest::put(url)
                .with_query(query.into_vec())
                .with_headers(headers.into_vec())
                .with_body(body),
        )
    }

    fn authorize(&self, params: Params) -> Params {
        match self.token() {
            Some(token) => {
                let mut merged = Params::new().with("access_token", token);
                merged.extend(params);
                merged
            }
            None => params,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
