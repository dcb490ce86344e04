//! Admin service RPC: every backend action is addressed by
//! `service + action + context (+ method)`.
//!
//! Mutations may answer with an `X-Api-Context` header holding a JSON object
//! of identifiers the caller needs next (a new data version, a new bundle).
//! [`ApiResponse`] exposes that side channel next to the payload.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{Service, ServiceLocation, ids};
use crate::error::{Result, ServiceError};
use crate::http::{Body, HttpResponse, Params, Session};

/// Response header carrying side-channel identifiers.
pub const CONTEXT_HEADER: &str = "X-Api-Context";

/// Upload statuses meaning "already handled" rather than failure.
pub const ALREADY_HANDLED: [u16; 2] = [444, 244];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminClient {
    location: ServiceLocation,
}

/// Payload plus the parsed `X-Api-Context` object, when present and valid.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub response: HttpResponse,
    pub context: Option<Map<String, Value>>,
}

impl ApiResponse {
    pub fn from_response(response: HttpResponse) -> Self {
        let context = response
            .header(CONTEXT_HEADER)
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok());
        Self { response, context }
    }

    /// Identifier from the side channel, rendered as a string.
    pub fn context_id(&self, key: &str) -> Option<String> {
        match self.context.as_ref()?.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        self.response.json()
    }
}

/// Result of an upload.
#[derive(Debug, Clone)]
pub enum PutOutcome {
    Completed(ApiResponse),
    /// The backend reported one of [`ALREADY_HANDLED`].
    AlreadyHandled { code: u16, response: ApiResponse },
}

impl PutOutcome {
    pub fn response(&self) -> &ApiResponse {
        match self {
            PutOutcome::Completed(response) => response,
            PutOutcome::AlreadyHandled { response, .. } => response,
        }
    }

    pub fn is_already_handled(&self) -> bool {
        matches!(self, PutOutcome::AlreadyHandled { .. })
    }
}

impl AdminClient {
    pub fn new(location: ServiceLocation) -> Self {
        Self { location }
    }

    /// Read an action's current state.
    pub fn api_get(
        &self,
        session: &Session,
        service: &str,
        action: &str,
        context: &Value,
    ) -> Result<ApiResponse> {
        let params = Params::new()
            .with("service", service)
            .with("context", context.to_string())
            .with("action", action);
        self.get(session, "api", params).map(ApiResponse::from_response)
    }

    /// Invoke `method` on an action. `data` fields are merged last.
    pub fn api_post(
        &self,
        session: &Session,
        service: &str,
        action: &str,
        method: &str,
        context: &Value,
        data: Params,
    ) -> Result<ApiResponse> {
        let mut form = Params::new()
            .with("service", service)
            .with("method", method)
            .with("context", context.to_string())
            .with("action", action);
        form.extend(data);
        self.post(session, "api", form).map(ApiResponse::from_response)
    }

    /// Upload a raw body to an action.
    ///
    /// Addressing travels in the query string because the body is the
    /// payload itself. Statuses in [`ALREADY_HANDLED`] are returned as
    /// [`PutOutcome::AlreadyHandled`].
    #[allow(clippy::too_many_arguments)]
    pub fn api_put(
        &self,
        session: &Session,
        service: &str,
        action: &str,
        context: &Value,
        body: Body,
        args: Option<&Value>,
        headers: Params,
    ) -> Result<PutOutcome> {
        let query = Params::new()
            .with("service", service)
            .with("context", context.to_string())
            .with("action", action)
            .with(
                "args",
                args.map(Value::to_string).unwrap_or_else(|| "{}".to_string()),
            );

        let url = self.location.endpoint("service/upload");
        match session.put(&url, query, body, headers) {
            Ok(response) if ALREADY_HANDLED.contains(&response.status()) => {
                Ok(PutOutcome::AlreadyHandled {
                    code: response.status(),
                    response: ApiResponse::from_response(response),
                })
            }
            Ok(response) => Ok(PutOutcome::Completed(ApiResponse::from_response(response))),
            Err(ServiceError::Remote { code, response, .. }) if ALREADY_HANDLED.contains(&code) => {
                Ok(PutOutcome::AlreadyHandled {
                    code,
                    response: ApiResponse::from_response(*response),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Find the entry whose `id` equals `entry_id` in a list of admin entries.
    pub fn find_entry<'a>(entries: &'a Value, entry_id: &str) -> Option<&'a Value> {
        entries
            .as_array()?
            .iter()
            .find(|entry| entry.get("id").and_then(Value::as_str) == Some(entry_id))
    }
}

impl Service for AdminClient {
    fn id(&self) -> &str {
        ids::ADMIN
    }

    fn location(&self) -> &ServiceLocation {
        &self.location
    }
}
