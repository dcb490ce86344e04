//! Typed clients for platform services and the directory that locates them.
//!
//! Every service is reached through a [`ServiceLocation`] obtained from
//! discovery. Known identities get a dedicated client; anything else gets a
//! [`GenericService`] that can only issue GET and POST.

pub mod admin;
pub mod discovery;
pub mod environment;
pub mod generic;
pub mod login;
pub mod registry;

use std::fmt;

use crate::error::{Result, ServiceError};
use crate::http::{HttpResponse, Params, Session};

pub use admin::{AdminClient, ApiResponse, PutOutcome};
pub use discovery::{DiscoveryClient, ServiceDirectory};
pub use environment::{EnvironmentClient, EnvironmentInfo};
pub use generic::GenericService;
pub use login::LoginClient;
pub use registry::ServiceRegistry;

/// Well-known service identities.
pub mod ids {
    pub const ENVIRONMENT: &str = "environment";
    pub const DISCOVERY: &str = "discovery";
    pub const LOGIN: &str = "login";
    pub const ADMIN: &str = "admin";
    pub const DLC: &str = "dlc";
    pub const EXEC: &str = "exec";
    pub const GAME: &str = "game";
}

/// Base URL of a resolved service, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceLocation(String);

impl ServiceLocation {
    /// Validate a location string as returned by discovery.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        url::Url::parse(trimmed).map_err(|e| {
            ServiceError::InvalidResponse(format!("Invalid service location '{trimmed}': {e}"))
        })?;
        Ok(Self(trimmed.trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute URL of `path` under this location.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl fmt::Display for ServiceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability shared by every service client: authenticated GET and POST
/// relative to the service location.
pub trait Service {
    fn id(&self) -> &str;

    fn location(&self) -> &ServiceLocation;

    fn get(&self, session: &Session, path: &str, params: Params) -> Result<HttpResponse> {
        session.get(&self.location().endpoint(path), params)
    }

    fn post(&self, session: &Session, path: &str, form: Params) -> Result<HttpResponse> {
        session.post(&self.location().endpoint(path), form)
    }
}

/// A constructed client, tagged by the identity it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceClient {
    Environment(EnvironmentClient),
    Discovery(DiscoveryClient),
    Login(LoginClient),
    Admin(AdminClient),
    Generic(GenericService),
}

impl ServiceClient {
    pub fn as_service(&self) -> &dyn Service {
        match self {
            ServiceClient::Environment(c) => c,
            ServiceClient::Discovery(c) => c,
            ServiceClient::Login(c) => c,
            ServiceClient::Admin(c) => c,
            ServiceClient::Generic(c) => c,
        }
    }

    pub fn into_login(self) -> Result<LoginClient> {
        match self {
            ServiceClient::Login(c) => Ok(c),
            other => Err(mismatch(ids::LOGIN, &other)),
        }
    }

    pub fn into_admin(self) -> Result<AdminClient> {
        match self {
            ServiceClient::Admin(c) => Ok(c),
            other => Err(mismatch(ids::ADMIN, &other)),
        }
    }
}

impl Service for ServiceClient {
    fn id(&self) -> &str {
        self.as_service().id()
    }

    fn location(&self) -> &ServiceLocation {
        self.as_service().location()
    }
}

fn mismatch(expected: &str, got: &ServiceClient) -> ServiceError {
    ServiceError::InvalidRequest(format!(
        "expected a {expected} client, got '{}'",
        got.id()
    ))
}
