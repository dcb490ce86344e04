//! Environment bootstrap: the single entry point every run starts from.

use serde_json::{Map, Value};
use tracing::info;

use super::{DiscoveryClient, Service, ServiceLocation, ids};
use crate::app::ApplicationInfo;
use crate::error::{Result, ServiceError};
use crate::http::{HttpRequest, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentClient {
    location: ServiceLocation,
}

/// Environment document for one application version.
#[derive(Debug, Clone)]
pub struct EnvironmentInfo {
    pub discovery: DiscoveryClient,
    /// The full document, including keys this tool does not interpret.
    pub values: Map<String, Value>,
}

impl EnvironmentClient {
    pub fn new(location: ServiceLocation) -> Self {
        Self { location }
    }

    /// Fetch `{env}/{app_name}/{app_version}` and locate discovery.
    ///
    /// The request is unauthenticated. A document without a `discovery`
    /// string is fatal.
    pub fn bootstrap(&self, session: &Session, app: &ApplicationInfo) -> Result<EnvironmentInfo> {
        let url = self
            .location
            .endpoint(&format!("{}/{}", app.app_name, app.app_version));
        let response = session.fetch(HttpRequest::get(url))?;
        let values: Map<String, Value> = response.json()?;

        let discovery = values
            .get(ids::DISCOVERY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ServiceError::InvalidResponse("No discovery in environment info!".to_string())
            })?;
        let discovery = DiscoveryClient::new(ServiceLocation::parse(discovery)?);

        info!(discovery = %discovery.location(), "got environment response");
        Ok(EnvironmentInfo { discovery, values })
    }
}

impl Service for EnvironmentClient {
    fn id(&self) -> &str {
        ids::ENVIRONMENT
    }

    fn location(&self) -> &ServiceLocation {
        &self.location
    }
}
