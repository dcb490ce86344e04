//! Login service: exchanges credentials for the session token.

use serde::Deserialize;
use tracing::info;

use super::{Service, ServiceLocation, ids};
use crate::app::ApplicationInfo;
use crate::error::{Result, ServiceError};
use crate::http::{Params, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginClient {
    location: ServiceLocation,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

impl LoginClient {
    pub fn new(location: ServiceLocation) -> Self {
        Self { location }
    }

    /// Authenticate and store the token in `session`.
    ///
    /// `scopes` must not be empty. `options` are merged last and may
    /// override the standard fields.
    pub fn authenticate(
        &self,
        session: &Session,
        app: &ApplicationInfo,
        credential: &str,
        scopes: &[&str],
        options: Params,
    ) -> Result<String> {
        if scopes.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Scopes should be a non-empty list".to_string(),
            ));
        }
        if session.is_authenticated() {
            return Err(ServiceError::InvalidRequest(
                "session is already authenticated".to_string(),
            ));
        }

        let mut form = Params::new()
            .with("credential", credential)
            .with("scopes", scopes.join(","))
            .with("gamespace", app.gamespace.as_str())
            .with("full", "true");
        form.extend(options);

        let response = self.post(session, "auth", form)?;
        let AuthResponse { token } = response.json()?;
        session.set_token(token.clone())?;

        info!(credential, "authenticated");
        Ok(token)
    }

    /// Authenticate with the `dev` credential (username and key).
    pub fn authenticate_dev(
        &self,
        session: &Session,
        app: &ApplicationInfo,
        username: &str,
        password: &str,
        scopes: &[&str],
        options: Params,
    ) -> Result<String> {
        let mut options = options;
        options.insert("username", username);
        options.insert("key", password);
        self.authenticate(session, app, "dev", scopes, options)
    }
}

impl Service for LoginClient {
    fn id(&self) -> &str {
        ids::LOGIN
    }

    fn location(&self) -> &ServiceLocation {
        &self.location
    }
}
