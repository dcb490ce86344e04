//! Application coordinates and operator credentials.

use crate::error::DeliverError;

pub const USERNAME_ENV: &str = "ANTHILL_USERNAME";
pub const PASSWORD_ENV: &str = "ANTHILL_PASSWORD";

/// Tenant, application and version every call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub app_name: String,
    pub app_version: String,
    pub gamespace: String,
}

impl ApplicationInfo {
    pub fn new(
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        gamespace: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            gamespace: gamespace.into(),
        }
    }
}

/// Developer credentials for the `dev` login flow.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Use explicit values, falling back to `ANTHILL_USERNAME` / `ANTHILL_PASSWORD`.
    pub fn resolve(
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, DeliverError> {
        Self::resolve_with(username, password, |key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::resolve`] with an injectable environment lookup.
    pub fn resolve_with(
        username: Option<String>,
        password: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DeliverError> {
        let username = username
            .filter(|u| !u.is_empty())
            .or_else(|| env(USERNAME_ENV).filter(|u| !u.is_empty()))
            .ok_or_else(|| {
                DeliverError::Config(format!(
                    "Please define {USERNAME_ENV} environment variable."
                ))
            })?;
        let password = password
            .filter(|p| !p.is_empty())
            .or_else(|| env(PASSWORD_ENV).filter(|p| !p.is_empty()))
            .ok_or_else(|| {
                DeliverError::Config(format!(
                    "Please define {PASSWORD_ENV} environment variable."
                ))
            })?;
        Ok(Self { username, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
