//! Per-run context: one session plus the clients every workflow needs.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::app::{ApplicationInfo, Credentials};
use crate::error::{DeliverError, ServiceError};
use crate::http::{Params, Session, Transport};
use crate::services::{
    AdminClient, EnvironmentClient, EnvironmentInfo, LoginClient, ServiceClient, ServiceDirectory,
    ServiceLocation, ids,
};

/// Everything a delivery workflow shares.
///
/// Built once by [`DeliveryContext::connect`]; frontends then authenticate
/// with the scopes of the workflow they run and hand the context to it.
#[derive(Debug)]
pub struct DeliveryContext {
    app: ApplicationInfo,
    session: Session,
    environment: EnvironmentInfo,
    directory: ServiceDirectory,
    login: LoginClient,
    admin: AdminClient,
    services: BTreeMap<String, ServiceClient>,
}

impl DeliveryContext {
    /// Bootstrap from the environment service and resolve `login`, `admin`
    /// and every identity in `extra` with a single discovery call.
    pub fn connect(
        transport: Arc<dyn Transport>,
        environment: &str,
        app: ApplicationInfo,
        extra: &[&str],
    ) -> Result<Self, DeliverError> {
        let location = ServiceLocation::parse(environment).map_err(|e| {
            DeliverError::Config(format!("Bad environment location: {}", e.message()))
        })?;

        info!(environment = %location, "Initializing...");
        let session = Session::new(transport);
        let environment = EnvironmentClient::new(location).bootstrap(&session, &app)?;
        let mut directory = ServiceDirectory::new(environment.discovery.clone());

        let mut wanted = vec![ids::LOGIN, ids::ADMIN];
        wanted.extend_from_slice(extra);
        let mut services = directory.resolve_many(&session, &wanted)?;

        let login = take(&mut services, ids::LOGIN)?.into_login()?;
        let admin = take(&mut services, ids::ADMIN)?.into_admin()?;

        Ok(Self {
            app,
            session,
            environment,
            directory,
            login,
            admin,
            services,
        })
    }

    /// Log in with the `dev` credential, acting `as` the given role.
    pub fn authenticate(
        &self,
        credentials: &Credentials,
        scopes: &[&str],
        role: &str,
    ) -> Result<String, DeliverError> {
        info!(role, "Authenticating...");
        let token = self.login.authenticate_dev(
            &self.session,
            &self.app,
            &credentials.username,
            &credentials.password,
            scopes,
            Params::new().with("as", role),
        )?;
        Ok(token)
    }

    pub fn app(&self) -> &ApplicationInfo {
        &self.app
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn environment(&self) -> &EnvironmentInfo {
        &self.environment
    }

    pub fn directory_mut(&mut self) -> &mut ServiceDirectory {
        &mut self.directory
    }

    pub fn login(&self) -> &LoginClient {
        &self.login
    }

    pub fn admin(&self) -> &AdminClient {
        &self.admin
    }

    /// A client resolved at connect time through `extra`.
    pub fn service(&self, id: &str) -> Result<&ServiceClient, ServiceError> {
        self.services
            .get(id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }
}

fn take(
    services: &mut BTreeMap<String, ServiceClient>,
    id: &str,
) -> Result<ServiceClient, ServiceError> {
    services
        .remove(id)
        .ok_or_else(|| ServiceError::NotFound(id.to_string()))
}
