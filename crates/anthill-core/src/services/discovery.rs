//! Service discovery and the per-run location cache.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::{Service, ServiceClient, ServiceLocation, ServiceRegistry, ids};
use crate::error::{Result, ServiceError};
use crate::http::{HttpRequest, Session};

/// Raw lookups against the discovery service. No caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryClient {
    location: ServiceLocation,
}

impl DiscoveryClient {
    pub fn new(location: ServiceLocation) -> Self {
        Self { location }
    }

    /// `GET {discovery}/service/{id}`; the body is the plain-text location.
    pub fn lookup(&self, session: &Session, id: &str) -> Result<ServiceLocation> {
        validate_id(id)?;
        let url = self.location.endpoint(&format!("service/{id}"));
        let response = session.fetch(HttpRequest::get(url)).map_err(|e| match e.code() {
            404 => ServiceError::NotFound(id.to_string()),
            _ => e,
        })?;
        ServiceLocation::parse(&response.text())
    }

    /// `GET {discovery}/services/{a,b,c}`; the body maps ids to locations.
    ///
    /// The result may omit ids the discovery service does not know.
    pub fn lookup_many(
        &self,
        session: &Session,
        ids: &[&str],
    ) -> Result<BTreeMap<String, ServiceLocation>> {
        for id in ids {
            validate_id(id)?;
        }
        let url = self
            .location
            .endpoint(&format!("services/{}", ids.join(",")));
        let response = session.fetch(HttpRequest::get(url))?;
        let raw: BTreeMap<String, String> = response.json()?;

        raw.into_iter()
            .map(|(id, location)| Ok((id, ServiceLocation::parse(&location)?)))
            .collect()
    }
}

impl Service for DiscoveryClient {
    fn id(&self) -> &str {
        ids::DISCOVERY
    }

    fn location(&self) -> &ServiceLocation {
        &self.location
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains([',', '/']) {
        return Err(ServiceError::InvalidRequest(format!(
            "Service should be a plain identity, got '{id}'"
        )));
    }
    Ok(())
}

/// Resolves service identities to typed clients, remembering every location
/// for the lifetime of the directory.
///
/// Entries never expire. Long-lived embedders should call
/// [`ServiceDirectory::invalidate`] or [`ServiceDirectory::clear`] when a
/// location may have moved. Mutation goes through `&mut self`; wrap the
/// directory in a lock before sharing it across threads.
#[derive(Debug, Clone)]
pub struct ServiceDirectory {
    discovery: DiscoveryClient,
    registry: ServiceRegistry,
    cache: HashMap<String, ServiceLocation>,
}

impl ServiceDirectory {
    pub fn new(discovery: DiscoveryClient) -> Self {
        Self::with_registry(discovery, ServiceRegistry::with_default_services())
    }

    pub fn with_registry(discovery: DiscoveryClient, registry: ServiceRegistry) -> Self {
        Self {
            discovery,
            registry,
            cache: HashMap::new(),
        }
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn cached(&self, id: &str) -> Option<&ServiceLocation> {
        self.cache.get(id)
    }

    /// Forget one cached location. Returns whether it was cached.
    pub fn invalidate(&mut self, id: &str) -> bool {
        self.cache.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Resolve one identity, consulting the cache first.
    pub fn resolve(&mut self, session: &Session, id: &str) -> Result<ServiceLocation> {
        if let Some(location) = self.cache.get(id) {
            debug!(service = id, "service location cached");
            return Ok(location.clone());
        }

        debug!(service = id, "looking for service");
        let location = self.discovery.lookup(session, id)?;
        self.cache.insert(id.to_string(), location.clone());
        Ok(location)
    }

    /// Resolve one identity and build its client.
    pub fn client(&mut self, session: &Session, id: &str) -> Result<ServiceClient> {
        let location = self.resolve(session, id)?;
        Ok(self.registry.construct(id, location))
    }

    /// Resolve several identities with at most one batched lookup.
    ///
    /// Only identities missing from the cache are sent to discovery. Every
    /// requested identity must come back; a partial answer is an error.
    pub fn resolve_many(
        &mut self,
        session: &Session,
        ids: &[&str],
    ) -> Result<BTreeMap<String, ServiceClient>> {
        let mut uncached: Vec<&str> = Vec::new();
        for id in ids {
            if !self.cache.contains_key(*id) && !uncached.contains(id) {
                uncached.push(*id);
            }
        }

        if !uncached.is_empty() {
            debug!(services = %uncached.join(","), "looking for services");
            let found = self.discovery.lookup_many(session, &uncached)?;
            self.cache.extend(found);

            if let Some(missing) = uncached.iter().find(|id| !self.cache.contains_key(**id)) {
                return Err(ServiceError::NotFound(missing.to_string()));
            }
        }

        Ok(ids
            .iter()
            .map(|id| {
                let location = self.cache[*id].clone();
                (id.to_string(), self.registry.construct(id, location))
            })
            .collect())
    }
}
