//! Registry of client constructors keyed by service identity.
//!
//! Discovery hands back bare locations; the registry turns each one into the
//! typed client for its identity, or a [`GenericService`] when the identity
//! has no dedicated wrapper.

use std::collections::BTreeMap;

use tracing::debug;

use super::{
    AdminClient, DiscoveryClient, EnvironmentClient, GenericService, LoginClient, ServiceClient,
    ServiceLocation, ids,
};

/// Builds a client for a resolved location.
pub type Constructor = fn(ServiceLocation) -> ServiceClient;

#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::with_default_services()
    }
}

impl ServiceRegistry {
    /// Create an empty registry; every identity resolves to a generic client.
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Create a registry with the platform's well-known services.
    pub fn with_default_services() -> Self {
        let mut registry = Self::new();
        registry.register(ids::ENVIRONMENT, |location| {
            ServiceClient::Environment(EnvironmentClient::new(location))
        });
        registry.register(ids::DISCOVERY, |location| {
            ServiceClient::Discovery(DiscoveryClient::new(location))
        });
        registry.register(ids::LOGIN, |location| {
            ServiceClient::Login(LoginClient::new(location))
        });
        registry.register(ids::ADMIN, |location| {
            ServiceClient::Admin(AdminClient::new(location))
        });
        registry
    }

    /// Register (or replace) the constructor for `id`.
    pub fn register(&mut self, id: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(id.into(), constructor);
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    /// List all registered identities.
    pub fn service_ids(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build the client for `id` at `location`.
    pub fn construct(&self, id: &str, location: ServiceLocation) -> ServiceClient {
        match self.constructors.get(id) {
            Some(constructor) => constructor(location),
            None => {
                debug!(service = id, "no service registered, using generic client");
                ServiceClient::Generic(GenericService::new(id, location))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Service;

    fn location() -> ServiceLocation {
        ServiceLocation::parse("http://svc.local").unwrap()
    }

    #[test]
    fn test_default_services_registered() {
        let registry = ServiceRegistry::with_default_services();
        let ids = registry.service_ids();

        assert!(ids.contains(&"environment"));
        assert!(ids.contains(&"discovery"));
        assert!(ids.contains(&"login"));
        assert!(ids.contains(&"admin"));
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_known_identity_gets_typed_client() {
        let registry = ServiceRegistry::default();
        assert!(matches!(
            registry.construct("admin", location()),
            ServiceClient::Admin(_)
        ));
        assert!(matches!(
            registry.construct("login", location()),
            ServiceClient::Login(_)
        ));
    }

    #[test]
    fn test_unknown_identity_falls_back_to_generic() {
        let registry = ServiceRegistry::default();
        let client = registry.construct("dlc", location());

        assert!(matches!(client, ServiceClient::Generic(_)));
        assert_eq!(client.id(), "dlc");
        assert_eq!(client.location().as_str(), "http://svc.local");
    }

    #[test]
    fn test_empty_registry_is_all_generic() {
        let registry = ServiceRegistry::new();
        assert!(!registry.is_registered("admin"));
        assert!(matches!(
            registry.construct("admin", location()),
            ServiceClient::Generic(_)
        ));
    }

    #[test]
    fn test_register_custom_constructor() {
        let mut registry = ServiceRegistry::new();
        registry.register("auth", |location| {
            ServiceClient::Login(LoginClient::new(location))
        });
        assert!(matches!(
            registry.construct("auth", location()),
            ServiceClient::Login(_)
        ));
    }
}
