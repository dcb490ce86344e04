//! Fallback client for identities without a dedicated wrapper.

use super::{Service, ServiceLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericService {
    id: String,
    location: ServiceLocation,
}

impl GenericService {
    pub fn new(id: impl Into<String>, location: ServiceLocation) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }
}

impl Service for GenericService {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> &ServiceLocation {
        &self.location
    }
}
