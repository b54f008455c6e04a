use chrono::{DateTime, Utc};

use super::{ProductionLocation, Resource, ResourceType};

/// Creates and copies [`Resource`]s for a [`super::ResourceManager`].
pub trait ResourceFactory: Send + Sync {
    /// A fresh zero-amount resource.
    fn create(&self, resource_type: &ResourceType, location: &ProductionLocation) -> Resource;

    fn duplicate(&self, resource: &Resource) -> Resource {
        resource.clone()
    }

    /// When the backing data was last known to be current.
    fn last_updated(&self) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Clone, Default)]
pub struct ZeroResourceFactory {
    as_of: Option<DateTime<Utc>>,
}

impl ZeroResourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_of(as_of: DateTime<Utc>) -> Self {
        Self { as_of: Some(as_of) }
    }
}

impl ResourceFactory for ZeroResourceFactory {
    fn create(&self, resource_type: &ResourceType, location: &ProductionLocation) -> Resource {
        Resource::new(resource_type.clone(), location.clone(), 0)
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.as_of
    }
}

/// Supplies the initial pool. Runs at most once, on first access.
pub trait ResourceLoader: Send + Sync {
    fn load(&self) -> Vec<Resource>;
}

impl<F> ResourceLoader for F
where
    F: Fn() -> Vec<Resource> + Send + Sync,
{
    fn load(&self) -> Vec<Resource> {
        self()
    }
}
