//! Virtual inventory of resources per location.
//!
//! The pool is virtual: consuming more than is stocked drives the amount
//! negative, which callers read as a shortage. Each [`Resource`] guards its own
//! amount; the location/type map is guarded by one manager-wide lock that is
//! only held for lookups, inserts, removals and snapshots.

mod factory;
mod model;

pub use factory::{ResourceFactory, ResourceLoader, ZeroResourceFactory};
pub use model::{ProductionLocation, Resource, ResourceQuantity, ResourceType};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, Once};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

type Pool = BTreeMap<ProductionLocation, BTreeMap<ResourceType, Arc<Resource>>>;

pub struct ResourceManager {
    factory: Arc<dyn ResourceFactory>,
    loader: Option<Box<dyn ResourceLoader>>,
    init: Once,
    pool: Mutex<Pool>,
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pool = self.pool.lock();
        f.debug_struct("ResourceManager")
            .field("locations", &pool.len())
            .field("resources", &pool.values().map(BTreeMap::len).sum::<usize>())
            .finish()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(Arc::new(ZeroResourceFactory::new()))
    }
}

impl ResourceManager {
    pub fn new(factory: Arc<dyn ResourceFactory>) -> Self {
        Self {
            factory,
            loader: None,
            init: Once::new(),
            pool: Mutex::new(BTreeMap::new()),
        }
    }

    /// A manager whose pool is filled by `loader` on first use.
    pub fn with_loader(factory: Arc<dyn ResourceFactory>, loader: impl ResourceLoader + 'static) -> Self {
        Self {
            loader: Some(Box::new(loader)),
            ..Self::new(factory)
        }
    }

    fn ensure_initialized(&self) {
        self.init.call_once(|| {
            let Some(loader) = &self.loader else {
                return;
            };
            let loaded = loader.load();
            let mut pool = self.pool.lock();
            for resource in loaded {
                let entry = pool.entry(resource.location().clone()).or_default();
                entry.insert(resource.resource_type().clone(), Arc::new(resource));
            }
            trace!(locations = pool.len(), "resource pool initialized");
        });
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.factory.last_updated()
    }

    /// Uses up `amount` of a non-shareable resource; returns the new amount.
    pub fn consume(
        &self,
        resource_type: &ResourceType,
        location: &ProductionLocation,
        amount: i64,
    ) -> Result<i64, ResourceError> {
        check_amount(amount)?;
        if resource_type.is_shareable() {
            return Err(ResourceError::Unsupported(format!(
                "{resource_type} is shareable and cannot be consumed"
            )));
        }
        let resource = self.live_resource(resource_type, location)?;
        let remaining = resource.subtract(amount)?;
        trace!(%resource, amount, remaining, "consumed");
        Ok(remaining)
    }

    /// Adds `amount` to a resource; returns the new amount.
    pub fn produce(
        &self,
        resource_type: &ResourceType,
        location: &ProductionLocation,
        amount: i64,
    ) -> Result<i64, ResourceError> {
        check_amount(amount)?;
        let resource = self.live_resource(resource_type, location)?;
        let total = resource.add(amount)?;
        trace!(%resource, amount, total, "produced");
        Ok(total)
    }

    /// The resource at `location`, created at zero when missing.
    ///
    /// With [`ProductionLocation::Anywhere`] the result is a detached resource
    /// holding the sum across every location; mutating it does not touch the
    /// pool.
    pub fn resource(
        &self,
        resource_type: &ResourceType,
        location: &ProductionLocation,
    ) -> Arc<Resource> {
        self.ensure_initialized();
        if location.is_wildcard() {
            return Arc::new(self.aggregate(resource_type));
        }
        let mut pool = self.pool.lock();
        let entry = pool.entry(location.clone()).or_default();
        Arc::clone(
            entry
                .entry(resource_type.clone())
                .or_insert_with(|| Arc::new(self.factory.create(resource_type, location))),
        )
    }

    pub fn amount(&self, resource_type: &ResourceType, location: &ProductionLocation) -> i64 {
        self.resource(resource_type, location).amount()
    }

    /// Every resource stocked at `location`, or everywhere for the wildcard.
    pub fn resources_at(&self, location: &ProductionLocation) -> Vec<Arc<Resource>> {
        self.ensure_initialized();
        let pool = self.pool.lock();
        if location.is_wildcard() {
            return pool.values().flat_map(|m| m.values().cloned()).collect();
        }
        pool.get(location)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Replaces the resource for its type and location.
    pub fn insert(&self, resource: Resource) -> Result<(), ResourceError> {
        if resource.location().is_wildcard() {
            return Err(ResourceError::InvalidArgument(format!(
                "{resource} must be stocked at a concrete location"
            )));
        }
        self.ensure_initialized();
        let mut pool = self.pool.lock();
        pool.entry(resource.location().clone())
            .or_default()
            .insert(resource.resource_type().clone(), Arc::new(resource));
        Ok(())
    }

    pub fn remove(
        &self,
        resource_type: &ResourceType,
        location: &ProductionLocation,
    ) -> Option<Arc<Resource>> {
        self.ensure_initialized();
        let mut pool = self.pool.lock();
        let entry = pool.get_mut(location)?;
        let removed = entry.remove(resource_type);
        if entry.is_empty() {
            pool.remove(location);
        }
        removed
    }

    /// Amounts that would remain after subtracting `items`, one entry per
    /// resource type. Works on copies; the pool is never modified.
    pub fn calculate_projected_resource_status(
        &self,
        items: &[ResourceQuantity],
        location: &ProductionLocation,
    ) -> Result<Vec<Resource>, ResourceError> {
        let mut demand: BTreeMap<&ResourceType, i64> = BTreeMap::new();
        for item in items {
            check_amount(item.quantity)?;
            let total = demand.entry(&item.resource_type).or_default();
            *total = total.checked_add(item.quantity).ok_or_else(|| {
                ResourceError::InvalidArgument(format!(
                    "demand for {} overflows",
                    item.resource_type
                ))
            })?;
        }

        self.ensure_initialized();
        let mut projected = Vec::with_capacity(demand.len());
        for (resource_type, quantity) in demand {
            let copy = if location.is_wildcard() {
                self.aggregate(resource_type)
            } else {
                self.detached_copy(resource_type, location)
            };
            copy.subtract(quantity)?;
            projected.push(copy);
        }
        Ok(projected)
    }

    /// Projected entries that fall below zero.
    pub fn shortages(
        &self,
        items: &[ResourceQuantity],
        location: &ProductionLocation,
    ) -> Result<Vec<Resource>, ResourceError> {
        let short: Vec<Resource> = self
            .calculate_projected_resource_status(items, location)?
            .into_iter()
            .filter(|resource| resource.amount() < 0)
            .collect();
        for resource in &short {
            warn!(%resource, amount = resource.amount(), "projected shortage");
        }
        Ok(short)
    }

    /// Deep copy of the whole pool. Every resource is duplicated, so this is
    /// expensive; the copy and the original never affect each other.
    pub fn snapshot(&self) -> ResourceManager {
        self.ensure_initialized();
        let copy = {
            let pool = self.pool.lock();
            pool.iter()
                .map(|(location, resources)| {
                    let resources = resources
                        .iter()
                        .map(|(ty, resource)| {
                            (ty.clone(), Arc::new(self.factory.duplicate(resource)))
                        })
                        .collect();
                    (location.clone(), resources)
                })
                .collect::<Pool>()
        };
        let snapshot = ResourceManager {
            factory: Arc::clone(&self.factory),
            loader: None,
            init: Once::new(),
            pool: Mutex::new(copy),
        };
        snapshot.ensure_initialized();
        snapshot
    }

    fn live_resource(
        &self,
        resource_type: &ResourceType,
        location: &ProductionLocation,
    ) -> Result<Arc<Resource>, ResourceError> {
        if location.is_wildcard() {
            return Err(ResourceError::InvalidArgument(format!(
                "{resource_type} can only change at a concrete location"
            )));
        }
        Ok(self.resource(resource_type, location))
    }

    fn detached_copy(&self, resource_type: &ResourceType, location: &ProductionLocation) -> Resource {
        let pool = self.pool.lock();
        match pool.get(location).and_then(|m| m.get(resource_type)) {
            Some(resource) => self.factory.duplicate(resource),
            None => self.factory.create(resource_type, location),
        }
    }

    fn aggregate(&self, resource_type: &ResourceType) -> Resource {
        let pool = self.pool.lock();
        let total = pool
            .values()
            .filter_map(|m| m.get(resource_type))
            .map(|resource| resource.amount())
            .fold(0_i64, i64::saturating_add);
        Resource::new(resource_type.clone(), ProductionLocation::Anywhere, total)
    }
}

fn check_amount(amount: i64) -> Result<(), ResourceError> {
    if amount < 0 {
        return Err(ResourceError::InvalidArgument(format!(
            "amount must not be negative (got {amount})"
        )));
    }
    Ok(())
}
