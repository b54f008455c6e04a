use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ResourceError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceType {
    id: u32,
    name: String,
    /// Shareable resources are required by jobs but never used up.
    #[serde(default)]
    shareable: bool,
}

impl ResourceType {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            shareable: false,
        }
    }

    pub fn shareable(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            shareable: true,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_shareable(&self) -> bool {
        self.shareable
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Where resources are stocked. `Anywhere` is the wildcard used in queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionLocation {
    Anywhere,
    Site(String),
}

impl ProductionLocation {
    pub fn site(name: impl Into<String>) -> Self {
        ProductionLocation::Site(name.into())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ProductionLocation::Anywhere)
    }
}

impl fmt::Display for ProductionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductionLocation::Anywhere => f.write_str("*"),
            ProductionLocation::Site(name) => f.write_str(name),
        }
    }
}

/// A demand or yield of a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceQuantity {
    pub resource_type: ResourceType,
    pub quantity: i64,
}

impl ResourceQuantity {
    pub fn new(resource_type: ResourceType, quantity: i64) -> Result<Self, ResourceError> {
        if quantity < 0 {
            return Err(ResourceError::InvalidArgument(format!(
                "quantity of {resource_type} must not be negative (got {quantity})"
            )));
        }
        Ok(Self {
            resource_type,
            quantity,
        })
    }
}

/// Quantity of one resource type at one location. The amount is guarded by
/// its own lock and may drop below zero to signal a shortage.
#[derive(Debug)]
pub struct Resource {
    resource_type: ResourceType,
    location: ProductionLocation,
    amount: Mutex<i64>,
}

impl Resource {
    pub fn new(resource_type: ResourceType, location: ProductionLocation, amount: i64) -> Self {
        Self {
            resource_type,
            location,
            amount: Mutex::new(amount),
        }
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn location(&self) -> &ProductionLocation {
        &self.location
    }

    pub fn amount(&self) -> i64 {
        *self.amount.lock()
    }

    pub fn set_amount(&self, amount: i64) {
        *self.amount.lock() = amount;
    }

    /// Returns the new amount.
    pub fn add(&self, quantity: i64) -> Result<i64, ResourceError> {
        check_quantity(quantity)?;
        let mut amount = self.amount.lock();
        *amount = amount.checked_add(quantity).ok_or_else(|| {
            ResourceError::InvalidArgument(format!("adding {quantity} to {self} overflows"))
        })?;
        Ok(*amount)
    }

    /// Returns the new amount, which may be negative.
    pub fn subtract(&self, quantity: i64) -> Result<i64, ResourceError> {
        check_quantity(quantity)?;
        let mut amount = self.amount.lock();
        *amount = amount.checked_sub(quantity).ok_or_else(|| {
            ResourceError::InvalidArgument(format!("subtracting {quantity} from {self} overflows"))
        })?;
        Ok(*amount)
    }

    /// Copy carrying the same type and location at another amount.
    pub(crate) fn with_amount(&self, amount: i64) -> Resource {
        Resource::new(self.resource_type.clone(), self.location.clone(), amount)
    }
}

fn check_quantity(quantity: i64) -> Result<(), ResourceError> {
    if quantity < 0 {
        return Err(ResourceError::InvalidArgument(format!(
            "quantity must not be negative (got {quantity})"
        )));
    }
    Ok(())
}

impl Clone for Resource {
    fn clone(&self) -> Self {
        self.with_amount(self.amount())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.resource_type, self.location)
    }
}
