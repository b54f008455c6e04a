//! Factories, their slots, and the manager that owns both plus every
//! scheduled job.

mod manager;
mod slot;

pub use manager::FactoryManager;
pub use slot::{FactorySlot, SlotId, SlotType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PlanError;
use crate::job::JobBook;
use crate::temporal::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactoryId(pub u32);

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "factory-{}", self.0)
    }
}

/// A named group of slots.
#[derive(Debug, Clone)]
pub struct Factory {
    id: FactoryId,
    name: String,
    slots: Vec<FactorySlot>,
}

impl Factory {
    pub(crate) fn new(id: FactoryId, name: String) -> Self {
        Self {
            id,
            name,
            slots: Vec::new(),
        }
    }

    pub fn id(&self) -> FactoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[FactorySlot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&FactorySlot> {
        self.slots.iter().find(|slot| slot.id() == id)
    }

    pub fn slots_of_type(&self, slot_type: &SlotType) -> Vec<&FactorySlot> {
        self.slots
            .iter()
            .filter(|slot| slot.slot_type() == slot_type)
            .collect()
    }

    pub fn slots_by_type(&self) -> BTreeMap<&SlotType, Vec<&FactorySlot>> {
        let mut groups: BTreeMap<&SlotType, Vec<&FactorySlot>> = BTreeMap::new();
        for slot in &self.slots {
            groups.entry(slot.slot_type()).or_default().push(slot);
        }
        groups
    }

    /// Mean of the slot utilizations over `[start, end]`; zero without slots.
    pub fn utilization(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        book: &JobBook,
    ) -> Result<f64, PlanError> {
        let range = DateRange::new(start, end)?;
        if self.slots.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for slot in &self.slots {
            total += slot.utilization(&range, book)?;
        }
        Ok(total / self.slots.len() as f64)
    }

    pub(crate) fn push_slot(&mut self, slot: FactorySlot) {
        self.slots.push(slot);
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> Option<&mut FactorySlot> {
        self.slots.iter_mut().find(|slot| slot.id() == id)
    }
}
