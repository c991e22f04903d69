//! Inventory - bounded resource amounts held by an entity, collective or the game

use serde::{Deserialize, Serialize};

use crate::core::types::{Amount, ResourceId};

/// Inclusive bounds for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimit {
    pub min: Amount,
    pub max: Amount,
}

impl ResourceLimit {
    pub const fn new(min: Amount, max: Amount) -> Self {
        Self { min, max }
    }

    /// False when the bounds are inverted
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    #[inline]
    pub fn clamp(&self, amount: i64) -> Amount {
        amount.clamp(self.min as i64, self.max as i64) as Amount
    }
}

/// Resource amounts indexed by `ResourceId`, each kept inside its limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    amounts: Vec<Amount>,
    limits: Vec<ResourceLimit>,
}

impl Inventory {
    pub fn new(limits: Vec<ResourceLimit>) -> Self {
        let amounts = limits.iter().map(|l| l.clamp(0)).collect();
        Self { amounts, limits }
    }

    /// Current amount (0 for an unknown resource)
    #[inline]
    pub fn get(&self, resource: ResourceId) -> Amount {
        self.amounts.get(resource.0 as usize).copied().unwrap_or(0)
    }

    /// The part of `delta` that can be applied without leaving the limit
    pub fn clamped_delta(&self, resource: ResourceId, delta: Amount) -> Amount {
        let idx = resource.0 as usize;
        match (self.amounts.get(idx), self.limits.get(idx)) {
            (Some(&current), Some(limit)) => {
                limit.clamp(current as i64 + delta as i64) - current
            }
            _ => 0,
        }
    }

    /// True if the whole `delta` can be applied without clamping
    pub fn fits(&self, resource: ResourceId, delta: Amount) -> bool {
        (resource.0 as usize) < self.amounts.len()
            && self.clamped_delta(resource, delta) == delta
    }

    /// Apply `delta` clamped to the limit, returning what was applied
    pub fn update(&mut self, resource: ResourceId, delta: Amount) -> Amount {
        let applied = self.clamped_delta(resource, delta);
        if let Some(amount) = self.amounts.get_mut(resource.0 as usize) {
            *amount += applied;
        }
        applied
    }

    /// Set an amount, clamped to the limit
    pub fn set(&mut self, resource: ResourceId, amount: Amount) {
        let idx = resource.0 as usize;
        if let (Some(slot), Some(limit)) = (self.amounts.get_mut(idx), self.limits.get(idx)) {
            *slot = limit.clamp(amount as i64);
        }
    }

    /// Zero every listed resource (all resources when `only` is empty)
    pub fn clear(&mut self, only: &[ResourceId]) {
        if only.is_empty() {
            for (slot, limit) in self.amounts.iter_mut().zip(&self.limits) {
                *slot = limit.clamp(0);
            }
        } else {
            for &resource in only {
                self.set(resource, 0);
            }
        }
    }

    pub fn has_at_least(&self, resource: ResourceId, required: Amount) -> bool {
        self.get(resource) >= required
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, Amount)> + '_ {
        self.amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| (ResourceId(i as u16), a))
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.iter().all(|&a| a == 0)
    }
}
