//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Stable entity identifier, assigned in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Collective (team/faction) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectiveId(pub u16);

/// Resource identifier, index into every inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u16);

/// Stat identifier, index into every stats tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatId(pub u16);

/// Vibe identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VibeId(pub u8);

/// Object type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectTypeId(pub u16);

/// Tag identifier; doubles as the tag's bit position in every bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId(pub u16);

/// Named handler identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandlerId(pub u16);

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Inventory amounts and deltas
pub type Amount = i32;

/// Integer grid cell (row, column)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridLocation {
    pub r: i32,
    pub c: i32,
}

impl GridLocation {
    pub const fn new(r: i32, c: i32) -> Self {
        Self { r, c }
    }

    /// Max of the absolute row/column offsets
    #[inline]
    pub fn chebyshev(&self, other: &Self) -> u32 {
        let dr = (self.r as i64 - other.r as i64).unsigned_abs();
        let dc = (self.c as i64 - other.c as i64).unsigned_abs();
        dr.max(dc) as u32
    }

    /// Squared Euclidean distance, exact in integers
    #[inline]
    pub fn distance_sq(&self, other: &Self) -> u64 {
        let dr = (self.r as i64 - other.r as i64).unsigned_abs();
        let dc = (self.c as i64 - other.c as i64).unsigned_abs();
        (dr * dr).saturating_add(dc * dc)
    }
}

/// How a radius is measured around a point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Square neighbourhood: max(|dr|, |dc|) <= radius
    #[default]
    Chebyshev,
    /// Disc: dr² + dc² <= radius²
    Round,
}

impl DistanceMetric {
    #[inline]
    pub fn within(self, a: &GridLocation, b: &GridLocation, radius: u32) -> bool {
        match self {
            DistanceMetric::Chebyshev => a.chebyshev(b) <= radius,
            DistanceMetric::Round => a.distance_sq(b) <= u64::from(radius) * u64::from(radius),
        }
    }
}
