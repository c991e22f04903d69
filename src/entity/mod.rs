//! Entity, collective and game-scope records

pub mod inventory;
pub mod stats;

use serde::{Deserialize, Serialize};

use crate::core::types::{
    Amount, CollectiveId, EntityId, GridLocation, HandlerId, ObjectTypeId, ResourceId, TagId, Tick,
    VibeId,
};
pub use inventory::{Inventory, ResourceLimit};
pub use stats::StatsTracker;

/// A grid object. Tags are not stored here; they live in the Tag Index.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub object_type: ObjectTypeId,
    pub location: GridLocation,
    pub inventory: Inventory,
    /// Lookup key into the collective table, never an owning reference
    pub collective: Option<CollectiveId>,
    pub vibe: VibeId,
    pub frozen_until: Tick,
    pub stats: StatsTracker,
}

impl Entity {
    /// Frozen entities are skipped by the external action layer
    pub fn is_frozen(&self, tick: Tick) -> bool {
        self.frozen_until > tick
    }
}

/// A shared-resource group. Membership is derived from entities.
#[derive(Debug, Clone)]
pub struct Collective {
    pub id: CollectiveId,
    pub name: String,
    pub inventory: Inventory,
    pub stats: StatsTracker,
}

/// The game-global pseudo-entity
#[derive(Debug, Clone)]
pub struct GameScope {
    pub inventory: Inventory,
    pub stats: StatsTracker,
}

/// Which record an inventory or stat operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Holder {
    Game,
    Entity(EntityId),
    Collective(CollectiveId),
}

/// Compiled object type: the prototype every spawned entity is built from
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub id: ObjectTypeId,
    pub name: String,
    /// Implicit `type:<name>` tag
    pub type_tag: TagId,
    pub tags: Vec<TagId>,
    pub limits: Vec<ResourceLimit>,
    pub initial_inventory: Vec<(ResourceId, Amount)>,
    pub vibe: VibeId,
    pub on_use: Vec<HandlerId>,
    pub on_tick: Vec<HandlerId>,
    /// Indices into the compiled AOE table
    pub aoes: Vec<usize>,
}
