//! World - the read/write view of entity state the rule engine operates on
//!
//! Positions, inventories, tags, collective membership, freeze counters and
//! stats for every entity, plus the collective table and the game scope.
//! Tags are stored only in the Tag Index; `add_tag`, `remove_tag` and
//! `set_collective` are the only paths that change membership.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core::error::{Result, RuleError};
use crate::core::registry::Registry;
use crate::core::types::{
    Amount, CollectiveId, DistanceMetric, EntityId, GridLocation, ResourceId, TagId, Tick, VibeId,
};
use crate::entity::{
    Collective, Entity, GameScope, Holder, Inventory, ObjectType, ResourceLimit, StatsTracker,
};
use crate::spatial::SparseHashGrid;
use crate::tags::{collective_tag, TagIndex};

pub struct World {
    pub current_tick: Tick,
    registry: Arc<Registry>,
    tags: TagIndex,
    entities: Vec<Entity>,
    collectives: Vec<Collective>,
    collective_tags: Vec<Option<TagId>>,
    game: GameScope,
    spatial: SparseHashGrid,
}

impl World {
    /// Empty world; every collective starts with `default_limits` and no resources
    pub fn new(registry: Arc<Registry>, default_limits: Vec<ResourceLimit>) -> Self {
        let stat_count = registry.stats.len();
        let collectives = registry
            .collectives
            .iter()
            .map(|(id, name)| Collective {
                id,
                name: name.to_string(),
                inventory: Inventory::new(default_limits.clone()),
                stats: StatsTracker::new(stat_count),
            })
            .collect();
        let collective_tags = registry
            .collectives
            .iter()
            .map(|(_, name)| registry.tags.get(&collective_tag(name)))
            .collect();
        let tags = TagIndex::new(registry.tags.len(), registry.tags.capacity());
        Self {
            current_tick: 0,
            tags,
            entities: Vec::new(),
            collectives,
            collective_tags,
            game: GameScope {
                inventory: Inventory::new(default_limits),
                stats: StatsTracker::new(stat_count),
            },
            spatial: SparseHashGrid::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }

    // === ENTITIES ===

    /// Create an entity from its object type; ids follow registration order
    pub fn spawn(
        &mut self,
        object_type: &ObjectType,
        location: GridLocation,
        collective: Option<CollectiveId>,
    ) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        let mut inventory = Inventory::new(object_type.limits.clone());
        for &(resource, amount) in &object_type.initial_inventory {
            inventory.set(resource, amount);
        }
        self.entities.push(Entity {
            id,
            object_type: object_type.id,
            location,
            inventory,
            collective: None,
            vibe: object_type.vibe,
            frozen_until: 0,
            stats: StatsTracker::new(self.registry.stats.len()),
        });
        self.tags.track(id);
        self.tags.add(id, object_type.type_tag);
        for &tag in &object_type.tags {
            self.tags.add(id, tag);
        }
        self.spatial.insert(id, location);
        if collective.is_some() {
            self.set_collective(id, collective);
        }
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    /// Entities in registration order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Write hook for the external movement layer
    pub fn move_entity(&mut self, id: EntityId, to: GridLocation) -> Result<()> {
        let entity = self
            .entities
            .get_mut(id.index())
            .ok_or(RuleError::EntityNotFound(id))?;
        let from = entity.location;
        entity.location = to;
        self.spatial.relocate(id, from, to);
        Ok(())
    }

    pub fn set_vibe(&mut self, id: EntityId, vibe: VibeId) -> Result<()> {
        let entity = self
            .entities
            .get_mut(id.index())
            .ok_or(RuleError::EntityNotFound(id))?;
        entity.vibe = vibe;
        Ok(())
    }

    /// Entities within `radius` of `center`, ascending by id
    pub fn entities_near(
        &self,
        center: GridLocation,
        radius: u32,
        metric: DistanceMetric,
    ) -> Vec<EntityId> {
        self.spatial.query_radius(center, radius, metric)
    }

    // === TAGS ===

    pub fn has_tag(&self, id: EntityId, tag: TagId) -> bool {
        self.tags.has(id, tag)
    }

    pub fn add_tag(&mut self, id: EntityId, tag: TagId) -> bool {
        self.entity(id).is_some() && self.tags.add(id, tag)
    }

    pub fn remove_tag(&mut self, id: EntityId, tag: TagId) -> bool {
        self.tags.remove(id, tag)
    }

    /// Members of a tag looked up by name; unknown names yield nothing
    pub fn members_by_name(&self, name: &str) -> Vec<EntityId> {
        self.registry
            .tags
            .get(name)
            .map(|tag| self.tags.members(tag).iter().copied().collect())
            .unwrap_or_default()
    }

    // === COLLECTIVES ===

    pub fn collective(&self, id: CollectiveId) -> Option<&Collective> {
        self.collectives.get(id.0 as usize)
    }

    pub fn collective_mut(&mut self, id: CollectiveId) -> Option<&mut Collective> {
        self.collectives.get_mut(id.0 as usize)
    }

    pub fn collectives(&self) -> &[Collective] {
        &self.collectives
    }

    /// Derived membership, ascending by id
    pub fn collective_members(&self, id: CollectiveId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.collective == Some(id))
            .map(|e| e.id)
            .collect()
    }

    /// Change an entity's collective and keep its `collective:<name>` tag in step
    pub fn set_collective(&mut self, id: EntityId, collective: Option<CollectiveId>) -> bool {
        let Some(entity) = self.entities.get_mut(id.index()) else {
            return false;
        };
        let previous = entity.collective;
        if previous == collective {
            return false;
        }
        entity.collective = collective;
        if let Some(tag) = previous.and_then(|c| self.collective_tag(c)) {
            self.tags.remove(id, tag);
        }
        if let Some(tag) = collective.and_then(|c| self.collective_tag(c)) {
            self.tags.add(id, tag);
        }
        true
    }

    fn collective_tag(&self, id: CollectiveId) -> Option<TagId> {
        self.collective_tags.get(id.0 as usize).copied().flatten()
    }

    // === INVENTORIES & STATS ===

    pub fn game(&self) -> &GameScope {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameScope {
        &mut self.game
    }

    pub fn inventory(&self, holder: Holder) -> Option<&Inventory> {
        match holder {
            Holder::Game => Some(&self.game.inventory),
            Holder::Entity(id) => self.entity(id).map(|e| &e.inventory),
            Holder::Collective(id) => self.collective(id).map(|c| &c.inventory),
        }
    }

    pub fn inventory_mut(&mut self, holder: Holder) -> Option<&mut Inventory> {
        match holder {
            Holder::Game => Some(&mut self.game.inventory),
            Holder::Entity(id) => self.entity_mut(id).map(|e| &mut e.inventory),
            Holder::Collective(id) => self.collective_mut(id).map(|c| &mut c.inventory),
        }
    }

    pub fn stats(&self, holder: Holder) -> Option<&StatsTracker> {
        match holder {
            Holder::Game => Some(&self.game.stats),
            Holder::Entity(id) => self.entity(id).map(|e| &e.stats),
            Holder::Collective(id) => self.collective(id).map(|c| &c.stats),
        }
    }

    pub fn stats_mut(&mut self, holder: Holder) -> Option<&mut StatsTracker> {
        match holder {
            Holder::Game => Some(&mut self.game.stats),
            Holder::Entity(id) => self.entity_mut(id).map(|e| &mut e.stats),
            Holder::Collective(id) => self.collective_mut(id).map(|c| &mut c.stats),
        }
    }

    /// Move exact amounts from one holder to another.
    ///
    /// Every resource must fit on both sides without clamping, otherwise
    /// nothing changes and `false` is returned. Negative amounts move the
    /// other way.
    pub fn transfer(&mut self, from: Holder, to: Holder, resources: &[(ResourceId, Amount)]) -> bool {
        if from == to {
            return false;
        }
        let (Some(source), Some(dest)) = (self.inventory(from), self.inventory(to)) else {
            return false;
        };
        let fits = resources
            .iter()
            .all(|&(r, amount)| source.fits(r, -amount) && dest.fits(r, amount));
        if !fits {
            return false;
        }
        for &(resource, amount) in resources {
            if let Some(inv) = self.inventory_mut(from) {
                inv.update(resource, -amount);
            }
            if let Some(inv) = self.inventory_mut(to) {
                inv.update(resource, amount);
            }
        }
        true
    }

    // === SNAPSHOT ===

    /// Serializable, name-keyed view of the whole state
    pub fn snapshot(&self) -> WorldSnapshot {
        let registry = &*self.registry;
        let name_inventory = |inv: &Inventory| -> BTreeMap<String, Amount> {
            inv.iter()
                .filter_map(|(r, amount)| {
                    registry.resources.name(r).map(|n| (n.to_string(), amount))
                })
                .collect()
        };
        let name_stats = |stats: &StatsTracker| -> BTreeMap<String, f64> {
            registry
                .stats
                .iter()
                .map(|(id, name)| (name.to_string(), stats.get(id)))
                .collect()
        };
        let collective_name = |id: Option<CollectiveId>| {
            id.and_then(|c| registry.collectives.name(c)).map(str::to_string)
        };

        WorldSnapshot {
            tick: self.current_tick,
            entities: self
                .entities
                .iter()
                .map(|e| EntitySnapshot {
                    id: e.id,
                    object_type: registry
                        .object_types
                        .name(e.object_type)
                        .unwrap_or_default()
                        .to_string(),
                    location: e.location,
                    tags: self
                        .tags
                        .tags_of(e.id)
                        .filter_map(|t| registry.tags.name(t).map(str::to_string))
                        .collect(),
                    inventory: name_inventory(&e.inventory),
                    collective: collective_name(e.collective),
                    frozen_until: e.frozen_until,
                    stats: name_stats(&e.stats),
                })
                .collect(),
            collectives: self
                .collectives
                .iter()
                .map(|c| CollectiveSnapshot {
                    name: c.name.clone(),
                    inventory: name_inventory(&c.inventory),
                    members: self.collective_members(c.id),
                    stats: name_stats(&c.stats),
                })
                .collect(),
            game_inventory: name_inventory(&self.game.inventory),
            game_stats: name_stats(&self.game.stats),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub entities: Vec<EntitySnapshot>,
    pub collectives: Vec<CollectiveSnapshot>,
    pub game_inventory: BTreeMap<String, Amount>,
    pub game_stats: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub object_type: String,
    pub location: GridLocation,
    pub tags: Vec<String>,
    pub inventory: BTreeMap<String, Amount>,
    pub collective: Option<String>,
    pub frozen_until: Tick,
    pub stats: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectiveSnapshot {
    pub name: String,
    pub inventory: BTreeMap<String, Amount>,
    pub members: Vec<EntityId>,
    pub stats: BTreeMap<String, f64>,
}
