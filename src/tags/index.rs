//! Tag Index: per-entity bitsets plus per-tag member sets
//!
//! The bitset answers `has` in O(1); the member sets give ordered iteration
//! for queries. Both are only ever written together, through `add` and
//! `remove`, so they cannot drift apart.

use std::collections::BTreeSet;

use crate::core::types::{EntityId, TagId};
use crate::tags::bitset::TagBits;

static NO_MEMBERS: BTreeSet<EntityId> = BTreeSet::new();

#[derive(Debug, Clone)]
pub struct TagIndex {
    capacity: usize,
    bits: Vec<TagBits>,
    members: Vec<BTreeSet<EntityId>>,
    generation: u64,
}

impl TagIndex {
    /// Create an index for `tag_count` registered tags out of `capacity`
    pub fn new(tag_count: usize, capacity: usize) -> Self {
        Self {
            capacity,
            bits: Vec::new(),
            members: vec![BTreeSet::new(); tag_count],
            generation: 0,
        }
    }

    /// Make room for an entity's bitset
    pub fn track(&mut self, entity: EntityId) {
        if self.bits.len() <= entity.index() {
            self.bits
                .resize_with(entity.index() + 1, || TagBits::with_capacity(self.capacity));
        }
    }

    /// Add a tag; returns false when it was already present or unknown
    pub fn add(&mut self, entity: EntityId, tag: TagId) -> bool {
        let slot = tag.0 as usize;
        if slot >= self.members.len() {
            return false;
        }
        self.track(entity);
        if !self.bits[entity.index()].insert(tag) {
            return false;
        }
        self.members[slot].insert(entity);
        self.generation += 1;
        true
    }

    /// Remove a tag; returns false when it was already absent
    pub fn remove(&mut self, entity: EntityId, tag: TagId) -> bool {
        let Some(bits) = self.bits.get_mut(entity.index()) else {
            return false;
        };
        if !bits.remove(tag) {
            return false;
        }
        if let Some(members) = self.members.get_mut(tag.0 as usize) {
            members.remove(&entity);
        }
        self.generation += 1;
        true
    }

    #[inline]
    pub fn has(&self, entity: EntityId, tag: TagId) -> bool {
        self.bits
            .get(entity.index())
            .is_some_and(|bits| bits.contains(tag))
    }

    /// True if the entity carries at least one of `tags`
    pub fn has_any(&self, entity: EntityId, tags: &[TagId]) -> bool {
        tags.iter().any(|&tag| self.has(entity, tag))
    }

    /// Entities carrying `tag`, ascending by id
    pub fn members(&self, tag: TagId) -> &BTreeSet<EntityId> {
        self.members.get(tag.0 as usize).unwrap_or(&NO_MEMBERS)
    }

    pub fn count(&self, tag: TagId) -> usize {
        self.members(tag).len()
    }

    /// Tags carried by `entity`, ascending by id
    pub fn tags_of(&self, entity: EntityId) -> impl Iterator<Item = TagId> + '_ {
        self.bits.get(entity.index()).into_iter().flat_map(|b| b.iter())
    }

    /// Bumped on every effective membership change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tag_count(&self) -> usize {
        self.members.len()
    }
}
