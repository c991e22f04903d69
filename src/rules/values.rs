//! Game Value Resolver
//!
//! A `GameValue` describes a number to read from the world: an inventory
//! amount, a stat, a tag population, an object count or a literal.

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ResourceId, StatId, TagId};
use crate::ecs::world::World;
use crate::entity::Holder;
use crate::rules::context::StatBaselines;

/// Whose inventory or stats a value reads, relative to a scope entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueScope {
    #[default]
    Agent,
    Game,
    Collective,
}

impl ValueScope {
    pub fn holder(self, world: &World, entity: EntityId) -> Option<Holder> {
        match self {
            ValueScope::Game => Some(Holder::Game),
            ValueScope::Agent => world.entity(entity).map(|_| Holder::Entity(entity)),
            ValueScope::Collective => world
                .entity(entity)
                .and_then(|e| e.collective)
                .map(Holder::Collective),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    #[inline]
    pub fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Ne => lhs != rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameValue {
    Inventory { scope: ValueScope, resource: ResourceId },
    /// Raw cumulative value, or the change since the tick baseline
    Stat { scope: ValueScope, stat: StatId, delta: bool },
    TagCount { tag: TagId },
    /// Population of an object type's implicit type tag
    NumObjects { type_tag: TagId },
    Constant(f64),
}

impl GameValue {
    /// Resolve against `entity` as the scope entity.
    ///
    /// Scopes that do not resolve (missing entity, unaligned entity asked for
    /// its collective) read as 0.
    pub fn resolve(&self, world: &World, baselines: &StatBaselines, entity: EntityId) -> f64 {
        match *self {
            GameValue::Inventory { scope, resource } => scope
                .holder(world, entity)
                .and_then(|h| world.inventory(h))
                .map(|inv| inv.get(resource) as f64)
                .unwrap_or(0.0),
            GameValue::Stat { scope, stat, delta } => {
                let Some(holder) = scope.holder(world, entity) else {
                    return 0.0;
                };
                let current = world.stats(holder).map(|s| s.get(stat)).unwrap_or(0.0);
                if delta {
                    current - baselines.get(holder, stat)
                } else {
                    current
                }
            }
            GameValue::TagCount { tag } => world.tags().count(tag) as f64,
            GameValue::NumObjects { type_tag } => world.tags().count(type_tag) as f64,
            GameValue::Constant(value) => value,
        }
    }

    /// Values a set-game-value mutation can write to
    pub fn is_writable(&self) -> bool {
        matches!(self, GameValue::Inventory { .. } | GameValue::Stat { .. })
    }
}
