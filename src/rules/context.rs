//! Evaluation contexts shared by filters, queries and mutations

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, StatId, Tick};
use crate::ecs::world::World;
use crate::entity::Holder;
use crate::rules::query::MaterializedQuery;

/// Which side of an (actor, target) pair a filter or mutation looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Actor,
    #[default]
    Target,
}

impl Side {
    #[inline]
    pub fn pick(self, actor: EntityId, target: EntityId) -> EntityId {
        match self {
            Side::Actor => actor,
            Side::Target => target,
        }
    }
}

/// An entity, or the collective an entity belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    Actor,
    #[default]
    Target,
    ActorCollective,
    TargetCollective,
}

impl EntityRef {
    /// The entity this ref addresses, if it addresses an entity at all
    pub fn entity(self, actor: EntityId, target: EntityId) -> Option<EntityId> {
        match self {
            EntityRef::Actor => Some(actor),
            EntityRef::Target => Some(target),
            EntityRef::ActorCollective | EntityRef::TargetCollective => None,
        }
    }

    /// Resolve to an inventory/stat holder; `None` when the entity is missing
    /// or the referenced collective is unset
    pub fn holder(self, world: &World, actor: EntityId, target: EntityId) -> Option<Holder> {
        match self {
            EntityRef::Actor => world.entity(actor).map(|_| Holder::Entity(actor)),
            EntityRef::Target => world.entity(target).map(|_| Holder::Entity(target)),
            EntityRef::ActorCollective => world
                .entity(actor)
                .and_then(|e| e.collective)
                .map(Holder::Collective),
            EntityRef::TargetCollective => world
                .entity(target)
                .and_then(|e| e.collective)
                .map(Holder::Collective),
        }
    }
}

/// The single random stream for one tick
#[derive(Debug, Clone)]
pub struct TickRng(ChaCha8Rng);

impl TickRng {
    /// Seeded from the run seed with the tick as the ChaCha stream id
    pub fn for_tick(seed: u64, tick: Tick) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(tick);
        Self(rng)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}

/// Stat readings captured at the start of a tick, used for delta values
#[derive(Debug, Clone, Default)]
pub struct StatBaselines {
    game: Vec<f64>,
    entities: Vec<Vec<f64>>,
    collectives: Vec<Vec<f64>>,
}

impl StatBaselines {
    pub fn capture(world: &World) -> Self {
        Self {
            game: world.game().stats.values().to_vec(),
            entities: world
                .entities()
                .map(|e| e.stats.values().to_vec())
                .collect(),
            collectives: world
                .collectives()
                .iter()
                .map(|c| c.stats.values().to_vec())
                .collect(),
        }
    }

    /// Reading at capture time (0 for anything created since)
    pub fn get(&self, holder: Holder, stat: StatId) -> f64 {
        let values = match holder {
            Holder::Game => Some(&self.game),
            Holder::Entity(id) => self.entities.get(id.index()),
            Holder::Collective(id) => self.collectives.get(id.0 as usize),
        };
        values
            .and_then(|v| v.get(stat.0 as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Read-only view used by filters and queries
pub struct EvalContext<'a> {
    pub world: &'a World,
    pub rng: &'a mut TickRng,
    pub baselines: &'a StatBaselines,
}

/// Mutable view used by the Mutation Engine
pub struct MutationContext<'a> {
    pub world: &'a mut World,
    pub rng: &'a mut TickRng,
    pub baselines: &'a StatBaselines,
    pub materialized: &'a [MaterializedQuery],
}

impl<'a> MutationContext<'a> {
    /// Borrow a read-only evaluation view
    pub fn eval(&mut self) -> EvalContext<'_> {
        EvalContext {
            world: &*self.world,
            rng: &mut *self.rng,
            baselines: self.baselines,
        }
    }
}
