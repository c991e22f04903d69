//! Query Engine
//!
//! Plain queries read a tag's members and filter them. Closure queries grow a
//! root set breadth-first through bridge filters. Materialized queries store
//! their result as a tag and only change when explicitly recomputed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::types::{DistanceMetric, EntityId, TagId};
use crate::ecs::world::World;
use crate::rules::context::{EvalContext, StatBaselines, TickRng};
use crate::rules::filter::{all_pass, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrder {
    /// Shuffle with the tick stream before truncating
    Random,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub tag: TagId,
    pub filters: Vec<Filter>,
    pub max_items: Option<usize>,
    pub order_by: Option<QueryOrder>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureQuery {
    pub source: Box<ObjectQuery>,
    /// Checked with (already included entity, candidate neighbour)
    pub bridge: Vec<Filter>,
    /// Chebyshev radius for neighbour scans
    pub radius: u32,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectQuery {
    Tag(Query),
    Closure(ClosureQuery),
}

impl ObjectQuery {
    /// Evaluate to an ordered, duplicate-free entity list.
    ///
    /// Filters see (actor, candidate); without an actor each candidate is
    /// its own actor.
    pub fn evaluate(&self, ctx: &mut EvalContext<'_>, actor: Option<EntityId>) -> Vec<EntityId> {
        match self {
            ObjectQuery::Tag(query) => query.evaluate(ctx, actor),
            ObjectQuery::Closure(closure) => closure.evaluate(ctx, actor),
        }
    }
}

impl Query {
    pub fn evaluate(&self, ctx: &mut EvalContext<'_>, actor: Option<EntityId>) -> Vec<EntityId> {
        let world = ctx.world;
        let mut found: Vec<EntityId> = world
            .tags()
            .members(self.tag)
            .iter()
            .copied()
            .filter(|&e| all_pass(&self.filters, ctx, actor.unwrap_or(e), e))
            .collect();
        if self.order_by == Some(QueryOrder::Random) {
            ctx.rng.shuffle(&mut found);
        }
        if let Some(max) = self.max_items {
            found.truncate(max);
        }
        found
    }
}

impl ClosureQuery {
    pub fn evaluate(&self, ctx: &mut EvalContext<'_>, actor: Option<EntityId>) -> Vec<EntityId> {
        let world = ctx.world;
        let mut visited: BTreeSet<EntityId> = BTreeSet::new();
        let mut result: Vec<EntityId> = self
            .source
            .evaluate(ctx, actor)
            .into_iter()
            .filter(|e| visited.insert(*e))
            .collect();

        let mut frontier = result.clone();
        let mut passes = 0usize;
        while !frontier.is_empty() {
            passes += 1;
            let mut next = Vec::new();
            for &from in &frontier {
                let Some(origin) = world.entity(from) else {
                    continue;
                };
                for candidate in
                    world.entities_near(origin.location, self.radius, DistanceMetric::Chebyshev)
                {
                    if visited.contains(&candidate) {
                        continue;
                    }
                    if all_pass(&self.bridge, ctx, from, candidate) {
                        visited.insert(candidate);
                        result.push(candidate);
                        next.push(candidate);
                    }
                }
            }
            frontier = next;
        }
        tracing::trace!(passes, size = result.len(), "closure query expanded");

        if !self.filters.is_empty() {
            result.retain(|&e| all_pass(&self.filters, ctx, actor.unwrap_or(e), e));
        }
        result
    }
}

/// A query whose result set is published as a tag
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedQuery {
    pub tag: TagId,
    pub name: String,
    pub query: ObjectQuery,
}

/// Membership changes made by one recompute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecomputeDiff {
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
}

impl MaterializedQuery {
    /// Re-run the backing query and swap the tag's membership to match,
    /// touching only entities whose membership actually changes
    pub fn recompute(
        &self,
        world: &mut World,
        rng: &mut TickRng,
        baselines: &StatBaselines,
    ) -> RecomputeDiff {
        let fresh: BTreeSet<EntityId> = {
            let mut ctx = EvalContext {
                world: &*world,
                rng,
                baselines,
            };
            self.query.evaluate(&mut ctx, None).into_iter().collect()
        };
        let current = world.tags().members(self.tag).clone();

        let removed: Vec<EntityId> = current.difference(&fresh).copied().collect();
        let added: Vec<EntityId> = fresh.difference(&current).copied().collect();
        for &e in &removed {
            world.remove_tag(e, self.tag);
        }
        for &e in &added {
            world.add_tag(e, self.tag);
        }
        tracing::debug!(
            query = %self.name,
            added = added.len(),
            removed = removed.len(),
            "materialized query recomputed"
        );
        RecomputeDiff { added, removed }
    }
}
