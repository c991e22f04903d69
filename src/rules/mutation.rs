//! Mutation Engine
//!
//! Each mutation is applied on its own: a mutation that cannot take effect
//! reports `Rejected` and leaves the world untouched, and the caller carries
//! on with the next one.

use serde::{Deserialize, Serialize};

use crate::core::types::{Amount, CollectiveId, EntityId, ResourceId, StatId, TagId, Tick};
use crate::entity::Holder;
use crate::rules::context::{EntityRef, MutationContext, Side};
use crate::rules::query::ObjectQuery;
use crate::rules::values::GameValue;

/// Which stats tracker a stats mutation writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsTarget {
    Game,
    /// The target entity
    #[default]
    Agent,
    /// The target entity's collective
    Collective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignTo {
    ActorCollective,
    Unaligned,
    Collective(CollectiveId),
}

/// Where a set-game-value delta comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    Static(f64),
    Dynamic(GameValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Signed deltas, clamped to the holder's limits
    ResourceDelta {
        target: EntityRef,
        deltas: Vec<(ResourceId, Amount)>,
    },
    /// Exact move between two holders, all-or-nothing
    ResourceTransfer {
        source: EntityRef,
        destination: EntityRef,
        resources: Vec<(ResourceId, Amount)>,
    },
    Alignment {
        target: Side,
        align_to: AlignTo,
    },
    Freeze {
        target: Side,
        duration: Tick,
    },
    /// Empty `resources` clears everything
    ClearInventory {
        target: EntityRef,
        resources: Vec<ResourceId>,
    },
    AddTag {
        target: Side,
        tag: TagId,
    },
    RemoveTag {
        target: Side,
        tag: TagId,
    },
    /// `tags` holds every registered tag matching the prefix
    RemoveTagsWithPrefix {
        target: Side,
        tags: Vec<TagId>,
    },
    Stats {
        target: StatsTarget,
        stat: StatId,
        delta: f64,
    },
    SetGameValue {
        target: Side,
        value: GameValue,
        amount: ValueSource,
    },
    /// Apply `deltas` to every query result; with a `source`, each result is
    /// an exact transfer against the source
    QueryInventory {
        query: ObjectQuery,
        deltas: Vec<(ResourceId, Amount)>,
        source: Option<EntityRef>,
    },
    /// Indices into the materialized query table
    RecomputeMaterialized {
        queries: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// Local failure; nothing changed
    Rejected,
    /// Batch mutation where some pairs were skipped
    Partial { applied: usize, rejected: usize },
}

impl MutationOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, MutationOutcome::Rejected)
    }
}

impl Mutation {
    pub fn apply(&self, ctx: &mut MutationContext<'_>, actor: EntityId, target: EntityId) -> MutationOutcome {
        match self {
            Mutation::ResourceDelta { target: r, deltas } => {
                let Some(holder) = r.holder(ctx.world, actor, target) else {
                    return MutationOutcome::Rejected;
                };
                let Some(inventory) = ctx.world.inventory_mut(holder) else {
                    return MutationOutcome::Rejected;
                };
                for &(resource, delta) in deltas {
                    inventory.update(resource, delta);
                }
                MutationOutcome::Applied
            }

            Mutation::ResourceTransfer {
                source,
                destination,
                resources,
            } => {
                let from = source.holder(ctx.world, actor, target);
                let to = destination.holder(ctx.world, actor, target);
                match (from, to) {
                    (Some(from), Some(to)) if ctx.world.transfer(from, to, resources) => {
                        MutationOutcome::Applied
                    }
                    _ => {
                        tracing::debug!(?from, ?to, "resource transfer rejected");
                        MutationOutcome::Rejected
                    }
                }
            }

            Mutation::Alignment {
                target: side,
                align_to,
            } => {
                let subject = side.pick(actor, target);
                let collective = match align_to {
                    AlignTo::Unaligned => None,
                    AlignTo::Collective(id) => Some(*id),
                    AlignTo::ActorCollective => {
                        match ctx.world.entity(actor).and_then(|e| e.collective) {
                            Some(id) => Some(id),
                            None => return MutationOutcome::Rejected,
                        }
                    }
                };
                if ctx.world.entity(subject).is_none() {
                    return MutationOutcome::Rejected;
                }
                ctx.world.set_collective(subject, collective);
                MutationOutcome::Applied
            }

            Mutation::Freeze {
                target: side,
                duration,
            } => {
                let until = ctx.world.current_tick.saturating_add(*duration);
                match ctx.world.entity_mut(side.pick(actor, target)) {
                    Some(entity) => {
                        entity.frozen_until = until;
                        MutationOutcome::Applied
                    }
                    None => MutationOutcome::Rejected,
                }
            }

            Mutation::ClearInventory {
                target: r,
                resources,
            } => {
                let holder = r.holder(ctx.world, actor, target);
                match holder.and_then(|h| ctx.world.inventory_mut(h)) {
                    Some(inventory) => {
                        inventory.clear(resources);
                        MutationOutcome::Applied
                    }
                    None => MutationOutcome::Rejected,
                }
            }

            Mutation::AddTag { target: side, tag } => {
                let subject = side.pick(actor, target);
                if ctx.world.entity(subject).is_none() {
                    return MutationOutcome::Rejected;
                }
                ctx.world.add_tag(subject, *tag);
                MutationOutcome::Applied
            }

            Mutation::RemoveTag { target: side, tag } => {
                ctx.world.remove_tag(side.pick(actor, target), *tag);
                MutationOutcome::Applied
            }

            Mutation::RemoveTagsWithPrefix { target: side, tags } => {
                let subject = side.pick(actor, target);
                let present: Vec<TagId> = tags
                    .iter()
                    .copied()
                    .filter(|&t| ctx.world.has_tag(subject, t))
                    .collect();
                for tag in present {
                    ctx.world.remove_tag(subject, tag);
                }
                MutationOutcome::Applied
            }

            Mutation::Stats {
                target: stats_target,
                stat,
                delta,
            } => {
                let holder = match stats_target {
                    StatsTarget::Game => Some(Holder::Game),
                    StatsTarget::Agent => ctx.world.entity(target).map(|_| Holder::Entity(target)),
                    StatsTarget::Collective => ctx
                        .world
                        .entity(target)
                        .and_then(|e| e.collective)
                        .map(Holder::Collective),
                };
                match holder.and_then(|h| ctx.world.stats_mut(h)) {
                    Some(stats) => {
                        stats.add(*stat, *delta);
                        MutationOutcome::Applied
                    }
                    None => MutationOutcome::Rejected,
                }
            }

            Mutation::SetGameValue {
                target: side,
                value,
                amount,
            } => {
                let scope_entity = side.pick(actor, target);
                let delta = match amount {
                    ValueSource::Static(delta) => *delta,
                    ValueSource::Dynamic(source) => {
                        source.resolve(ctx.world, ctx.baselines, scope_entity)
                    }
                };
                match *value {
                    GameValue::Inventory { scope, resource } => {
                        let holder = scope.holder(ctx.world, scope_entity);
                        match holder.and_then(|h| ctx.world.inventory_mut(h)) {
                            Some(inventory) => {
                                inventory.update(resource, delta.round() as Amount);
                                MutationOutcome::Applied
                            }
                            None => MutationOutcome::Rejected,
                        }
                    }
                    GameValue::Stat { scope, stat, .. } => {
                        let holder = scope.holder(ctx.world, scope_entity);
                        match holder.and_then(|h| ctx.world.stats_mut(h)) {
                            Some(stats) => {
                                stats.add(stat, delta);
                                MutationOutcome::Applied
                            }
                            None => MutationOutcome::Rejected,
                        }
                    }
                    _ => MutationOutcome::Rejected,
                }
            }

            Mutation::QueryInventory {
                query,
                deltas,
                source,
            } => {
                let targets = query.evaluate(&mut ctx.eval(), Some(actor));
                let Some(source) = source else {
                    for &t in &targets {
                        if let Some(inventory) = ctx.world.inventory_mut(Holder::Entity(t)) {
                            for &(resource, delta) in deltas {
                                inventory.update(resource, delta);
                            }
                        }
                    }
                    return MutationOutcome::Applied;
                };
                let Some(from) = source.holder(ctx.world, actor, target) else {
                    return MutationOutcome::Rejected;
                };
                let (mut applied, mut rejected) = (0usize, 0usize);
                for t in targets {
                    let to = Holder::Entity(t);
                    if to == from {
                        continue;
                    }
                    if ctx.world.transfer(from, to, deltas) {
                        applied += 1;
                    } else {
                        tracing::debug!(?from, target = ?t, "query inventory transfer skipped");
                        rejected += 1;
                    }
                }
                if rejected == 0 {
                    MutationOutcome::Applied
                } else {
                    MutationOutcome::Partial { applied, rejected }
                }
            }

            Mutation::RecomputeMaterialized { queries } => {
                let materialized = ctx.materialized;
                for &idx in queries {
                    if let Some(mq) = materialized.get(idx) {
                        mq.recompute(ctx.world, ctx.rng, ctx.baselines);
                    }
                }
                MutationOutcome::Applied
            }
        }
    }
}
