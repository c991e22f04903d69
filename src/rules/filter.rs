//! Filter Evaluator
//!
//! Filters are pure predicates over an (actor, target) pair. Handler filter
//! lists are AND-composed by the caller; `Or` and `Not` are the only
//! explicit combinators.

use crate::core::types::{Amount, CollectiveId, DistanceMetric, EntityId, ResourceId, TagId, VibeId};
use crate::rules::context::{EntityRef, EvalContext, Side};
use crate::rules::query::ObjectQuery;
use crate::rules::values::{Comparison, GameValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentCondition {
    /// Subject belongs to some collective
    Aligned,
    Unaligned,
    /// Actor and target share a collective
    SameCollective,
    /// Actor and target both belong to collectives, and they differ
    DifferentCollective,
    Collective(CollectiveId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Tag {
        target: EntityRef,
        tag: TagId,
    },
    /// `tags` holds every registered tag matching the prefix
    TagPrefix {
        target: EntityRef,
        tags: Vec<TagId>,
    },
    SharedTagPrefix {
        tags: Vec<TagId>,
    },
    Resource {
        target: EntityRef,
        requirements: Vec<(ResourceId, Amount)>,
    },
    Alignment {
        target: Side,
        condition: AlignmentCondition,
    },
    Vibe {
        target: Side,
        vibe: VibeId,
    },
    /// Without a query: actor-target distance. With a query: subject near
    /// any query result.
    MaxDistance {
        target: Side,
        radius: u32,
        query: Option<Box<ObjectQuery>>,
    },
    Near {
        target: Side,
        tag: TagId,
        radius: u32,
        filters: Vec<Filter>,
    },
    GameValue {
        target: Side,
        value: GameValue,
        op: Comparison,
        threshold: f64,
    },
    Not(Box<Filter>),
    Or(Vec<Filter>),
}

/// AND over a filter list; an empty list passes
pub fn all_pass(filters: &[Filter], ctx: &mut EvalContext<'_>, actor: EntityId, target: EntityId) -> bool {
    filters.iter().all(|f| f.evaluate(ctx, actor, target))
}

impl Filter {
    pub fn evaluate(&self, ctx: &mut EvalContext<'_>, actor: EntityId, target: EntityId) -> bool {
        let world = ctx.world;
        match self {
            Filter::Tag { target: r, tag } => r
                .entity(actor, target)
                .is_some_and(|e| world.has_tag(e, *tag)),

            Filter::TagPrefix { target: r, tags } => r
                .entity(actor, target)
                .is_some_and(|e| world.tags().has_any(e, tags)),

            Filter::SharedTagPrefix { tags } => tags
                .iter()
                .any(|&t| world.has_tag(actor, t) && world.has_tag(target, t)),

            Filter::Resource {
                target: r,
                requirements,
            } => r
                .holder(world, actor, target)
                .and_then(|h| world.inventory(h))
                .is_some_and(|inv| {
                    requirements
                        .iter()
                        .all(|&(res, min)| inv.has_at_least(res, min))
                }),

            Filter::Alignment {
                target: side,
                condition,
            } => {
                let collective_of = |id| world.entity(id).and_then(|e| e.collective);
                let subject = collective_of(side.pick(actor, target));
                match condition {
                    AlignmentCondition::Aligned => subject.is_some(),
                    AlignmentCondition::Unaligned => {
                        world.entity(side.pick(actor, target)).is_some() && subject.is_none()
                    }
                    AlignmentCondition::SameCollective => {
                        let a = collective_of(actor);
                        a.is_some() && a == collective_of(target)
                    }
                    AlignmentCondition::DifferentCollective => {
                        match (collective_of(actor), collective_of(target)) {
                            (Some(a), Some(t)) => a != t,
                            _ => false,
                        }
                    }
                    AlignmentCondition::Collective(id) => subject == Some(*id),
                }
            }

            Filter::Vibe { target: side, vibe } => world
                .entity(side.pick(actor, target))
                .is_some_and(|e| e.vibe == *vibe),

            Filter::MaxDistance {
                target: side,
                radius,
                query,
            } => match query {
                None => {
                    if *radius == 0 {
                        return true;
                    }
                    let (Some(a), Some(t)) = (world.entity(actor), world.entity(target)) else {
                        return false;
                    };
                    within_sq(a.location.distance_sq(&t.location), *radius)
                }
                Some(query) => {
                    let Some(subject) = world.entity(side.pick(actor, target)) else {
                        return false;
                    };
                    let found = query.evaluate(ctx, Some(actor));
                    if *radius == 0 {
                        return !found.is_empty();
                    }
                    found.iter().any(|&id| {
                        world.entity(id).is_some_and(|o| {
                            within_sq(subject.location.distance_sq(&o.location), *radius)
                        })
                    })
                }
            },

            Filter::Near {
                target: side,
                tag,
                radius,
                filters,
            } => {
                let subject_id = side.pick(actor, target);
                let Some(subject) = world.entity(subject_id) else {
                    return false;
                };
                world
                    .entities_near(subject.location, *radius, DistanceMetric::Chebyshev)
                    .into_iter()
                    .filter(|&id| id != subject_id && world.has_tag(id, *tag))
                    .any(|id| all_pass(filters, ctx, actor, id))
            }

            Filter::GameValue {
                target: side,
                value,
                op,
                threshold,
            } => {
                let resolved = value.resolve(world, ctx.baselines, side.pick(actor, target));
                op.compare(resolved, *threshold)
            }

            Filter::Not(inner) => !inner.evaluate(ctx, actor, target),

            Filter::Or(inner) => inner.iter().any(|f| f.evaluate(ctx, actor, target)),
        }
    }

    /// The alignment condition this filter gates on at top level, if any
    pub fn alignment_condition(&self) -> Option<AlignmentCondition> {
        match self {
            Filter::Alignment { condition, .. } => Some(*condition),
            _ => None,
        }
    }
}

#[inline]
fn within_sq(distance_sq: u64, radius: u32) -> bool {
    distance_sq <= (radius as u64) * (radius as u64)
}
