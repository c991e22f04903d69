//! Area-of-effect pass
//!
//! Every AOE source applies its handler to each entity in range. Coverage is
//! computed from positions at the start of the pass; filters are checked
//! immediately before each effect so earlier effects in the pass are visible
//! to later ones.

use std::collections::BTreeMap;

use crate::core::types::{DistanceMetric, EntityId, GridLocation};
use crate::entity::ObjectType;
use crate::rules::context::MutationContext;
use crate::rules::filter::AlignmentCondition;
use crate::simulation::rule_eval::{evaluate_handler, Handler};

/// Ordering class of an effect on a shared target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AoeStance {
    /// Gated by a top-level `different_collective` filter; applied first
    Hostile,
    Neutral,
}

impl AoeStance {
    pub fn classify(handler: &Handler) -> Self {
        let hostile = handler
            .filters
            .iter()
            .any(|f| f.alignment_condition() == Some(AlignmentCondition::DifferentCollective));
        if hostile {
            AoeStance::Hostile
        } else {
            AoeStance::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AoeEffect {
    pub handler: Handler,
    pub radius: u32,
    pub metric: DistanceMetric,
    pub include_source: bool,
    /// Contributes to the territory feature
    pub territory: bool,
    pub stance: AoeStance,
}

impl AoeEffect {
    #[inline]
    pub fn covers(&self, source: &GridLocation, cell: &GridLocation) -> bool {
        self.metric.within(source, cell, self.radius)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AoePassReport {
    /// (source, target) pairs in range
    pub candidates: usize,
    pub fired: usize,
    pub rejected_mutations: usize,
}

/// Run every AOE once.
///
/// Targets are visited in id order. For a given target, effects keep the
/// registration order of their sources, except that hostile effects are
/// moved ahead of all others.
pub fn run_aoe_pass(
    effects: &[AoeEffect],
    object_types: &[ObjectType],
    ctx: &mut MutationContext<'_>,
) -> AoePassReport {
    let mut pending: BTreeMap<EntityId, Vec<(EntityId, usize)>> = BTreeMap::new();
    for source in ctx.world.entities() {
        let Some(object_type) = object_types.get(source.object_type.0 as usize) else {
            continue;
        };
        for &idx in &object_type.aoes {
            let Some(effect) = effects.get(idx) else {
                continue;
            };
            for target in ctx
                .world
                .entities_near(source.location, effect.radius, effect.metric)
            {
                if target == source.id && !effect.include_source {
                    continue;
                }
                pending.entry(target).or_default().push((source.id, idx));
            }
        }
    }

    let mut report = AoePassReport::default();
    for (target, mut queue) in pending {
        queue.sort_by_key(|&(_, idx)| effects[idx].stance);
        for (source, idx) in queue {
            report.candidates += 1;
            let outcome = evaluate_handler(&effects[idx].handler, ctx, source, target);
            if outcome.fired {
                report.fired += 1;
                report.rejected_mutations += outcome.rejected;
                tracing::trace!(?source, ?target, effect = idx, "aoe applied");
            }
        }
    }
    report
}
