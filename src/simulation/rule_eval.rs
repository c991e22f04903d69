//! Handler Dispatcher
//!
//! A handler is a filter-gated mutation list. Filters are checked once
//! against the (actor, target) pair; if every one passes, each mutation is
//! applied independently in list order.

use crate::core::types::{EntityId, HandlerId};
use crate::rules::context::{EvalContext, MutationContext};
use crate::rules::filter::{all_pass, Filter};
use crate::rules::mutation::{Mutation, MutationOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub name: String,
    pub filters: Vec<Filter>,
    pub mutations: Vec<Mutation>,
}

/// What happened when a handler was offered an (actor, target) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub fired: bool,
    pub applied: usize,
    pub rejected: usize,
}

impl HandlerOutcome {
    fn record(&mut self, outcome: MutationOutcome) {
        match outcome {
            MutationOutcome::Applied => self.applied += 1,
            MutationOutcome::Rejected => self.rejected += 1,
            MutationOutcome::Partial { .. } => {
                self.applied += 1;
                self.rejected += 1;
            }
        }
    }
}

impl Handler {
    pub fn passes(&self, ctx: &mut EvalContext<'_>, actor: EntityId, target: EntityId) -> bool {
        all_pass(&self.filters, ctx, actor, target)
    }

    /// Apply every mutation without checking filters
    pub fn apply(&self, ctx: &mut MutationContext<'_>, actor: EntityId, target: EntityId) -> HandlerOutcome {
        let mut outcome = HandlerOutcome {
            fired: true,
            ..Default::default()
        };
        for mutation in &self.mutations {
            outcome.record(mutation.apply(ctx, actor, target));
        }
        outcome
    }
}

/// FilterCheck then, on pass, MutationApply
pub fn evaluate_handler(
    handler: &Handler,
    ctx: &mut MutationContext<'_>,
    actor: EntityId,
    target: EntityId,
) -> HandlerOutcome {
    if !handler.passes(&mut ctx.eval(), actor, target) {
        tracing::trace!(handler = %handler.name, ?actor, ?target, "filters failed");
        return HandlerOutcome::default();
    }
    tracing::trace!(handler = %handler.name, ?actor, ?target, "applying mutations");
    handler.apply(ctx, actor, target)
}

/// Try handlers in order; the first whose filters pass fires and the rest
/// are skipped
pub fn dispatch_first(
    handlers: &[Handler],
    candidates: &[HandlerId],
    ctx: &mut MutationContext<'_>,
    actor: EntityId,
    target: EntityId,
) -> Option<(HandlerId, HandlerOutcome)> {
    for &id in candidates {
        let Some(handler) = handlers.get(id.0 as usize) else {
            continue;
        };
        let outcome = evaluate_handler(handler, ctx, actor, target);
        if outcome.fired {
            return Some((id, outcome));
        }
    }
    None
}
