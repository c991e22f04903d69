//! RuleEngine - owns the compiled rules and the world, and drives a tick
//!
//! A tick is: `begin_tick` (advance the clock, reseed the random stream,
//! capture stat baselines), then `on_tick` handlers in entity order, then one
//! AOE pass. Action-driven handlers are dispatched by the caller between
//! those phases via `use_object` or `dispatch`.

use crate::core::config::{EngineConfig, GameValueDef, QueryDef};
use crate::core::error::{Result, RuleError};
use crate::core::types::{CollectiveId, EntityId, GridLocation, HandlerId, Tick};
use crate::ecs::world::{World, WorldSnapshot};
use crate::rules::context::{EvalContext, MutationContext, StatBaselines, TickRng};
use crate::rules::loader::{compile, compile_query, compile_value, CompiledRules};
use crate::rules::query::ObjectQuery;
use crate::rules::values::GameValue;
use crate::simulation::aoe::{run_aoe_pass, AoePassReport};
use crate::simulation::rule_eval::{dispatch_first, evaluate_handler, HandlerOutcome};
use crate::simulation::territory::TerritorySource;
use crate::spatial::Grid;

/// Summary of one `step`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    pub on_tick_fired: usize,
    pub aoe: AoePassReport,
}

pub struct RuleEngine {
    rules: CompiledRules,
    world: World,
    rng: TickRng,
    baselines: StatBaselines,
}

impl RuleEngine {
    /// Compile `config` and build an empty world. All configuration errors
    /// surface here.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let rules = compile(config)?;
        let mut world = World::new(rules.registry.clone(), rules.default_limits.clone());
        for (i, amounts) in rules.collective_inventories.iter().enumerate() {
            if let Some(collective) = world.collective_mut(CollectiveId(i as u16)) {
                for &(resource, amount) in amounts {
                    collective.inventory.set(resource, amount);
                }
            }
        }
        tracing::info!(
            object_types = rules.object_types.len(),
            handlers = rules.handlers.len(),
            aoes = rules.aoes.len(),
            tags = rules.registry.tags.len(),
            "rule engine constructed"
        );
        let rng = TickRng::for_tick(rules.seed, world.current_tick);
        let baselines = StatBaselines::capture(&world);
        Ok(Self {
            rules,
            world,
            rng,
            baselines,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::new(&EngineConfig::from_toml_str(content)?)
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.world.snapshot()
    }

    fn split(&mut self) -> (&CompiledRules, MutationContext<'_>) {
        (
            &self.rules,
            MutationContext {
                world: &mut self.world,
                rng: &mut self.rng,
                baselines: &self.baselines,
                materialized: &self.rules.materialized,
            },
        )
    }

    fn eval_ctx(&mut self) -> EvalContext<'_> {
        EvalContext {
            world: &self.world,
            rng: &mut self.rng,
            baselines: &self.baselines,
        }
    }

    // === SETUP ===

    pub fn spawn(
        &mut self,
        object_type: &str,
        location: GridLocation,
        collective: Option<&str>,
    ) -> Result<EntityId> {
        let registry = &self.rules.registry;
        let type_id = registry.object_types.resolve(object_type)?;
        let collective = match collective {
            Some(name) => Some(registry.collectives.resolve(name)?),
            None => None,
        };
        let prototype = self
            .rules
            .object_types
            .get(type_id.0 as usize)
            .ok_or_else(|| RuleError::unresolved("object type", object_type))?;
        Ok(self.world.spawn(prototype, location, collective))
    }

    /// Compute every materialized query for the first time
    pub fn initialize(&mut self) {
        let (rules, ctx) = self.split();
        for query in &rules.materialized {
            let diff = query.recompute(ctx.world, ctx.rng, ctx.baselines);
            tracing::info!(query = %query.name, members = diff.added.len(), "materialized query initialized");
        }
    }

    // === TICK ===

    /// Advance the clock, reseed the random stream and roll stat baselines
    pub fn begin_tick(&mut self) {
        self.world.tick();
        self.rng = TickRng::for_tick(self.rules.seed, self.world.current_tick);
        self.baselines = StatBaselines::capture(&self.world);
    }

    /// Fire every entity's `on_tick` handlers with the entity as both actor
    /// and target, in entity order
    pub fn run_tick_handlers(&mut self) -> usize {
        let (rules, mut ctx) = self.split();
        let jobs: Vec<(EntityId, HandlerId)> = ctx
            .world
            .entities()
            .flat_map(|e| {
                rules
                    .object_types
                    .get(e.object_type.0 as usize)
                    .map(|t| t.on_tick.as_slice())
                    .unwrap_or_default()
                    .iter()
                    .map(move |&h| (e.id, h))
            })
            .collect();

        let mut fired = 0;
        for (entity, handler) in jobs {
            if let Some(handler) = rules.handlers.get(handler.0 as usize) {
                if evaluate_handler(handler, &mut ctx, entity, entity).fired {
                    fired += 1;
                }
            }
        }
        fired
    }

    pub fn run_aoe_pass(&mut self) -> AoePassReport {
        let (rules, mut ctx) = self.split();
        run_aoe_pass(&rules.aoes, &rules.object_types, &mut ctx)
    }

    pub fn step(&mut self) -> TickReport {
        self.begin_tick();
        let on_tick_fired = self.run_tick_handlers();
        let aoe = self.run_aoe_pass();
        tracing::debug!(tick = self.world.current_tick, on_tick_fired, aoe_fired = aoe.fired, "tick complete");
        TickReport {
            tick: self.world.current_tick,
            on_tick_fired,
            aoe,
        }
    }

    // === DISPATCH ===

    pub fn dispatch(&mut self, handler: HandlerId, actor: EntityId, target: EntityId) -> HandlerOutcome {
        let (rules, mut ctx) = self.split();
        match rules.handlers.get(handler.0 as usize) {
            Some(h) => evaluate_handler(h, &mut ctx, actor, target),
            None => HandlerOutcome::default(),
        }
    }

    pub fn dispatch_named(&mut self, name: &str, actor: EntityId, target: EntityId) -> Result<HandlerOutcome> {
        let handler = self.rules.handler_names.resolve(name)?;
        Ok(self.dispatch(handler, actor, target))
    }

    /// `actor` uses `target`: the target type's `on_use` handlers are tried
    /// in order and the first one that passes fires
    pub fn use_object(&mut self, actor: EntityId, target: EntityId) -> Option<(HandlerId, HandlerOutcome)> {
        let (rules, mut ctx) = self.split();
        let object_type = ctx.world.entity(target)?.object_type;
        let candidates = &rules.object_types.get(object_type.0 as usize)?.on_use;
        dispatch_first(&rules.handlers, candidates, &mut ctx, actor, target)
    }

    // === READS ===

    pub fn compile_query(&self, def: &QueryDef) -> Result<ObjectQuery> {
        compile_query(&self.rules, def)
    }

    pub fn compile_value(&self, def: &GameValueDef) -> Result<GameValue> {
        compile_value(&self.rules, def)
    }

    /// Run a query fresh against the current state
    pub fn evaluate_query(&mut self, query: &ObjectQuery, actor: Option<EntityId>) -> Vec<EntityId> {
        query.evaluate(&mut self.eval_ctx(), actor)
    }

    pub fn resolve_value(&self, value: &GameValue, entity: EntityId) -> f64 {
        value.resolve(&self.world, &self.baselines, entity)
    }

    /// Members of a tag by name; empty for a tag that was never registered
    pub fn tag_members(&self, tag: &str) -> Vec<EntityId> {
        self.world.members_by_name(tag)
    }

    pub fn territory_sources(&self) -> Vec<TerritorySource> {
        let mut sources = Vec::new();
        for entity in self.world.entities() {
            let Some(collective) = entity.collective else {
                continue;
            };
            let Some(object_type) = self.rules.object_types.get(entity.object_type.0 as usize) else {
                continue;
            };
            for &idx in &object_type.aoes {
                if let Some(aoe) = self.rules.aoes.get(idx).filter(|a| a.territory) {
                    sources.push(TerritorySource {
                        location: entity.location,
                        radius: aoe.radius,
                        collective,
                    });
                }
            }
        }
        sources
    }

    pub fn territory_at(&self, cell: GridLocation) -> Option<CollectiveId> {
        self.rules.territory.resolve(&self.territory_sources(), cell)
    }

    pub fn territory_grid(&self, height: usize, width: usize) -> Grid<Option<CollectiveId>> {
        self.rules
            .territory
            .grid(&self.territory_sources(), height, width)
    }
}
