//! Compile an `EngineConfig` into id-based runtime rules
//!
//! This is the only place names are resolved. Any unknown resource, stat,
//! tag, vibe, collective, object type or handler fails here, before a world
//! exists.

use std::sync::Arc;

use crate::core::config::{
    AlignToDef, AlignmentConditionDef, EngineConfig, FilterDef, GameValueDef, MutationDef, QueryDef,
};
use crate::core::error::{Result, RuleError};
use crate::core::registry::{NameTable, Registry};
use crate::core::types::{Amount, HandlerId, ResourceId, VibeId};
use crate::entity::{ObjectType, ResourceLimit};
use crate::rules::filter::{AlignmentCondition, Filter};
use crate::rules::mutation::{AlignTo, Mutation, ValueSource};
use crate::rules::query::{ClosureQuery, MaterializedQuery, ObjectQuery, Query};
use crate::rules::values::GameValue;
use crate::simulation::aoe::{AoeEffect, AoeStance};
use crate::simulation::rule_eval::Handler;
use crate::simulation::territory::TerritoryResolver;
use crate::tags::{collective_tag, type_tag, TagRegistry};

/// Everything the engine needs at runtime, with every name resolved
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub seed: u64,
    pub registry: Arc<Registry>,
    /// Per-resource bounds for collectives, the game scope and any object
    /// type without overrides
    pub default_limits: Vec<ResourceLimit>,
    pub object_types: Vec<ObjectType>,
    pub handlers: Vec<Handler>,
    pub handler_names: NameTable<HandlerId>,
    pub aoes: Vec<AoeEffect>,
    pub materialized: Vec<MaterializedQuery>,
    /// Starting inventory per collective, indexed by collective id
    pub collective_inventories: Vec<Vec<(ResourceId, Amount)>>,
    pub territory: TerritoryResolver,
}

pub fn compile(config: &EngineConfig) -> Result<CompiledRules> {
    let registry = build_registry(config)?;
    let default_limits: Vec<ResourceLimit> = config
        .resources
        .iter()
        .map(|r| ResourceLimit::new(r.min, r.max))
        .collect();
    for (def, limit) in config.resources.iter().zip(&default_limits) {
        check_limit(&def.name, limit)?;
    }

    let materialized_tags: Vec<String> = config
        .materialized_queries
        .iter()
        .map(|m| m.tag.clone())
        .collect();
    let compiler = Compiler {
        registry: &registry,
        materialized_tags: &materialized_tags,
    };

    let mut handler_names: NameTable<HandlerId> = NameTable::new();
    for def in &config.handlers {
        if handler_names.get(&def.name).is_some() {
            return Err(RuleError::DuplicateName {
                kind: "handler",
                name: def.name.clone(),
            });
        }
        handler_names.register(&def.name);
    }
    let handlers = config
        .handlers
        .iter()
        .map(|def| compiler.handler(&def.name, &def.filters, &def.mutations))
        .collect::<Result<Vec<_>>>()?;

    let materialized = config
        .materialized_queries
        .iter()
        .map(|def| {
            Ok(MaterializedQuery {
                tag: registry.tags.resolve(&def.tag)?,
                name: def.tag.clone(),
                query: compiler.query(&def.query)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut aoes = Vec::new();
    let mut object_types = Vec::with_capacity(config.object_types.len());
    for def in &config.object_types {
        let id = registry.object_types.resolve(&def.name)?;

        let mut limits = default_limits.clone();
        for (name, limit) in &def.limits {
            let resource = registry.resources.resolve(name)?;
            let slot = &mut limits[resource.0 as usize];
            if let Some(min) = limit.min {
                slot.min = min;
            }
            if let Some(max) = limit.max {
                slot.max = max;
            }
            check_limit(name, slot)?;
        }

        let mut aoe_indices = Vec::with_capacity(def.aoes.len());
        for (i, aoe) in def.aoes.iter().enumerate() {
            let handler = compiler.handler(
                &format!("{}.aoe[{}]", def.name, i),
                &aoe.filters,
                &aoe.mutations,
            )?;
            aoe_indices.push(aoes.len());
            aoes.push(AoeEffect {
                stance: AoeStance::classify(&handler),
                handler,
                radius: aoe.radius,
                metric: aoe.metric,
                include_source: aoe.include_source,
                territory: aoe.territory,
            });
        }

        object_types.push(ObjectType {
            id,
            name: def.name.clone(),
            type_tag: registry.tags.resolve(&type_tag(&def.name))?,
            tags: def
                .tags
                .iter()
                .map(|t| registry.tags.resolve(t))
                .collect::<Result<_>>()?,
            limits,
            initial_inventory: compiler.amounts(&def.inventory)?,
            vibe: match &def.vibe {
                Some(name) => registry.vibes.resolve(name)?,
                None => VibeId::default(),
            },
            on_use: resolve_handlers(&handler_names, &def.on_use)?,
            on_tick: resolve_handlers(&handler_names, &def.on_tick)?,
            aoes: aoe_indices,
        });
    }

    let collective_inventories = config
        .collectives
        .iter()
        .map(|c| compiler.amounts(&c.inventory))
        .collect::<Result<Vec<_>>>()?;

    let territory = TerritoryResolver::new(match &config.territory.yield_on_tie {
        Some(name) => Some(registry.collectives.resolve(name)?),
        None => None,
    });

    Ok(CompiledRules {
        seed: config.seed,
        registry: Arc::new(registry),
        default_limits,
        object_types,
        handlers,
        handler_names,
        aoes,
        materialized,
        collective_inventories,
        territory,
    })
}

/// Compile a standalone query against already-compiled rules
pub fn compile_query(rules: &CompiledRules, def: &QueryDef) -> Result<ObjectQuery> {
    let materialized_tags: Vec<String> = rules.materialized.iter().map(|m| m.name.clone()).collect();
    Compiler {
        registry: &rules.registry,
        materialized_tags: &materialized_tags,
    }
    .query(def)
}

/// Compile a standalone game value against already-compiled rules
pub fn compile_value(rules: &CompiledRules, def: &GameValueDef) -> Result<GameValue> {
    Compiler {
        registry: &rules.registry,
        materialized_tags: &[],
    }
    .value(def)
}

/// Register every name. Tags come from the declared list, object-type tags,
/// materialized query tags and the implicit type/collective tags.
fn build_registry(config: &EngineConfig) -> Result<Registry> {
    let mut registry = Registry {
        tags: TagRegistry::with_capacity(config.max_tags),
        ..Default::default()
    };
    for resource in &config.resources {
        registry.resources.register(&resource.name);
    }
    for stat in &config.stats {
        registry.stats.register(stat);
    }
    for vibe in &config.vibes {
        registry.vibes.register(vibe);
    }
    for tag in &config.tags {
        registry.tags.register(tag)?;
    }
    for collective in &config.collectives {
        if registry.collectives.get(&collective.name).is_some() {
            return Err(RuleError::DuplicateName {
                kind: "collective",
                name: collective.name.clone(),
            });
        }
        registry.collectives.register(&collective.name);
        registry.tags.register(&collective_tag(&collective.name))?;
    }
    for object_type in &config.object_types {
        if registry.object_types.get(&object_type.name).is_some() {
            return Err(RuleError::DuplicateName {
                kind: "object type",
                name: object_type.name.clone(),
            });
        }
        registry.object_types.register(&object_type.name);
        registry.tags.register(&type_tag(&object_type.name))?;
        for tag in &object_type.tags {
            registry.tags.register(tag)?;
        }
    }
    for query in &config.materialized_queries {
        registry.tags.register(&query.tag)?;
    }
    Ok(registry)
}

fn resolve_handlers(names: &NameTable<HandlerId>, list: &[String]) -> Result<Vec<HandlerId>> {
    list.iter().map(|n| names.resolve(n)).collect()
}

struct Compiler<'a> {
    registry: &'a Registry,
    materialized_tags: &'a [String],
}

impl Compiler<'_> {
    fn handler(&self, name: &str, filters: &[FilterDef], mutations: &[MutationDef]) -> Result<Handler> {
        Ok(Handler {
            name: name.to_string(),
            filters: self.filters(filters)?,
            mutations: mutations
                .iter()
                .map(|m| self.mutation(m))
                .collect::<Result<_>>()?,
        })
    }

    fn amounts<'m>(
        &self,
        map: impl IntoIterator<Item = (&'m String, &'m Amount)>,
    ) -> Result<Vec<(ResourceId, Amount)>> {
        map.into_iter()
            .map(|(name, &amount)| Ok((self.registry.resources.resolve(name)?, amount)))
            .collect()
    }

    fn filters(&self, defs: &[FilterDef]) -> Result<Vec<Filter>> {
        defs.iter().map(|d| self.filter(d)).collect()
    }

    fn filter(&self, def: &FilterDef) -> Result<Filter> {
        let tags = &self.registry.tags;
        Ok(match def {
            FilterDef::Tag { target, tag } => Filter::Tag {
                target: *target,
                tag: tags.resolve(tag)?,
            },
            FilterDef::TagPrefix { target, prefix } => Filter::TagPrefix {
                target: *target,
                tags: tags.with_prefix(prefix),
            },
            FilterDef::SharedTagPrefix { prefix } => Filter::SharedTagPrefix {
                tags: tags.with_prefix(prefix),
            },
            FilterDef::Resource { target, resources } => Filter::Resource {
                target: *target,
                requirements: self.amounts(resources)?,
            },
            FilterDef::Alignment { target, condition } => Filter::Alignment {
                target: *target,
                condition: match condition {
                    AlignmentConditionDef::Aligned => AlignmentCondition::Aligned,
                    AlignmentConditionDef::Unaligned => AlignmentCondition::Unaligned,
                    AlignmentConditionDef::SameCollective => AlignmentCondition::SameCollective,
                    AlignmentConditionDef::DifferentCollective => {
                        AlignmentCondition::DifferentCollective
                    }
                    AlignmentConditionDef::Collective(name) => {
                        AlignmentCondition::Collective(self.registry.collectives.resolve(name)?)
                    }
                },
            },
            FilterDef::Vibe { target, vibe } => Filter::Vibe {
                target: *target,
                vibe: self.registry.vibes.resolve(vibe)?,
            },
            FilterDef::MaxDistance {
                target,
                radius,
                query,
            } => Filter::MaxDistance {
                target: *target,
                radius: *radius,
                query: match query {
                    Some(q) => Some(Box::new(self.query(q)?)),
                    None => None,
                },
            },
            FilterDef::Near {
                target,
                tag,
                radius,
                filters,
            } => Filter::Near {
                target: *target,
                tag: tags.resolve(tag)?,
                radius: *radius,
                filters: self.filters(filters)?,
            },
            FilterDef::GameValue {
                target,
                value,
                op,
                threshold,
            } => Filter::GameValue {
                target: *target,
                value: self.value(value)?,
                op: *op,
                threshold: *threshold,
            },
            FilterDef::Not { filter } => Filter::Not(Box::new(self.filter(filter)?)),
            FilterDef::Or { filters } => {
                if filters.is_empty() {
                    return Err(RuleError::InvalidFilter(
                        "or filter needs at least one inner filter".into(),
                    ));
                }
                Filter::Or(self.filters(filters)?)
            }
        })
    }

    fn value(&self, def: &GameValueDef) -> Result<GameValue> {
        Ok(match def {
            GameValueDef::Inventory { scope, resource } => GameValue::Inventory {
                scope: *scope,
                resource: self.registry.resources.resolve(resource)?,
            },
            GameValueDef::Stat { scope, stat, delta } => GameValue::Stat {
                scope: *scope,
                stat: self.registry.stats.resolve(stat)?,
                delta: *delta,
            },
            GameValueDef::TagCount { tag } => GameValue::TagCount {
                tag: self.registry.tags.resolve(tag)?,
            },
            GameValueDef::NumObjects { object_type } => {
                self.registry.object_types.resolve(object_type)?;
                GameValue::NumObjects {
                    type_tag: self.registry.tags.resolve(&type_tag(object_type))?,
                }
            }
            GameValueDef::Constant { value } => GameValue::Constant(*value),
        })
    }

    fn query(&self, def: &QueryDef) -> Result<ObjectQuery> {
        Ok(match def {
            QueryDef::Tag {
                tag,
                filters,
                max_items,
                order_by,
            } => ObjectQuery::Tag(Query {
                tag: self.registry.tags.resolve(tag)?,
                filters: self.filters(filters)?,
                max_items: *max_items,
                order_by: *order_by,
            }),
            QueryDef::Closure {
                source,
                bridge,
                radius,
                filters,
            } => ObjectQuery::Closure(ClosureQuery {
                source: Box::new(self.query(source)?),
                bridge: self.filters(bridge)?,
                radius: *radius,
                filters: self.filters(filters)?,
            }),
        })
    }

    fn mutation(&self, def: &MutationDef) -> Result<Mutation> {
        let registry = self.registry;
        Ok(match def {
            MutationDef::ResourceDelta { target, deltas } => Mutation::ResourceDelta {
                target: *target,
                deltas: self.amounts(deltas)?,
            },
            MutationDef::ResourceTransfer {
                source,
                destination,
                resources,
            } => {
                if source == destination {
                    return Err(RuleError::InvalidMutation(format!(
                        "resource_transfer source and destination are both {:?}",
                        source
                    )));
                }
                Mutation::ResourceTransfer {
                    source: *source,
                    destination: *destination,
                    resources: self.amounts(resources)?,
                }
            }
            MutationDef::Alignment { target, align_to } => Mutation::Alignment {
                target: *target,
                align_to: match align_to {
                    AlignToDef::ActorCollective => AlignTo::ActorCollective,
                    AlignToDef::Unaligned => AlignTo::Unaligned,
                    AlignToDef::Collective(name) => {
                        AlignTo::Collective(registry.collectives.resolve(name)?)
                    }
                },
            },
            MutationDef::Freeze { target, duration } => Mutation::Freeze {
                target: *target,
                duration: *duration,
            },
            MutationDef::ClearInventory { target, resources } => Mutation::ClearInventory {
                target: *target,
                resources: resources
                    .iter()
                    .map(|r| registry.resources.resolve(r))
                    .collect::<Result<_>>()?,
            },
            MutationDef::AddTag { target, tag } => Mutation::AddTag {
                target: *target,
                tag: registry.tags.resolve(tag)?,
            },
            MutationDef::RemoveTag { target, tag } => Mutation::RemoveTag {
                target: *target,
                tag: registry.tags.resolve(tag)?,
            },
            MutationDef::RemoveTagsWithPrefix { target, prefix } => {
                Mutation::RemoveTagsWithPrefix {
                    target: *target,
                    tags: registry.tags.with_prefix(prefix),
                }
            }
            MutationDef::Stats {
                stat,
                delta,
                target,
            } => Mutation::Stats {
                target: *target,
                stat: registry.stats.resolve(stat)?,
                delta: *delta,
            },
            MutationDef::SetGameValue {
                value,
                target,
                delta,
                source,
            } => {
                let value = self.value(value)?;
                if !value.is_writable() {
                    return Err(RuleError::InvalidMutation(
                        "set_game_value can only write inventory or stat values".into(),
                    ));
                }
                let amount = match (source, *delta != 0.0) {
                    (Some(source), false) => ValueSource::Dynamic(self.value(source)?),
                    (None, true) => ValueSource::Static(*delta),
                    (Some(_), true) => {
                        return Err(RuleError::InvalidMutation(
                            "set_game_value sets both source and delta".into(),
                        ))
                    }
                    (None, false) => {
                        return Err(RuleError::InvalidMutation(
                            "set_game_value needs a source or a non-zero delta".into(),
                        ))
                    }
                };
                Mutation::SetGameValue {
                    target: *target,
                    value,
                    amount,
                }
            }
            MutationDef::QueryInventory {
                query,
                deltas,
                source,
            } => Mutation::QueryInventory {
                query: self.query(query)?,
                deltas: self.amounts(deltas)?,
                source: *source,
            },
            MutationDef::RecomputeMaterializedQuery { prefix } => Mutation::RecomputeMaterialized {
                queries: self.materialized_matching(|tag| tag.starts_with(prefix.as_str())),
            },
            MutationDef::RecomputeQueryTag { tag } => {
                let queries = self.materialized_matching(|t| t == tag.as_str());
                if queries.is_empty() {
                    return Err(RuleError::unresolved("query tag", tag.clone()));
                }
                Mutation::RecomputeMaterialized { queries }
            }
        })
    }

    fn materialized_matching(&self, pred: impl Fn(&str) -> bool) -> Vec<usize> {
        self.materialized_tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| pred(tag))
            .map(|(i, _)| i)
            .collect()
    }
}

fn check_limit(resource: &str, limit: &ResourceLimit) -> Result<()> {
    if limit.is_valid() {
        Ok(())
    } else {
        Err(RuleError::InvalidLimit {
            resource: resource.to_string(),
            min: limit.min,
            max: limit.max,
        })
    }
}
