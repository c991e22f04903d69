//! Integration tests for filters, queries and mutations
//!
//! Every test builds a `RuleEngine` from TOML, spawns a handful of entities
//! and drives handlers or ad-hoc queries through the public API.

use grid_rules::core::config::{EngineConfig, QueryDef};
use grid_rules::core::types::{CollectiveId, EntityId, GridLocation, ResourceId, StatId, TagId};
use grid_rules::entity::Holder;
use grid_rules::simulation::HandlerOutcome;
use grid_rules::RuleEngine;

const CONFIG: &str = r#"
seed = 11
stats = ["uses", "score"]
vibes = ["calm", "angry"]
tags = ["powered", "zone:red", "zone:blue"]

[[resources]]
name = "energy"
max = 100

[[resources]]
name = "ore"
max = 10

[[collectives]]
name = "cogs"
inventory = { energy = 50 }

[[collectives]]
name = "clips"

[[object_types]]
name = "agent"
inventory = { energy = 20, ore = 4 }

[[object_types]]
name = "charger"
tags = ["charger"]
inventory = { energy = 30 }
on_use = ["recharge_friend", "recharge_any"]

[[handlers]]
name = "recharge_friend"
filters = [{ type = "alignment", condition = "same_collective" }]
mutations = [
    { type = "resource_transfer", source = "target", destination = "actor", resources = { energy = 10 } },
    { type = "stats", stat = "uses" },
]

[[handlers]]
name = "recharge_any"
mutations = [{ type = "resource_delta", target = "actor", deltas = { energy = 1 } }]

[[handlers]]
name = "tag_ops"
mutations = [
    { type = "add_tag", tag = "powered" },
    { type = "remove_tags_with_prefix", prefix = "zone:" },
]

[[handlers]]
name = "freeze"
mutations = [{ type = "freeze", duration = 3 }]

[[handlers]]
name = "convert"
mutations = [{ type = "alignment", align_to = "actor_collective" }]

[[handlers]]
name = "defect"
mutations = [{ type = "alignment", align_to = "unaligned" }]

[[handlers]]
name = "wipe_ore"
mutations = [{ type = "clear_inventory", resources = ["ore"] }]

[[handlers]]
name = "overfill"
mutations = [{ type = "resource_delta", deltas = { energy = 500, ore = -50 } }]

[[handlers]]
name = "score"
mutations = [
    { type = "stats", stat = "score", target = "game", delta = 2.0 },
    { type = "stats", stat = "score", target = "collective", delta = 3.0 },
]

[[handlers]]
name = "bank"
mutations = [{ type = "set_game_value", value = { type = "inventory", scope = "collective", resource = "energy" }, source = { type = "inventory", resource = "energy" } }]

[[handlers]]
name = "reward"
mutations = [{ type = "set_game_value", value = { type = "stat", stat = "score" }, delta = 1.5 }]

[[handlers]]
name = "distribute"

[[handlers.mutations]]
type = "query_inventory"
source = "actor"
deltas = { energy = 5 }
query = { type = "tag", tag = "type:agent" }

[[handlers]]
name = "broadcast"

[[handlers.mutations]]
type = "query_inventory"
deltas = { energy = 7 }
query = { type = "tag", tag = "type:agent", filters = [{ type = "alignment", condition = "aligned" }] }
"#;

const ENERGY: ResourceId = ResourceId(0);
const ORE: ResourceId = ResourceId(1);
const COGS: CollectiveId = CollectiveId(0);
const CLIPS: CollectiveId = CollectiveId(1);

struct Fixture {
    engine: RuleEngine,
    /// cogs agent at (0,0)
    a0: EntityId,
    /// clips agent at (0,3)
    a1: EntityId,
    /// unaligned agent at (5,5)
    a2: EntityId,
    /// cogs charger at (0,1)
    charger: EntityId,
}

fn fixture() -> Fixture {
    let mut engine = RuleEngine::from_toml_str(CONFIG).unwrap();
    let a0 = engine.spawn("agent", GridLocation::new(0, 0), Some("cogs")).unwrap();
    let a1 = engine.spawn("agent", GridLocation::new(0, 3), Some("clips")).unwrap();
    let a2 = engine.spawn("agent", GridLocation::new(5, 5), None).unwrap();
    let charger = engine.spawn("charger", GridLocation::new(0, 1), Some("cogs")).unwrap();
    Fixture {
        engine,
        a0,
        a1,
        a2,
        charger,
    }
}

fn energy(engine: &RuleEngine, holder: Holder) -> i32 {
    engine.world().inventory(holder).unwrap().get(ENERGY)
}

fn tag(engine: &RuleEngine, name: &str) -> TagId {
    engine.rules().registry.tags.get(name).unwrap()
}

/// Agents passing `filters` (a JSON array), evaluated with `actor`
fn agents_where(engine: &mut RuleEngine, filters: &str, actor: Option<EntityId>) -> Vec<EntityId> {
    let json = format!(r#"{{"type":"tag","tag":"type:agent","filters":{}}}"#, filters);
    let def: QueryDef = serde_json::from_str(&json).unwrap();
    let query = engine.compile_query(&def).unwrap();
    engine.evaluate_query(&query, actor)
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_alignment_conditions() {
    let Fixture { mut engine, a0, a1, a2, .. } = fixture();
    let e = &mut engine;

    assert_eq!(agents_where(e, r#"[{"type":"alignment","condition":"same_collective"}]"#, Some(a0)), vec![a0]);
    assert_eq!(agents_where(e, r#"[{"type":"alignment","condition":"different_collective"}]"#, Some(a0)), vec![a1]);
    assert_eq!(agents_where(e, r#"[{"type":"alignment","condition":"unaligned"}]"#, None), vec![a2]);
    assert_eq!(agents_where(e, r#"[{"type":"alignment","condition":"aligned"}]"#, None), vec![a0, a1]);
    assert_eq!(
        agents_where(e, r#"[{"type":"alignment","condition":{"collective":"clips"}}]"#, None),
        vec![a1]
    );
}

#[test]
fn test_tag_filter_on_collective_ref_is_false() {
    let Fixture { mut engine, a0, .. } = fixture();
    let found = agents_where(
        &mut engine,
        r#"[{"type":"tag","target":"target_collective","tag":"collective:cogs"}]"#,
        Some(a0),
    );
    assert!(found.is_empty());
}

#[test]
fn test_resource_filter_scopes() {
    let Fixture { mut engine, a0, a1, a2, .. } = fixture();
    let e = &mut engine;
    assert_eq!(
        agents_where(e, r#"[{"type":"resource","resources":{"energy":20}}]"#, None),
        vec![a0, a1, a2]
    );
    assert!(agents_where(e, r#"[{"type":"resource","resources":{"energy":21}}]"#, None).is_empty());
    // Only cogs has a stocked collective inventory; a2 has no collective at all
    assert_eq!(
        agents_where(e, r#"[{"type":"resource","target":"target_collective","resources":{"energy":50}}]"#, None),
        vec![a0]
    );
}

#[test]
fn test_vibe_filter() {
    let Fixture { mut engine, a1, .. } = fixture();
    let angry = engine.rules().registry.vibes.get("angry").unwrap();
    engine.world_mut().set_vibe(a1, angry).unwrap();
    assert_eq!(agents_where(&mut engine, r#"[{"type":"vibe","vibe":"angry"}]"#, None), vec![a1]);
    assert_eq!(agents_where(&mut engine, r#"[{"type":"vibe","vibe":"calm"}]"#, None).len(), 2);
}

#[test]
fn test_max_distance_binary_mode() {
    let Fixture { mut engine, a0, a1, a2, .. } = fixture();
    let e = &mut engine;
    // (0,3) is exactly 3 away: 9 <= 9
    assert_eq!(agents_where(e, r#"[{"type":"max_distance","radius":3}]"#, Some(a0)), vec![a0, a1]);
    assert_eq!(agents_where(e, r#"[{"type":"max_distance","radius":2}]"#, Some(a0)), vec![a0]);
    // radius 0 is unconstrained
    assert_eq!(agents_where(e, r#"[{"type":"max_distance","radius":0}]"#, Some(a0)), vec![a0, a1, a2]);
}

#[test]
fn test_max_distance_with_query() {
    let Fixture { mut engine, a0, a1, a2, .. } = fixture();
    let e = &mut engine;
    let near_charger = r#"[{"type":"max_distance","radius":1,"query":{"type":"tag","tag":"charger"}}]"#;
    assert_eq!(agents_where(e, near_charger, None), vec![a0]);

    let any_charger = r#"[{"type":"max_distance","radius":0,"query":{"type":"tag","tag":"charger"}}]"#;
    assert_eq!(agents_where(e, any_charger, None), vec![a0, a1, a2]);

    let any_powered = r#"[{"type":"max_distance","radius":0,"query":{"type":"tag","tag":"powered"}}]"#;
    assert!(agents_where(e, any_powered, None).is_empty());
}

#[test]
fn test_near_filter_with_nested_filters() {
    let Fixture { mut engine, a0, .. } = fixture();
    let e = &mut engine;
    assert_eq!(agents_where(e, r#"[{"type":"near","tag":"charger","radius":1}]"#, None), vec![a0]);
    let clips_charger = r#"[{"type":"near","tag":"charger","radius":1,
        "filters":[{"type":"alignment","condition":{"collective":"clips"}}]}]"#;
    assert!(agents_where(e, clips_charger, None).is_empty());
}

#[test]
fn test_game_value_filter() {
    let Fixture { mut engine, a0, a1, a2, .. } = fixture();
    let e = &mut engine;
    let three_agents = r#"[{"type":"game_value","value":{"type":"num_objects","object_type":"agent"},"op":"ge","threshold":3}]"#;
    assert_eq!(agents_where(e, three_agents, None), vec![a0, a1, a2]);
    let four_agents = r#"[{"type":"game_value","value":{"type":"num_objects","object_type":"agent"},"op":"ge","threshold":4}]"#;
    assert!(agents_where(e, four_agents, None).is_empty());
    let one_charger = r#"[{"type":"game_value","value":{"type":"tag_count","tag":"charger"},"op":"eq","threshold":1}]"#;
    assert_eq!(agents_where(e, one_charger, None).len(), 3);
}

#[test]
fn test_not_and_or_filters() {
    let Fixture { mut engine, a0, a1, a2, .. } = fixture();
    let e = &mut engine;
    let not_unaligned = r#"[{"type":"not","filter":{"type":"alignment","condition":"unaligned"}}]"#;
    assert_eq!(agents_where(e, not_unaligned, None), vec![a0, a1]);
    let cogs_or_unaligned = r#"[{"type":"or","filters":[
        {"type":"alignment","condition":{"collective":"cogs"}},
        {"type":"alignment","condition":"unaligned"}]}]"#;
    assert_eq!(agents_where(e, cogs_or_unaligned, None), vec![a0, a2]);
}

#[test]
fn test_tag_prefix_filters() {
    let Fixture { mut engine, a1, a2, .. } = fixture();
    let red = tag(&engine, "zone:red");
    let blue = tag(&engine, "zone:blue");
    engine.world_mut().add_tag(a1, red);
    engine.world_mut().add_tag(a2, blue);

    assert_eq!(
        agents_where(&mut engine, r#"[{"type":"tag_prefix","prefix":"zone:"}]"#, None),
        vec![a1, a2]
    );
    // a2 only shares a prefix with a1, not a tag
    assert_eq!(
        agents_where(&mut engine, r#"[{"type":"shared_tag_prefix","prefix":"zone:"}]"#, Some(a1)),
        vec![a1]
    );
    engine.world_mut().add_tag(a2, red);
    assert_eq!(
        agents_where(&mut engine, r#"[{"type":"shared_tag_prefix","prefix":"zone:"}]"#, Some(a1)),
        vec![a1, a2]
    );
}

#[test]
fn test_unknown_tag_lookup_is_empty() {
    let Fixture { engine, .. } = fixture();
    assert!(engine.tag_members("never-registered").is_empty());
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_random_query_is_capped_and_reproducible() {
    let run = || {
        let Fixture { mut engine, .. } = fixture();
        let def: QueryDef = serde_json::from_str(
            r#"{"type":"tag","tag":"type:agent","order_by":"random","max_items":2}"#,
        )
        .unwrap();
        let query = engine.compile_query(&def).unwrap();
        engine.begin_tick();
        engine.evaluate_query(&query, None)
    };
    let first = run();
    assert_eq!(first.len(), 2);
    assert_ne!(first[0], first[1]);
    assert_eq!(first, run());
}

// ============================================================================
// Handlers and mutations
// ============================================================================

#[test]
fn test_use_object_fires_first_passing_handler() {
    let Fixture { mut engine, a0, a1, charger, .. } = fixture();

    let (handler, outcome) = engine.use_object(a0, charger).unwrap();
    assert_eq!(handler, engine.rules().handler_names.get("recharge_friend").unwrap());
    assert_eq!(outcome.applied, 2);
    assert_eq!(energy(&engine, Holder::Entity(a0)), 30);
    assert_eq!(energy(&engine, Holder::Entity(charger)), 20);
    assert_eq!(engine.world().entity(charger).unwrap().stats.get(StatId(0)), 1.0);

    // clips agent falls through to the second handler
    let (handler, _) = engine.use_object(a1, charger).unwrap();
    assert_eq!(handler, engine.rules().handler_names.get("recharge_any").unwrap());
    assert_eq!(energy(&engine, Holder::Entity(a1)), 21);
    assert_eq!(energy(&engine, Holder::Entity(charger)), 20);
}

#[test]
fn test_failed_transfer_leaves_both_sides_and_siblings_still_run() {
    let Fixture { mut engine, a0, charger, .. } = fixture();
    engine
        .world_mut()
        .inventory_mut(Holder::Entity(charger))
        .unwrap()
        .set(ENERGY, 5);

    let outcome = engine.dispatch_named("recharge_friend", a0, charger).unwrap();
    assert_eq!(
        outcome,
        HandlerOutcome {
            fired: true,
            applied: 1,
            rejected: 1
        }
    );
    assert_eq!(energy(&engine, Holder::Entity(a0)), 20);
    assert_eq!(energy(&engine, Holder::Entity(charger)), 5);
    assert_eq!(engine.world().entity(charger).unwrap().stats.get(StatId(0)), 1.0);
}

#[test]
fn test_handler_filters_gate_all_mutations() {
    let Fixture { mut engine, a1, charger, .. } = fixture();
    let outcome = engine.dispatch_named("recharge_friend", a1, charger).unwrap();
    assert!(!outcome.fired);
    assert_eq!(energy(&engine, Holder::Entity(charger)), 30);
}

#[test]
fn test_resource_delta_is_clamped() {
    let Fixture { mut engine, a0, .. } = fixture();
    engine.dispatch_named("overfill", a0, a0).unwrap();
    let inventory = engine.world().inventory(Holder::Entity(a0)).unwrap();
    assert_eq!(inventory.get(ENERGY), 100);
    assert_eq!(inventory.get(ORE), 0);
}

#[test]
fn test_tag_mutations() {
    let Fixture { mut engine, a0, a1, .. } = fixture();
    let powered = tag(&engine, "powered");
    let red = tag(&engine, "zone:red");
    let blue = tag(&engine, "zone:blue");
    engine.world_mut().add_tag(a1, red);
    engine.world_mut().add_tag(a1, blue);

    engine.dispatch_named("tag_ops", a0, a1).unwrap();
    let world = engine.world();
    assert!(world.has_tag(a1, powered));
    assert!(!world.has_tag(a1, red));
    assert!(!world.has_tag(a1, blue));

    // Second run is a no-op for the index
    let generation = world.tags().generation();
    engine.dispatch_named("tag_ops", a0, a1).unwrap();
    assert_eq!(engine.world().tags().generation(), generation);
}

#[test]
fn test_freeze_sets_counter_from_current_tick() {
    let Fixture { mut engine, a0, a1, .. } = fixture();
    engine.begin_tick();
    engine.begin_tick();
    engine.dispatch_named("freeze", a0, a1).unwrap();
    let entity = engine.world().entity(a1).unwrap();
    assert_eq!(entity.frozen_until, 5);
    assert!(entity.is_frozen(4));
    assert!(!entity.is_frozen(5));
}

#[test]
fn test_freeze_with_unbounded_duration_saturates() {
    let json = r#"{
        "object_types": [{ "name": "agent" }],
        "handlers": [{
            "name": "freeze_forever",
            "mutations": [{ "type": "freeze", "duration": 18446744073709551615 }]
        }]
    }"#;
    let config = EngineConfig::from_json_str(json).unwrap();
    let mut engine = RuleEngine::new(&config).unwrap();
    let a = engine.spawn("agent", GridLocation::new(0, 0), None).unwrap();
    let b = engine.spawn("agent", GridLocation::new(0, 1), None).unwrap();
    engine.begin_tick();
    engine.begin_tick();

    let outcome = engine.dispatch_named("freeze_forever", a, b).unwrap();
    assert!(outcome.fired);
    let entity = engine.world().entity(b).unwrap();
    assert_eq!(entity.frozen_until, u64::MAX);
    assert!(entity.is_frozen(1_000_000));
}

#[test]
fn test_alignment_mutation_keeps_collective_tags_in_sync() {
    let Fixture { mut engine, a0, a2, .. } = fixture();
    engine.dispatch_named("convert", a0, a2).unwrap();
    assert_eq!(engine.world().entity(a2).unwrap().collective, Some(COGS));
    assert_eq!(engine.tag_members("collective:cogs"), vec![a0, a2, EntityId(3)]);

    engine.dispatch_named("defect", a0, a2).unwrap();
    assert_eq!(engine.world().entity(a2).unwrap().collective, None);
    assert!(!engine.tag_members("collective:cogs").contains(&a2));
}

#[test]
fn test_align_to_actor_collective_rejects_unaligned_actor() {
    let Fixture { mut engine, a1, a2, .. } = fixture();
    let outcome = engine.dispatch_named("convert", a2, a1).unwrap();
    assert_eq!(outcome.rejected, 1);
    assert_eq!(engine.world().entity(a1).unwrap().collective, Some(CLIPS));
}

#[test]
fn test_clear_inventory_subset() {
    let Fixture { mut engine, a0, .. } = fixture();
    engine.dispatch_named("wipe_ore", a0, a0).unwrap();
    let inventory = engine.world().inventory(Holder::Entity(a0)).unwrap();
    assert_eq!(inventory.get(ORE), 0);
    assert_eq!(inventory.get(ENERGY), 20);
}

#[test]
fn test_stats_mutation_targets() {
    let Fixture { mut engine, a0, a2, .. } = fixture();
    engine.dispatch_named("score", a0, a0).unwrap();
    let score = StatId(1);
    assert_eq!(engine.world().stats(Holder::Game).unwrap().get(score), 2.0);
    assert_eq!(engine.world().stats(Holder::Collective(COGS)).unwrap().get(score), 3.0);

    // Unaligned target: the collective write is rejected, the game write is not
    let outcome = engine.dispatch_named("score", a2, a2).unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.rejected, 1);
    assert_eq!(engine.world().stats(Holder::Game).unwrap().get(score), 4.0);
}

#[test]
fn test_set_game_value_static_and_dynamic() {
    let Fixture { mut engine, a0, .. } = fixture();
    engine.dispatch_named("bank", a0, a0).unwrap();
    assert_eq!(energy(&engine, Holder::Collective(COGS)), 70);

    engine.dispatch_named("reward", a0, a0).unwrap();
    engine.dispatch_named("reward", a0, a0).unwrap();
    assert_eq!(engine.world().entity(a0).unwrap().stats.get(StatId(1)), 3.0);
}

#[test]
fn test_stat_delta_value_is_relative_to_tick_baseline() {
    let Fixture { mut engine, a0, .. } = fixture();
    let def = serde_json::from_str(r#"{"type":"stat","stat":"score","delta":true}"#).unwrap();
    let delta = engine.compile_value(&def).unwrap();

    engine.begin_tick();
    engine.dispatch_named("reward", a0, a0).unwrap();
    assert_eq!(engine.resolve_value(&delta, a0), 1.5);
    engine.begin_tick();
    assert_eq!(engine.resolve_value(&delta, a0), 0.0);
    engine.dispatch_named("reward", a0, a0).unwrap();
    assert_eq!(engine.resolve_value(&delta, a0), 1.5);
}

#[test]
fn test_query_inventory_without_source_applies_clamped_deltas() {
    let Fixture { mut engine, a0, a1, a2, .. } = fixture();
    engine.dispatch_named("broadcast", a2, a2).unwrap();
    assert_eq!(energy(&engine, Holder::Entity(a0)), 27);
    assert_eq!(energy(&engine, Holder::Entity(a1)), 27);
    assert_eq!(energy(&engine, Holder::Entity(a2)), 20);
}

#[test]
fn test_query_inventory_transfer_skips_pairs_the_source_cannot_afford() {
    let Fixture { mut engine, a0, a1, a2, charger } = fixture();
    engine
        .world_mut()
        .inventory_mut(Holder::Entity(charger))
        .unwrap()
        .set(ENERGY, 12);

    let outcome = engine.dispatch_named("distribute", charger, charger).unwrap();
    assert!(outcome.fired);
    assert_eq!(outcome.rejected, 1);

    // Targets are served in id order until the source runs dry
    assert_eq!(energy(&engine, Holder::Entity(a0)), 25);
    assert_eq!(energy(&engine, Holder::Entity(a1)), 25);
    assert_eq!(energy(&engine, Holder::Entity(a2)), 20);
    assert_eq!(energy(&engine, Holder::Entity(charger)), 2);
}

#[test]
fn test_query_inventory_transfer_debits_source_exactly() {
    let Fixture { mut engine, charger, .. } = fixture();
    let before: i32 = engine
        .tag_members("type:agent")
        .iter()
        .map(|&a| energy(&engine, Holder::Entity(a)))
        .sum();

    let outcome = engine.dispatch_named("distribute", charger, charger).unwrap();
    assert_eq!(outcome.rejected, 0);

    let after: i32 = engine
        .tag_members("type:agent")
        .iter()
        .map(|&a| energy(&engine, Holder::Entity(a)))
        .sum();
    assert_eq!(after - before, 15);
    assert_eq!(energy(&engine, Holder::Entity(charger)), 15);
}

#[test]
fn test_snapshot_is_name_keyed() {
    let Fixture { engine, a0, .. } = fixture();
    let snapshot = engine.snapshot();
    let agent = &snapshot.entities[a0.0 as usize];
    assert_eq!(agent.object_type, "agent");
    assert_eq!(agent.collective.as_deref(), Some("cogs"));
    assert_eq!(agent.inventory.get("energy"), Some(&20));
    assert!(agent.tags.contains(&"type:agent".to_string()));
    assert!(serde_json::to_string(&snapshot).is_ok());
}
