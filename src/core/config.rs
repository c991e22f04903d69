//! Engine configuration as loaded from TOML or JSON
//!
//! Everything here is addressed by name. `rules::loader::compile` resolves the
//! names once and produces the id-based runtime rules; nothing in this module
//! is consulted after that.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{Amount, DistanceMetric, Tick};
use crate::rules::context::{EntityRef, Side};
use crate::rules::mutation::StatsTarget;
use crate::rules::query::QueryOrder;
use crate::rules::values::{Comparison, ValueScope};
use crate::tags::DEFAULT_MAX_TAGS;

fn default_max_tags() -> usize {
    DEFAULT_MAX_TAGS
}

fn default_resource_max() -> Amount {
    Amount::MAX
}

fn default_actor() -> EntityRef {
    EntityRef::Actor
}

fn default_stat_delta() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed for the per-tick random stream
    #[serde(default)]
    pub seed: u64,
    /// Fixed tag capacity; every tag bitset has this width
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    #[serde(default)]
    pub stats: Vec<String>,
    #[serde(default)]
    pub vibes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collectives: Vec<CollectiveDef>,
    #[serde(default)]
    pub object_types: Vec<ObjectTypeDef>,
    #[serde(default)]
    pub handlers: Vec<HandlerDef>,
    #[serde(default)]
    pub materialized_queries: Vec<MaterializedQueryDef>,
    #[serde(default)]
    pub territory: TerritoryDef,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a `.json` or `.toml` file (anything not `.json` is read as TOML)
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }
}

/// A resource and its default bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    pub name: String,
    #[serde(default)]
    pub min: Amount,
    #[serde(default = "default_resource_max")]
    pub max: Amount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitDef {
    pub min: Option<Amount>,
    pub max: Option<Amount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectiveDef {
    pub name: String,
    #[serde(default)]
    pub inventory: BTreeMap<String, Amount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectTypeDef {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Per-type overrides of the resource bounds
    #[serde(default)]
    pub limits: BTreeMap<String, LimitDef>,
    #[serde(default)]
    pub inventory: BTreeMap<String, Amount>,
    #[serde(default)]
    pub vibe: Option<String>,
    /// Handlers tried in order when an actor uses this object
    #[serde(default)]
    pub on_use: Vec<String>,
    /// Handlers run every tick with the object as actor and target
    #[serde(default)]
    pub on_tick: Vec<String>,
    #[serde(default)]
    pub aoes: Vec<AoeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerDef {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<FilterDef>,
    #[serde(default)]
    pub mutations: Vec<MutationDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AoeDef {
    pub radius: u32,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub include_source: bool,
    /// Counts towards the territory feature
    #[serde(default)]
    pub territory: bool,
    #[serde(default)]
    pub filters: Vec<FilterDef>,
    #[serde(default)]
    pub mutations: Vec<MutationDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedQueryDef {
    pub tag: String,
    pub query: QueryDef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerritoryDef {
    /// Collective that gives way on an exact distance tie
    #[serde(default)]
    pub yield_on_tie: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentConditionDef {
    Aligned,
    Unaligned,
    SameCollective,
    DifferentCollective,
    Collective(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignToDef {
    ActorCollective,
    Unaligned,
    Collective(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameValueDef {
    Inventory {
        #[serde(default)]
        scope: ValueScope,
        resource: String,
    },
    Stat {
        #[serde(default)]
        scope: ValueScope,
        stat: String,
        #[serde(default)]
        delta: bool,
    },
    TagCount {
        tag: String,
    },
    NumObjects {
        object_type: String,
    },
    Constant {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterDef {
    Tag {
        #[serde(default)]
        target: EntityRef,
        tag: String,
    },
    TagPrefix {
        #[serde(default)]
        target: EntityRef,
        prefix: String,
    },
    SharedTagPrefix {
        prefix: String,
    },
    Resource {
        #[serde(default)]
        target: EntityRef,
        resources: BTreeMap<String, Amount>,
    },
    Alignment {
        #[serde(default)]
        target: Side,
        condition: AlignmentConditionDef,
    },
    Vibe {
        #[serde(default)]
        target: Side,
        vibe: String,
    },
    MaxDistance {
        #[serde(default)]
        target: Side,
        #[serde(default)]
        radius: u32,
        #[serde(default)]
        query: Option<Box<QueryDef>>,
    },
    Near {
        #[serde(default)]
        target: Side,
        tag: String,
        radius: u32,
        #[serde(default)]
        filters: Vec<FilterDef>,
    },
    GameValue {
        #[serde(default)]
        target: Side,
        value: GameValueDef,
        op: Comparison,
        threshold: f64,
    },
    Not {
        filter: Box<FilterDef>,
    },
    Or {
        filters: Vec<FilterDef>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryDef {
    Tag {
        tag: String,
        #[serde(default)]
        filters: Vec<FilterDef>,
        #[serde(default)]
        max_items: Option<usize>,
        #[serde(default)]
        order_by: Option<QueryOrder>,
    },
    Closure {
        source: Box<QueryDef>,
        #[serde(default)]
        bridge: Vec<FilterDef>,
        radius: u32,
        #[serde(default)]
        filters: Vec<FilterDef>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationDef {
    ResourceDelta {
        #[serde(default)]
        target: EntityRef,
        deltas: BTreeMap<String, Amount>,
    },
    ResourceTransfer {
        #[serde(default = "default_actor")]
        source: EntityRef,
        #[serde(default)]
        destination: EntityRef,
        resources: BTreeMap<String, Amount>,
    },
    Alignment {
        #[serde(default)]
        target: Side,
        align_to: AlignToDef,
    },
    Freeze {
        #[serde(default)]
        target: Side,
        duration: Tick,
    },
    ClearInventory {
        #[serde(default)]
        target: EntityRef,
        #[serde(default)]
        resources: Vec<String>,
    },
    AddTag {
        #[serde(default)]
        target: Side,
        tag: String,
    },
    RemoveTag {
        #[serde(default)]
        target: Side,
        tag: String,
    },
    RemoveTagsWithPrefix {
        #[serde(default)]
        target: Side,
        prefix: String,
    },
    Stats {
        stat: String,
        #[serde(default = "default_stat_delta")]
        delta: f64,
        #[serde(default)]
        target: StatsTarget,
    },
    SetGameValue {
        value: GameValueDef,
        #[serde(default)]
        target: Side,
        #[serde(default)]
        delta: f64,
        #[serde(default)]
        source: Option<GameValueDef>,
    },
    QueryInventory {
        query: QueryDef,
        deltas: BTreeMap<String, Amount>,
        #[serde(default)]
        source: Option<EntityRef>,
    },
    RecomputeMaterializedQuery {
        prefix: String,
    },
    RecomputeQueryTag {
        tag: String,
    },
}
