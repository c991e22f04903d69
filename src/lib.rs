//! Grid Rules - deterministic tag, filter, query and mutation engine for
//! multi-agent grid simulations

pub mod core;
pub mod ecs;
pub mod entity;
pub mod rules;
pub mod simulation;
pub mod spatial;
pub mod tags;

pub use crate::core::{Result, RuleError};
pub use crate::core::config::EngineConfig;
pub use crate::core::types::{CollectiveId, EntityId, GridLocation};
pub use crate::ecs::World;
pub use crate::simulation::RuleEngine;
