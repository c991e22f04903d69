//! Handler dispatch, AOE passes, territory and the engine that drives them

pub mod aoe;
pub mod engine;
pub mod rule_eval;
pub mod territory;

pub use aoe::{AoeEffect, AoePassReport, AoeStance};
pub use engine::{RuleEngine, TickReport};
pub use rule_eval::{dispatch_first, evaluate_handler, Handler, HandlerOutcome};
pub use territory::{TerritoryResolver, TerritorySource};
