use thiserror::Error;

use crate::core::types::{Amount, EntityId};

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Unresolved {kind} reference: {name}")]
    UnresolvedReference { kind: &'static str, name: String },

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Invalid limit for resource {resource}: min {min} > max {max}")]
    InvalidLimit {
        resource: String,
        min: Amount,
        max: Amount,
    },

    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Tag capacity exceeded: at most {max} tags may be registered")]
    TagCapacityExceeded { max: usize },

    #[error("Entity not found: {0:?}")]
    EntityNotFound(EntityId),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuleError {
    pub fn unresolved(kind: &'static str, name: impl Into<String>) -> Self {
        RuleError::UnresolvedReference {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
