//! Tag name -> bit position table
//!
//! A tag keeps the bit it was first given for the whole run. The table has a
//! fixed capacity chosen at configuration time so every bitset has the same
//! width.

use ahash::AHashMap;

use crate::core::error::{Result, RuleError};
use crate::core::types::TagId;

/// Default tag capacity when the configuration does not set one
pub const DEFAULT_MAX_TAGS: usize = 256;

/// Prefix of the implicit tag carried by every object of a type
pub const TYPE_TAG_PREFIX: &str = "type:";

/// Prefix of the implicit tag carried by every member of a collective
pub const COLLECTIVE_TAG_PREFIX: &str = "collective:";

pub fn type_tag(object_type: &str) -> String {
    format!("{}{}", TYPE_TAG_PREFIX, object_type)
}

pub fn collective_tag(collective: &str) -> String {
    format!("{}{}", COLLECTIVE_TAG_PREFIX, collective)
}

#[derive(Debug, Clone)]
pub struct TagRegistry {
    names: Vec<String>,
    by_name: AHashMap<String, TagId>,
    max_tags: usize,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_TAGS)
    }
}

impl TagRegistry {
    pub fn with_capacity(max_tags: usize) -> Self {
        Self {
            names: Vec::new(),
            by_name: AHashMap::new(),
            max_tags: max_tags.min(u16::MAX as usize + 1),
        }
    }

    /// Assign a bit to `name`, or return the bit it already has
    pub fn register(&mut self, name: &str) -> Result<TagId> {
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        if self.names.len() >= self.max_tags {
            return Err(RuleError::TagCapacityExceeded { max: self.max_tags });
        }
        let id = TagId(self.names.len() as u16);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    pub fn resolve(&self, name: &str) -> Result<TagId> {
        self.get(name).ok_or_else(|| RuleError::unresolved("tag", name))
    }

    pub fn name(&self, id: TagId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// All registered tags whose name starts with `prefix`, ascending by id
    pub fn with_prefix(&self, prefix: &str) -> Vec<TagId> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(prefix))
            .map(|(i, _)| TagId(i as u16))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_tags
    }
}
