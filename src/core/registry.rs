//! Name tables mapping configured names to dense ids
//!
//! Every table is filled once while the configuration is compiled and is
//! read-only afterwards. Ids are assigned in registration order.

use ahash::AHashMap;

use crate::core::error::{Result, RuleError};
use crate::core::types::{CollectiveId, HandlerId, ObjectTypeId, ResourceId, StatId, VibeId};
use crate::tags::TagRegistry;

/// A dense id that can index a `NameTable`
pub trait RegistryId: Copy {
    /// Label used in `UnresolvedReference` errors
    const KIND: &'static str;
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! registry_id {
    ($ty:ident, $inner:ty, $kind:literal) => {
        impl RegistryId for $ty {
            const KIND: &'static str = $kind;
            #[inline]
            fn from_index(index: usize) -> Self {
                $ty(index as $inner)
            }
            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

registry_id!(ResourceId, u16, "resource");
registry_id!(StatId, u16, "stat");
registry_id!(VibeId, u8, "vibe");
registry_id!(CollectiveId, u16, "collective");
registry_id!(ObjectTypeId, u16, "object type");
registry_id!(HandlerId, u16, "handler");

/// Bidirectional name <-> id table
#[derive(Debug, Clone)]
pub struct NameTable<I: RegistryId> {
    names: Vec<String>,
    by_name: AHashMap<String, I>,
}

impl<I: RegistryId> Default for NameTable<I> {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            by_name: AHashMap::new(),
        }
    }
}

impl<I: RegistryId> NameTable<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut table = Self::new();
        for name in names {
            table.register(name.as_ref());
        }
        table
    }

    /// Register a name, returning the existing id if already present
    pub fn register(&mut self, name: &str) -> I {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = I::from_index(self.names.len());
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<I> {
        self.by_name.get(name).copied()
    }

    /// Look up a name, failing with `UnresolvedReference`
    pub fn resolve(&self, name: &str) -> Result<I> {
        self.get(name)
            .ok_or_else(|| RuleError::unresolved(I::KIND, name))
    }

    pub fn name(&self, id: I) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (I::from_index(i), name.as_str()))
    }
}

/// Every name the engine knows about, fixed for the lifetime of a run
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub resources: NameTable<ResourceId>,
    pub stats: NameTable<StatId>,
    pub vibes: NameTable<VibeId>,
    pub collectives: NameTable<CollectiveId>,
    pub object_types: NameTable<ObjectTypeId>,
    pub tags: TagRegistry,
}
