pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{Result, RuleError};
pub use registry::{NameTable, Registry, RegistryId};
