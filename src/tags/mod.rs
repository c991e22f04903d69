//! Tag registry, bitsets and the Tag Index

pub mod bitset;
pub mod index;
pub mod registry;

pub use bitset::TagBits;
pub use index::TagIndex;
pub use registry::{collective_tag, type_tag, TagRegistry, DEFAULT_MAX_TAGS};
