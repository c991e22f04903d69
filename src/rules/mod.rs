//! Runtime rules: values, filters, queries and mutations, plus the step that
//! compiles them from configuration

pub mod context;
pub mod filter;
pub mod loader;
pub mod mutation;
pub mod query;
pub mod values;

pub use context::{EntityRef, EvalContext, MutationContext, Side, StatBaselines, TickRng};
pub use filter::{AlignmentCondition, Filter};
pub use loader::{compile, CompiledRules};
pub use mutation::{AlignTo, Mutation, MutationOutcome, StatsTarget, ValueSource};
pub use query::{ClosureQuery, MaterializedQuery, ObjectQuery, Query, QueryOrder};
pub use values::{Comparison, GameValue, ValueScope};
