// ============================================================================
// kvmodel Library
// ============================================================================

pub mod builder;
pub mod config;
pub mod core;
pub mod model;
pub mod prelude;
pub mod store;

// Re-export main types for convenience
pub use crate::builder::CommandBuilder;
pub use crate::config::{EntityConfig, ModelConfig};
pub use crate::core::{Item, ItemKey, ModelError, Result, Value};
pub use crate::model::{
    AttributeState, DeleteOutcome, Entity, EntityCommands, EntityDescriptor, Forwarded,
    HookSignal, LifecycleEvent, Model, ModelBuilder, TimestampConfig, TimestampPolicy, Timestamps,
};
pub use crate::store::{
    Condition, ItemPage, ItemStore, MemoryStore, Predicate, StoreError, StoreRequest,
    memory::KeySchema,
};
