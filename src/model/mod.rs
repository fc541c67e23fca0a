//! Entity persistence lifecycle: descriptors, attribute state, key
//! derivation, observers and the save/delete transitions.

pub mod attributes;
pub mod descriptor;
pub mod entity;
pub mod forwarder;
pub mod hooks;
pub mod key;
pub mod lifecycle;
pub mod timestamps;

pub use attributes::AttributeState;
pub use descriptor::EntityDescriptor;
pub use entity::{Entity, Model, ModelBuilder};
pub use forwarder::{EntityCommands, FORWARDED_METHODS, Forwarded, MethodDescriptor};
pub use hooks::{HookRegistry, HookSignal, LifecycleEvent, LifecycleHook};
pub use key::{derive_key, ensure_complete};
pub use lifecycle::DeleteOutcome;
pub use timestamps::{TimestampConfig, TimestampPolicy, Timestamps};
