//! Common imports for application code.
//!
//! ```
//! use kvmodel::prelude::*;
//!
//! # async fn demo() -> kvmodel::Result<()> {
//! let store = MemoryStore::new();
//! store.create_table("users", KeySchema::new("id")).await;
//!
//! let users = Model::new(EntityDescriptor::new("users", "id")?)?;
//! let mut user = users.new_entity([("id", "a1"), ("name", "Alice")]);
//! user.save(&store).await?;
//! # Ok(())
//! # }
//! ```

pub use crate::{
    DeleteOutcome, Entity, EntityDescriptor, HookSignal, Item, ItemKey, ItemStore, KeySchema,
    LifecycleEvent, MemoryStore, Model, ModelError, Predicate, Value,
};
