// Save and delete transitions of an entity instance.
//
// Each operation issues at most one store command through a fresh
// CommandBuilder. Instance state (exists, dirty, recently_created) changes
// only after the store reports success.

use super::attributes::AttributeState;
use super::entity::Entity;
use super::hooks::LifecycleEvent;
use super::key::{derive_key, ensure_complete};
use crate::builder::CommandBuilder;
use crate::core::value::display_key;
use crate::core::{ModelError, Result};
use crate::store::{ItemStore, Predicate, StoreError};
use tracing::{Instrument, Level, event, info_span};

/// Result of [`Entity::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// A `deleting` observer cancelled the transition.
    Vetoed,
    /// The instance was never persisted; nothing was sent.
    NotPersisted,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl Entity {
    fn fire(&mut self, event: LifecycleEvent) -> Result<bool> {
        let model = self.model.clone();
        let proceed = model.hooks().fire(event, self)?;
        if !proceed {
            event!(Level::DEBUG, event = event.name(), "lifecycle transition vetoed");
        }
        Ok(proceed)
    }

    /// Stamps timestamps and returns the unstamped state for rollback.
    fn touch_timestamps(&mut self, creating: bool) -> Option<AttributeState> {
        let model = self.model.clone();
        let policy = model.timestamps()?;
        let unstamped = self.attributes.clone();
        policy.touch(&mut self.attributes, creating);
        Some(unstamped)
    }

    /// Undoes the stamping of a write the store did not accept.
    fn rollback_timestamps(&mut self, unstamped: Option<AttributeState>) {
        if let Some(unstamped) = unstamped {
            self.attributes = unstamped;
        }
    }

    /// Inserts or updates the instance.
    ///
    /// Returns `Ok(false)` when an observer vetoed the transition. An
    /// existing instance with no dirty attributes succeeds without a store
    /// call.
    pub async fn save(&mut self, store: &dyn ItemStore) -> Result<bool> {
        let span = info_span!(
            "entity.save",
            table = %self.table_name(),
            exists = self.exists
        );
        self.save_inner(store).instrument(span).await
    }

    async fn save_inner(&mut self, store: &dyn ItemStore) -> Result<bool> {
        self.descriptor().validate()?;

        if !self.fire(LifecycleEvent::Saving)? {
            return Ok(false);
        }

        let saved = if self.exists {
            if self.attributes.is_dirty() {
                self.perform_update(store).await?
            } else {
                event!(Level::DEBUG, "no dirty attributes, update skipped");
                true
            }
        } else {
            self.perform_insert(store).await?
        };

        if saved {
            self.fire(LifecycleEvent::Saved)?;
        }
        Ok(saved)
    }

    async fn perform_update(&mut self, store: &dyn ItemStore) -> Result<bool> {
        if !self.fire(LifecycleEvent::Updating)? {
            return Ok(false);
        }

        let unstamped = self.touch_timestamps(false);

        let dirty = self.attributes.dirty_attributes();
        if dirty.is_empty() {
            return Ok(true);
        }

        let key = derive_key(self.descriptor(), &self.attributes);
        event!(
            Level::DEBUG,
            key = %display_key(&key),
            attributes = dirty.len(),
            "updating item"
        );

        let mut builder = CommandBuilder::new(store, self.table_name());
        if let Err(err) = builder.key(key).update_item(dirty).await {
            event!(Level::ERROR, error = %err, "update failed");
            self.rollback_timestamps(unstamped);
            return Err(err);
        }

        self.attributes.mark_synced();
        self.fire(LifecycleEvent::Updated)?;
        Ok(true)
    }

    async fn perform_insert(&mut self, store: &dyn ItemStore) -> Result<bool> {
        if !self.fire(LifecycleEvent::Creating)? {
            return Ok(false);
        }

        let unstamped = self.touch_timestamps(true);

        let item = self.attributes.all_attributes();
        if item.is_empty() {
            event!(Level::DEBUG, "no attributes, insert skipped");
            self.attributes.mark_synced();
            return Ok(true);
        }

        let key = derive_key(self.descriptor(), &self.attributes);
        let mut builder = CommandBuilder::new(store, self.table_name());
        for name in key.keys() {
            builder.condition(name.clone(), Predicate::NotExists);
        }

        match builder.put_item(item).await {
            Ok(()) => {}
            Err(ModelError::Store(StoreError::ConditionFailed)) => {
                let key = display_key(&key);
                event!(Level::WARN, key = %key, "insert collided with an existing item");
                self.rollback_timestamps(unstamped);
                return Err(ModelError::ItemAlreadyExists {
                    table: self.table_name().to_string(),
                    key,
                });
            }
            Err(err) => {
                event!(Level::ERROR, error = %err, "insert failed");
                self.rollback_timestamps(unstamped);
                return Err(err);
            }
        }

        self.attributes.mark_synced();
        self.exists = true;
        self.recently_created = true;
        self.fire(LifecycleEvent::Created)?;
        Ok(true)
    }

    /// Deletes the stored item addressed by this instance's key.
    ///
    /// Every key attribute must hold a non-empty value; otherwise the call
    /// fails with [`ModelError::PreconditionViolation`] before any observer
    /// runs.
    pub async fn delete(&mut self, store: &dyn ItemStore) -> Result<DeleteOutcome> {
        let span = info_span!("entity.delete", table = %self.table_name());
        self.delete_inner(store).instrument(span).await
    }

    async fn delete_inner(&mut self, store: &dyn ItemStore) -> Result<DeleteOutcome> {
        self.descriptor().validate()?;

        let key = derive_key(self.descriptor(), &self.attributes);
        ensure_complete(self.descriptor(), &key)?;

        if !self.exists {
            return Ok(DeleteOutcome::NotPersisted);
        }

        if !self.fire(LifecycleEvent::Deleting)? {
            return Ok(DeleteOutcome::Vetoed);
        }

        event!(Level::DEBUG, key = %display_key(&key), "deleting item");
        let mut builder = CommandBuilder::new(store, self.table_name());
        if let Err(err) = builder.key(key).delete_item().await {
            event!(Level::ERROR, error = %err, "delete failed");
            return Err(err);
        }

        self.exists = false;
        self.fire(LifecycleEvent::Deleted)?;
        Ok(DeleteOutcome::Deleted)
    }
}
