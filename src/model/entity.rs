use super::attributes::AttributeState;
use super::descriptor::EntityDescriptor;
use super::forwarder::EntityCommands;
use super::hooks::{HookRegistry, HookSignal, LifecycleEvent};
use super::key::derive_key;
use super::timestamps::{TimestampPolicy, Timestamps};
use crate::builder::CommandBuilder;
use crate::core::{Item, ItemKey, Result, Value};
use crate::store::ItemStore;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

struct ModelInner {
    descriptor: EntityDescriptor,
    hooks: HookRegistry,
    timestamps: Option<Arc<dyn TimestampPolicy>>,
}

/// Per-type handle: descriptor, observers and timestamp policy shared by
/// every instance of the entity type. Cheap to clone.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    /// Model without observers or timestamps.
    pub fn new(descriptor: EntityDescriptor) -> Result<Self> {
        Self::builder(descriptor).build()
    }

    pub fn builder(descriptor: EntityDescriptor) -> ModelBuilder {
        ModelBuilder {
            descriptor,
            hooks: HookRegistry::new(),
            timestamps: None,
        }
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.inner.descriptor
    }

    pub fn table_name(&self) -> &str {
        &self.inner.descriptor.table_name
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.inner.hooks
    }

    pub(crate) fn timestamps(&self) -> Option<&dyn TimestampPolicy> {
        self.inner
            .timestamps
            .as_deref()
            .filter(|policy| policy.uses_timestamps())
    }

    pub fn uses_timestamps(&self) -> bool {
        self.timestamps().is_some()
    }

    /// Builds an unsaved instance.
    ///
    /// A declared sort-key default is seeded first, as a clean attribute,
    /// unless `attributes` carries an explicit sort-key value.
    pub fn new_entity<I, K, V>(&self, attributes: I) -> Entity
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let input: Item = attributes
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();

        let mut state = AttributeState::new();
        if let Some((name, default)) = self.descriptor().effective_sort_key_default() {
            if !input.contains_key(name) {
                state.seed(name, default.clone());
            }
        }
        state.fill(input);

        Entity {
            model: self.clone(),
            attributes: state,
            exists: false,
            recently_created: false,
        }
    }

    /// Wraps an item read from the store: persisted and clean.
    pub fn hydrate(&self, item: Item) -> Entity {
        Entity {
            model: self.clone(),
            attributes: AttributeState::synced_from(item),
            exists: true,
            recently_created: false,
        }
    }

    /// Reads one item by key and hydrates it.
    pub async fn find(&self, store: &dyn ItemStore, key: ItemKey) -> Result<Option<Entity>> {
        let item = CommandBuilder::new(store, self.table_name())
            .key(key)
            .get_item()
            .await?;
        Ok(item.map(|item| self.hydrate(item)))
    }

    /// Builds and saves an instance. Check [`Entity::exists`] to tell a
    /// vetoed insert from a stored one.
    pub async fn create<I, K, V>(&self, store: &dyn ItemStore, attributes: I) -> Result<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut entity = self.new_entity(attributes);
        entity.save(store).await?;
        Ok(entity)
    }

    /// Allow-listed builder verbs scoped to this entity's table.
    pub fn commands<'s>(&self, store: &'s dyn ItemStore) -> EntityCommands<'s> {
        EntityCommands::new(CommandBuilder::new(store, self.table_name()))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("descriptor", &self.inner.descriptor)
            .field("hooks", &self.inner.hooks)
            .field("uses_timestamps", &self.uses_timestamps())
            .finish()
    }
}

pub struct ModelBuilder {
    descriptor: EntityDescriptor,
    hooks: HookRegistry,
    timestamps: Option<Arc<dyn TimestampPolicy>>,
}

impl ModelBuilder {
    /// Appends an observer for `event`.
    pub fn on<F>(mut self, event: LifecycleEvent, hook: F) -> Self
    where
        F: Fn(&mut Entity) -> Result<HookSignal> + Send + Sync + 'static,
    {
        self.hooks.register(event, Arc::new(hook));
        self
    }

    /// Stamps `created_at` / `updated_at` on writes.
    pub fn timestamps(self) -> Self {
        self.timestamp_policy(Timestamps::default())
    }

    pub fn timestamp_policy(mut self, policy: impl TimestampPolicy + 'static) -> Self {
        self.timestamps = Some(Arc::new(policy));
        self
    }

    pub fn build(self) -> Result<Model> {
        self.descriptor.validate()?;
        Ok(Model {
            inner: Arc::new(ModelInner {
                descriptor: self.descriptor,
                hooks: self.hooks,
                timestamps: self.timestamps,
            }),
        })
    }
}

/// One in-memory instance of an entity type.
#[derive(Clone)]
pub struct Entity {
    pub(super) model: Model,
    pub(super) attributes: AttributeState,
    pub(super) exists: bool,
    pub(super) recently_created: bool,
}

impl Entity {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        self.model.descriptor()
    }

    pub fn table_name(&self) -> &str {
        self.model.table_name()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.set(name, value);
    }

    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.attributes.unset(name)
    }

    pub fn fill<I, K, V>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.attributes.fill(attributes);
    }

    pub fn attributes(&self) -> &Item {
        self.attributes.attributes()
    }

    pub fn attribute_state(&self) -> &AttributeState {
        &self.attributes
    }

    pub fn is_dirty(&self) -> bool {
        self.attributes.is_dirty()
    }

    pub fn dirty_names(&self) -> BTreeSet<String> {
        self.attributes.dirty_names()
    }

    pub fn dirty_attributes(&self) -> Item {
        self.attributes.dirty_attributes()
    }

    /// Whether the instance is believed to be persisted.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// `true` after the save call that inserted this instance.
    pub fn was_recently_created(&self) -> bool {
        self.recently_created
    }

    /// Composite key from the current attribute values.
    pub fn key(&self) -> ItemKey {
        derive_key(self.descriptor(), &self.attributes)
    }

    /// Fills attributes and saves.
    pub async fn update<I, K, V>(&mut self, store: &dyn ItemStore, attributes: I) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.fill(attributes);
        self.save(store).await
    }

    pub fn commands<'s>(&self, store: &'s dyn ItemStore) -> EntityCommands<'s> {
        self.model.commands(store)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("table", &self.table_name())
            .field("attributes", self.attributes.attributes())
            .field("dirty", &self.attributes.dirty_names())
            .field("exists", &self.exists)
            .field("recently_created", &self.recently_created)
            .finish()
    }
}
