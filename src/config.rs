use crate::core::{ModelError, Result};
use crate::model::{EntityDescriptor, Model, TimestampConfig, Timestamps};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Entity type configuration
///
/// Holds named entity descriptors plus settings shared by every model built
/// from them. Usually loaded from a JSON document:
///
/// ```json
/// {
///   "table_prefix": "staging_",
///   "timestamps": { "updated_attribute": "modified_at" },
///   "entities": {
///     "user": { "table_name": "users", "partition_key": "id" },
///     "document": {
///       "table_name": "documents",
///       "partition_key": "id",
///       "sort_key": "rev",
///       "sort_key_default": "v0",
///       "timestamps": true
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Prepended to every table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_prefix: Option<String>,

    /// Attribute names used by timestamped entities
    #[serde(default)]
    pub timestamps: TimestampConfig,

    /// Entity descriptors by logical name
    #[serde(default)]
    pub entities: BTreeMap<String, EntityConfig>,
}

/// One configured entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(flatten)]
    pub descriptor: EntityDescriptor,

    /// Stamp created/updated attributes on writes
    #[serde(default)]
    pub timestamps: bool,
}

impl ModelConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table prefix
    pub fn table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = Some(prefix.to_string());
        self
    }

    /// Set the timestamp attribute names
    pub fn timestamp_attributes(mut self, created: &str, updated: &str) -> Self {
        self.timestamps = TimestampConfig {
            created_attribute: created.to_string(),
            updated_attribute: updated.to_string(),
        };
        self
    }

    /// Register an entity type
    pub fn entity(mut self, name: &str, descriptor: EntityDescriptor, timestamps: bool) -> Self {
        self.entities.insert(
            name.to_string(),
            EntityConfig {
                descriptor,
                timestamps,
            },
        );
        self
    }

    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every configured entity
    pub fn validate(&self) -> Result<()> {
        for (name, entity) in &self.entities {
            entity.descriptor.validate().map_err(|err| {
                ModelError::configuration(format!("entity '{}': {}", name, err))
            })?;
        }
        Ok(())
    }

    /// Descriptor for `name` with the table prefix applied
    pub fn descriptor(&self, name: &str) -> Result<EntityDescriptor> {
        let entity = self.entity_config(name)?;
        let descriptor = match &self.table_prefix {
            Some(prefix) => {
                let table = format!("{}{}", prefix, entity.descriptor.table_name);
                entity.descriptor.clone().with_table_name(table)
            }
            None => entity.descriptor.clone(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Build a model for `name` without observers
    ///
    /// Use [`Model::builder`] with [`Self::descriptor`] to attach observers.
    pub fn model(&self, name: &str) -> Result<Model> {
        let mut builder = Model::builder(self.descriptor(name)?);
        if self.entity_config(name)?.timestamps {
            builder = builder.timestamp_policy(Timestamps::new(self.timestamps.clone()));
        }
        builder.build()
    }

    fn entity_config(&self, name: &str) -> Result<&EntityConfig> {
        self.entities
            .get(name)
            .ok_or_else(|| ModelError::configuration(format!("Unknown entity '{}'", name)))
    }
}
