use crate::core::{ModelError, Result, Value};
use serde::{Deserialize, Serialize};

/// Describes where an entity type is stored and which attributes form its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub table_name: String,
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Injected when an instance is built without a sort-key value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key_default: Option<Value>,
}

impl EntityDescriptor {
    /// Creates a validated descriptor keyed by a partition key only.
    pub fn new(table_name: impl Into<String>, partition_key: impl Into<String>) -> Result<Self> {
        let descriptor = Self {
            table_name: table_name.into(),
            partition_key: partition_key.into(),
            sort_key: None,
            sort_key_default: None,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Result<Self> {
        self.sort_key = Some(sort_key.into());
        self.validate()?;
        Ok(self)
    }

    pub fn with_sort_key_default(mut self, default: impl Into<Value>) -> Result<Self> {
        self.sort_key_default = Some(default.into());
        self.validate()?;
        Ok(self)
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Key attribute names, partition key first.
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }

    pub fn is_key_attribute(&self, name: &str) -> bool {
        self.key_names().any(|key| key == name)
    }

    /// The default to inject, only when a sort key is declared.
    pub fn effective_sort_key_default(&self) -> Option<(&str, &Value)> {
        match (&self.sort_key, &self.sort_key_default) {
            (Some(name), Some(default)) => Some((name.as_str(), default)),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(ModelError::configuration("Entity table name must not be empty"));
        }
        if self.partition_key.trim().is_empty() {
            return Err(ModelError::configuration(format!(
                "Entity '{}' does not define a partition key",
                self.table_name
            )));
        }
        if let Some(sort_key) = &self.sort_key {
            if sort_key.trim().is_empty() {
                return Err(ModelError::configuration(format!(
                    "Entity '{}' declares an empty sort key name",
                    self.table_name
                )));
            }
            if sort_key == &self.partition_key {
                return Err(ModelError::configuration(format!(
                    "Entity '{}' uses '{}' as both partition and sort key",
                    self.table_name, sort_key
                )));
            }
        }
        Ok(())
    }
}
