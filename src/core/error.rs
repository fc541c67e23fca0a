use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Precondition violation: key attribute '{attribute}' of table '{table}' is empty")]
    PreconditionViolation { table: String, attribute: String },

    #[error("Item already exists in table '{table}' for key {key}")]
    ItemAlreadyExists { table: String, key: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No such method: {0}")]
    UnknownMethod(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Hook '{event}' failed: {message}")]
    Hook { event: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl ModelError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn hook(event: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Hook {
            event: event.into(),
            message: msg.into(),
        }
    }

    /// Returns `true` when an insert collided with an existing item.
    pub fn is_item_already_exists(&self) -> bool {
        matches!(self, Self::ItemAlreadyExists { .. })
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
