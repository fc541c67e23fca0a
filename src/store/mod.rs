//! Item store contract consumed by the command builder.
//!
//! Requests are plain data so that they can be logged, recorded by a dry run,
//! or replayed against any backend implementing [`ItemStore`].

use crate::core::{Item, ItemKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod condition;
pub mod memory;

pub use condition::{Condition, Predicate};
pub use memory::MemoryStore;

/// Failures reported by a store backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// A condition expression attached to a write evaluated to false.
    #[error("Conditional check failed")]
    ConditionFailed,

    /// The backend rejected the request shape (missing key, unknown table, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rate limited by the backend.
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Network or backend failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutItemRequest {
    pub table_name: String,
    pub item: Item,
    pub conditions: Vec<Condition>,
}

/// Partial update: only the listed attributes are written. A `Null` value
/// removes the attribute from the stored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    pub table_name: String,
    pub key: ItemKey,
    pub attributes: Item,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteItemRequest {
    pub table_name: String,
    pub key: ItemKey,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetItemRequest {
    pub table_name: String,
    pub key: ItemKey,
    pub consistent_read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub filters: Vec<Condition>,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<ItemKey>,
    pub consistent_read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_conditions: Vec<Condition>,
    pub filters: Vec<Condition>,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<ItemKey>,
    pub consistent_read: bool,
}

/// One page of scan/query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Key of the last item read; `Some` when more items may follow.
    pub last_evaluated_key: Option<ItemKey>,
}

/// Any request the builder can issue, as recorded by dry runs and request logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreRequest {
    Put(PutItemRequest),
    Update(UpdateItemRequest),
    Delete(DeleteItemRequest),
    Get(GetItemRequest),
    Scan(ScanRequest),
    Query(QueryRequest),
}

impl StoreRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Put(_) => "PutItem",
            Self::Update(_) => "UpdateItem",
            Self::Delete(_) => "DeleteItem",
            Self::Get(_) => "GetItem",
            Self::Scan(_) => "Scan",
            Self::Query(_) => "Query",
        }
    }

    pub fn table_name(&self) -> &str {
        match self {
            Self::Put(r) => &r.table_name,
            Self::Update(r) => &r.table_name,
            Self::Delete(r) => &r.table_name,
            Self::Get(r) => &r.table_name,
            Self::Scan(r) => &r.table_name,
            Self::Query(r) => &r.table_name,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Put(_) | Self::Update(_) | Self::Delete(_))
    }
}

/// Backend executing item-level requests against a composite-key store.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Writes a full item; fails with [`StoreError::ConditionFailed`] when a
    /// condition does not hold for the current item (absent items included).
    async fn put_item(&self, request: PutItemRequest) -> StoreResult<()>;
    /// Writes only the given attributes of the addressed item, creating it if needed.
    async fn update_item(&self, request: UpdateItemRequest) -> StoreResult<()>;
    /// Removes the addressed item; deleting a missing item succeeds.
    async fn delete_item(&self, request: DeleteItemRequest) -> StoreResult<()>;
    async fn get_item(&self, request: GetItemRequest) -> StoreResult<Option<Item>>;
    async fn scan(&self, request: ScanRequest) -> StoreResult<ItemPage>;
    async fn query(&self, request: QueryRequest) -> StoreResult<ItemPage>;
}
