use super::{
    Condition, DeleteItemRequest, GetItemRequest, ItemPage, ItemStore, PutItemRequest,
    QueryRequest, ScanRequest, StoreError, StoreRequest, StoreResult, UpdateItemRequest,
    condition::all_match,
};
use crate::core::value::exact_i64;
use crate::core::{Item, ItemKey, Value};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Level, event};

/// Key attribute names of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    fn key_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }

    fn is_key_attribute(&self, name: &str) -> bool {
        self.key_names().any(|key| key == name)
    }
}

#[derive(Debug)]
struct MemoryTable {
    schema: KeySchema,
    items: BTreeMap<String, Item>,
}

impl MemoryTable {
    /// Extracts the key of `source` and returns it with its storage slot.
    fn slot_for(&self, table: &str, source: &BTreeMap<String, Value>) -> StoreResult<(String, ItemKey)> {
        let mut key = ItemKey::new();
        for name in self.schema.key_names() {
            let value = source
                .get(name)
                .filter(|value| !value.is_empty_key_part())
                .ok_or_else(|| {
                    StoreError::validation(format!(
                        "Missing key attribute '{}' for table '{}'",
                        name, table
                    ))
                })?;
            key.insert(name.to_string(), value.clone());
        }
        let slot = encode_slot(&key)?;
        Ok((slot, key))
    }

    fn check_key_shape(&self, table: &str, key: &ItemKey) -> StoreResult<()> {
        if let Some(extra) = key.keys().find(|name| !self.schema.is_key_attribute(name)) {
            return Err(StoreError::validation(format!(
                "Attribute '{}' is not part of the key of table '{}'",
                extra, table
            )));
        }
        Ok(())
    }

    fn key_of(&self, item: &Item) -> ItemKey {
        self.schema
            .key_names()
            .filter_map(|name| item.get(name).map(|value| (name.to_string(), value.clone())))
            .collect()
    }

    fn page<'a>(
        &'a self,
        table: &str,
        exclusive_start_key: Option<&ItemKey>,
        limit: Option<usize>,
        mut accept: impl FnMut(&'a Item) -> bool,
    ) -> StoreResult<ItemPage> {
        if limit == Some(0) {
            return Err(StoreError::validation("Limit must be greater than zero"));
        }
        let start = exclusive_start_key
            .map(|key| self.slot_for(table, key).map(|(slot, _)| slot))
            .transpose()?;

        let mut page = ItemPage::default();
        let mut evaluated = 0usize;
        let mut remaining = self
            .items
            .iter()
            .filter(|(slot, _)| start.as_ref().is_none_or(|start| *slot > start))
            .peekable();

        while let Some((_, item)) = remaining.next() {
            evaluated += 1;
            if accept(item) {
                page.items.push(item.clone());
            }
            if limit.is_some_and(|limit| evaluated >= limit) {
                if remaining.peek().is_some() {
                    page.last_evaluated_key = Some(self.key_of(item));
                }
                break;
            }
        }

        Ok(page)
    }
}

/// Encodes a key so that numerically equal parts share one slot.
fn encode_slot(key: &ItemKey) -> StoreResult<String> {
    let mut canonical = ItemKey::new();
    for (name, value) in key {
        let part = match value {
            Value::Float(f) if !f.is_finite() => {
                return Err(StoreError::validation(format!(
                    "Key attribute '{}' must be a finite number",
                    name
                )));
            }
            Value::Float(f) => exact_i64(*f).map_or(Value::Float(*f), Value::Integer),
            other => other.clone(),
        };
        canonical.insert(name.clone(), part);
    }
    serde_json::to_string(&canonical).map_err(|err| StoreError::validation(err.to_string()))
}

/// In-process [`ItemStore`] with conditional writes and a request log.
///
/// Secondary indexes are not materialised: requests naming an index are
/// evaluated against the base table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, MemoryTable>>>,
    requests: Arc<Mutex<Vec<StoreRequest>>>,
    injected_failure: Arc<Mutex<Option<StoreError>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table and its key schema. Re-declaring keeps existing items.
    pub async fn create_table(&self, table_name: impl Into<String>, schema: KeySchema) {
        let mut tables = self.tables.lock().await;
        tables.entry(table_name.into()).or_insert_with(|| MemoryTable {
            schema,
            items: BTreeMap::new(),
        });
    }

    pub async fn item_count(&self, table_name: &str) -> usize {
        let tables = self.tables.lock().await;
        tables.get(table_name).map_or(0, |table| table.items.len())
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn clear_requests(&self) {
        self.requests.lock().await.clear();
    }

    /// Makes the next request fail with `error` instead of executing.
    pub async fn fail_next(&self, error: StoreError) {
        *self.injected_failure.lock().await = Some(error);
    }

    async fn admit(&self, request: StoreRequest) -> StoreResult<()> {
        event!(
            Level::TRACE,
            operation = request.operation(),
            table = request.table_name(),
            "memory store request"
        );
        self.requests.lock().await.push(request);
        match self.injected_failure.lock().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn table_mut<'a>(
    tables: &'a mut HashMap<String, MemoryTable>,
    name: &str,
) -> StoreResult<&'a mut MemoryTable> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::validation(format!("Table '{}' not found", name)))
}

fn table_ref<'a>(tables: &'a HashMap<String, MemoryTable>, name: &str) -> StoreResult<&'a MemoryTable> {
    tables
        .get(name)
        .ok_or_else(|| StoreError::validation(format!("Table '{}' not found", name)))
}

fn check_conditions(conditions: &[Condition], current: Option<&Item>) -> StoreResult<()> {
    if all_match(conditions, current) {
        Ok(())
    } else {
        Err(StoreError::ConditionFailed)
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn put_item(&self, request: PutItemRequest) -> StoreResult<()> {
        self.admit(StoreRequest::Put(request.clone())).await?;
        let mut tables = self.tables.lock().await;
        let table = table_mut(&mut tables, &request.table_name)?;
        let (slot, _) = table.slot_for(&request.table_name, &request.item)?;

        check_conditions(&request.conditions, table.items.get(&slot))?;

        let item: Item = request
            .item
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        table.items.insert(slot, item);
        Ok(())
    }

    async fn update_item(&self, request: UpdateItemRequest) -> StoreResult<()> {
        self.admit(StoreRequest::Update(request.clone())).await?;
        let mut tables = self.tables.lock().await;
        let table = table_mut(&mut tables, &request.table_name)?;
        table.check_key_shape(&request.table_name, &request.key)?;
        let (slot, key) = table.slot_for(&request.table_name, &request.key)?;

        if let Some(name) = request
            .attributes
            .keys()
            .find(|name| table.schema.is_key_attribute(name))
        {
            return Err(StoreError::validation(format!(
                "Cannot update key attribute '{}'",
                name
            )));
        }

        check_conditions(&request.conditions, table.items.get(&slot))?;

        let item = table.items.entry(slot).or_insert_with(|| key.clone());
        for (name, value) in request.attributes {
            if value.is_null() {
                item.remove(&name);
            } else {
                item.insert(name, value);
            }
        }
        Ok(())
    }

    async fn delete_item(&self, request: DeleteItemRequest) -> StoreResult<()> {
        self.admit(StoreRequest::Delete(request.clone())).await?;
        let mut tables = self.tables.lock().await;
        let table = table_mut(&mut tables, &request.table_name)?;
        table.check_key_shape(&request.table_name, &request.key)?;
        let (slot, _) = table.slot_for(&request.table_name, &request.key)?;

        check_conditions(&request.conditions, table.items.get(&slot))?;
        table.items.remove(&slot);
        Ok(())
    }

    async fn get_item(&self, request: GetItemRequest) -> StoreResult<Option<Item>> {
        self.admit(StoreRequest::Get(request.clone())).await?;
        let tables = self.tables.lock().await;
        let table = table_ref(&tables, &request.table_name)?;
        table.check_key_shape(&request.table_name, &request.key)?;
        let (slot, _) = table.slot_for(&request.table_name, &request.key)?;
        Ok(table.items.get(&slot).cloned())
    }

    async fn scan(&self, request: ScanRequest) -> StoreResult<ItemPage> {
        self.admit(StoreRequest::Scan(request.clone())).await?;
        let tables = self.tables.lock().await;
        let table = table_ref(&tables, &request.table_name)?;
        table.page(
            &request.table_name,
            request.exclusive_start_key.as_ref(),
            request.limit,
            |item| all_match(&request.filters, Some(item)),
        )
    }

    async fn query(&self, request: QueryRequest) -> StoreResult<ItemPage> {
        self.admit(StoreRequest::Query(request.clone())).await?;
        if request.key_conditions.is_empty() {
            return Err(StoreError::validation(
                "Query requires at least one key condition",
            ));
        }
        let tables = self.tables.lock().await;
        let table = table_ref(&tables, &request.table_name)?;
        table.page(
            &request.table_name,
            request.exclusive_start_key.as_ref(),
            request.limit,
            |item| {
                all_match(&request.key_conditions, Some(item))
                    && all_match(&request.filters, Some(item))
            },
        )
    }
}
