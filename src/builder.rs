//! Chainable request assembler over an [`ItemStore`].
//!
//! A builder is scoped to one table and lives for one command. Chain methods
//! accumulate key, conditions, filters and read options; the item verbs turn
//! them into a single store request.

use crate::core::{Item, ItemKey, ModelError, Result, Value};
use crate::store::{
    Condition, DeleteItemRequest, GetItemRequest, ItemPage, ItemStore, Predicate, PutItemRequest,
    QueryRequest, ScanRequest, StoreRequest, UpdateItemRequest,
};
use tracing::{Level, event};

pub struct CommandBuilder<'s> {
    store: &'s dyn ItemStore,
    table_name: String,
    key: Option<ItemKey>,
    conditions: Vec<Condition>,
    filters: Vec<Condition>,
    key_conditions: Vec<Condition>,
    index_name: Option<String>,
    limit: Option<usize>,
    exclusive_start_key: Option<ItemKey>,
    consistent_read: bool,
    dry_run: bool,
    planned: Vec<StoreRequest>,
}

impl<'s> CommandBuilder<'s> {
    pub fn new(store: &'s dyn ItemStore, table_name: impl Into<String>) -> Self {
        Self {
            store,
            table_name: table_name.into(),
            key: None,
            conditions: Vec::new(),
            filters: Vec::new(),
            key_conditions: Vec::new(),
            index_name: None,
            limit: None,
            exclusive_start_key: None,
            consistent_read: false,
            dry_run: false,
            planned: Vec::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Scopes the item verbs to a composite key.
    pub fn key(&mut self, key: ItemKey) -> &mut Self {
        self.key = Some(key);
        self
    }

    pub fn index(&mut self, index_name: impl Into<String>) -> &mut Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Pagination cursor: the `last_evaluated_key` of a previous page.
    pub fn exclusive_start_key(&mut self, key: ItemKey) -> &mut Self {
        self.exclusive_start_key = Some(key);
        self
    }

    pub fn consistent_read(&mut self, enabled: bool) -> &mut Self {
        self.consistent_read = enabled;
        self
    }

    /// When enabled, verbs record their request in [`Self::planned`] instead of sending it.
    pub fn dry_run(&mut self, enabled: bool) -> &mut Self {
        self.dry_run = enabled;
        self
    }

    pub fn condition(&mut self, attribute: impl Into<String>, predicate: Predicate) -> &mut Self {
        self.conditions.push(Condition::new(attribute, predicate));
        self
    }

    pub fn condition_in(&mut self, attribute: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.condition(attribute, Predicate::In(values))
    }

    pub fn condition_between(
        &mut self,
        attribute: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.condition(attribute, Predicate::Between(low.into(), high.into()))
    }

    pub fn filter(&mut self, attribute: impl Into<String>, predicate: Predicate) -> &mut Self {
        self.filters.push(Condition::new(attribute, predicate));
        self
    }

    pub fn filter_in(&mut self, attribute: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.filter(attribute, Predicate::In(values))
    }

    pub fn filter_between(
        &mut self,
        attribute: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.filter(attribute, Predicate::Between(low.into(), high.into()))
    }

    pub fn key_condition(&mut self, attribute: impl Into<String>, predicate: Predicate) -> &mut Self {
        self.key_conditions.push(Condition::new(attribute, predicate));
        self
    }

    pub fn key_condition_in(
        &mut self,
        attribute: impl Into<String>,
        values: Vec<Value>,
    ) -> &mut Self {
        self.key_condition(attribute, Predicate::In(values))
    }

    pub fn key_condition_between(
        &mut self,
        attribute: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.key_condition(attribute, Predicate::Between(low.into(), high.into()))
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Requests recorded while in dry-run mode.
    pub fn planned(&self) -> &[StoreRequest] {
        &self.planned
    }

    fn scoped_key(&self, verb: &str) -> Result<ItemKey> {
        self.key.clone().ok_or_else(|| {
            ModelError::invalid_argument(format!("{} requires a key; call key() first", verb))
        })
    }

    /// Returns `true` when the request was only recorded.
    fn plan(&mut self, request: &StoreRequest) -> bool {
        if self.dry_run {
            event!(
                Level::DEBUG,
                operation = request.operation(),
                table = %self.table_name,
                "dry run, request not sent"
            );
            self.planned.push(request.clone());
        }
        self.dry_run
    }

    pub async fn put_item(&mut self, item: Item) -> Result<()> {
        let request = PutItemRequest {
            table_name: self.table_name.clone(),
            item,
            conditions: self.conditions.clone(),
        };
        if self.plan(&StoreRequest::Put(request.clone())) {
            return Ok(());
        }
        self.store.put_item(request).await?;
        Ok(())
    }

    pub async fn update_item(&mut self, attributes: Item) -> Result<()> {
        let request = UpdateItemRequest {
            table_name: self.table_name.clone(),
            key: self.scoped_key("update_item")?,
            attributes,
            conditions: self.conditions.clone(),
        };
        if self.plan(&StoreRequest::Update(request.clone())) {
            return Ok(());
        }
        self.store.update_item(request).await?;
        Ok(())
    }

    pub async fn delete_item(&mut self) -> Result<()> {
        let request = DeleteItemRequest {
            table_name: self.table_name.clone(),
            key: self.scoped_key("delete_item")?,
            conditions: self.conditions.clone(),
        };
        if self.plan(&StoreRequest::Delete(request.clone())) {
            return Ok(());
        }
        self.store.delete_item(request).await?;
        Ok(())
    }

    pub async fn get_item(&mut self) -> Result<Option<Item>> {
        let request = GetItemRequest {
            table_name: self.table_name.clone(),
            key: self.scoped_key("get_item")?,
            consistent_read: self.consistent_read,
        };
        if self.plan(&StoreRequest::Get(request.clone())) {
            return Ok(None);
        }
        Ok(self.store.get_item(request).await?)
    }

    /// Reads one page. Runs as a query when key conditions are present,
    /// otherwise as a full scan.
    pub async fn scan(&mut self) -> Result<ItemPage> {
        let request = if self.key_conditions.is_empty() {
            StoreRequest::Scan(ScanRequest {
                table_name: self.table_name.clone(),
                index_name: self.index_name.clone(),
                filters: self.filters.clone(),
                limit: self.limit,
                exclusive_start_key: self.exclusive_start_key.clone(),
                consistent_read: self.consistent_read,
            })
        } else {
            StoreRequest::Query(QueryRequest {
                table_name: self.table_name.clone(),
                index_name: self.index_name.clone(),
                key_conditions: self.key_conditions.clone(),
                filters: self.filters.clone(),
                limit: self.limit,
                exclusive_start_key: self.exclusive_start_key.clone(),
                consistent_read: self.consistent_read,
            })
        };
        if self.plan(&request) {
            return Ok(ItemPage::default());
        }

        let page = match request {
            StoreRequest::Query(query) => self.store.query(query).await?,
            StoreRequest::Scan(scan) => self.store.scan(scan).await?,
            _ => ItemPage::default(),
        };
        Ok(page)
    }
}
