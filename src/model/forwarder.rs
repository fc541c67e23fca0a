//! Entity-level access to an allow-listed subset of builder verbs.
//!
//! Entities reach the builder only through [`EntityCommands`]: either the
//! typed methods below or [`EntityCommands::invoke`] for callers that
//! dispatch by name. Names outside [`FORWARDED_METHODS`] are rejected with
//! [`ModelError::UnknownMethod`] before the builder is touched.

use crate::builder::CommandBuilder;
use crate::core::{Item, ItemKey, ModelError, Result, Value};
use crate::store::{ItemPage, Predicate, StoreRequest};
use tracing::{Level, event};

/// Builder verbs reachable from an entity.
pub const FORWARDED_METHODS: [&str; 19] = [
    "index",
    "key",
    "exclusive_start_key",
    "consistent_read",
    "dry_run",
    "get_item",
    "put_item",
    "update_item",
    "delete_item",
    "scan",
    "filter",
    "filter_in",
    "filter_between",
    "condition",
    "condition_in",
    "condition_between",
    "key_condition",
    "key_condition_in",
    "key_condition_between",
];

/// Shape of one forwarded verb as accepted by [`EntityCommands::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: &'static str,
    /// Minimum number of arguments.
    pub arg_count: usize,
    /// Accepts further arguments beyond `arg_count`.
    pub variadic: bool,
    pub writes: bool,
}

fn describe(name: &'static str) -> MethodDescriptor {
    let (arg_count, variadic, writes) = match name {
        "index" => (1, false, false),
        "key" | "exclusive_start_key" => (2, true, false),
        "consistent_read" | "dry_run" => (0, true, false),
        "get_item" | "scan" => (0, false, false),
        "put_item" | "update_item" => (2, true, true),
        "delete_item" => (0, false, true),
        "filter" | "condition" | "key_condition" => (2, true, false),
        "filter_in" | "condition_in" | "key_condition_in" => (2, true, false),
        "filter_between" | "condition_between" | "key_condition_between" => (3, false, false),
        _ => (0, false, false),
    };
    MethodDescriptor {
        name,
        arg_count,
        variadic,
        writes,
    }
}

/// Outcome of a dynamically invoked verb.
#[derive(Debug, Clone, PartialEq)]
pub enum Forwarded {
    /// A chain method updated the pending command.
    Chained,
    /// A write verb completed.
    Done,
    Item(Option<Item>),
    Page(ItemPage),
}

/// Capability-restricted handle over a table-scoped [`CommandBuilder`].
pub struct EntityCommands<'s> {
    builder: CommandBuilder<'s>,
}

impl<'s> EntityCommands<'s> {
    pub(crate) fn new(builder: CommandBuilder<'s>) -> Self {
        Self { builder }
    }

    pub fn supports_method(method: &str) -> bool {
        FORWARDED_METHODS.contains(&method)
    }

    pub fn available_methods() -> Vec<MethodDescriptor> {
        FORWARDED_METHODS.iter().copied().map(describe).collect()
    }

    /// Requests recorded while `dry_run` is enabled.
    pub fn planned(&self) -> &[StoreRequest] {
        self.builder.planned()
    }

    pub fn index(&mut self, index_name: impl Into<String>) -> &mut Self {
        self.builder.index(index_name);
        self
    }

    pub fn key(&mut self, key: ItemKey) -> &mut Self {
        self.builder.key(key);
        self
    }

    pub fn exclusive_start_key(&mut self, key: ItemKey) -> &mut Self {
        self.builder.exclusive_start_key(key);
        self
    }

    pub fn consistent_read(&mut self, enabled: bool) -> &mut Self {
        self.builder.consistent_read(enabled);
        self
    }

    pub fn dry_run(&mut self, enabled: bool) -> &mut Self {
        self.builder.dry_run(enabled);
        self
    }

    pub fn filter(&mut self, attribute: impl Into<String>, predicate: Predicate) -> &mut Self {
        self.builder.filter(attribute, predicate);
        self
    }

    pub fn filter_in(&mut self, attribute: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.builder.filter_in(attribute, values);
        self
    }

    pub fn filter_between(
        &mut self,
        attribute: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.builder.filter_between(attribute, low, high);
        self
    }

    pub fn condition(&mut self, attribute: impl Into<String>, predicate: Predicate) -> &mut Self {
        self.builder.condition(attribute, predicate);
        self
    }

    pub fn condition_in(&mut self, attribute: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.builder.condition_in(attribute, values);
        self
    }

    pub fn condition_between(
        &mut self,
        attribute: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.builder.condition_between(attribute, low, high);
        self
    }

    pub fn key_condition(&mut self, attribute: impl Into<String>, predicate: Predicate) -> &mut Self {
        self.builder.key_condition(attribute, predicate);
        self
    }

    pub fn key_condition_in(
        &mut self,
        attribute: impl Into<String>,
        values: Vec<Value>,
    ) -> &mut Self {
        self.builder.key_condition_in(attribute, values);
        self
    }

    pub fn key_condition_between(
        &mut self,
        attribute: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> &mut Self {
        self.builder.key_condition_between(attribute, low, high);
        self
    }

    pub async fn get_item(&mut self) -> Result<Option<Item>> {
        self.builder.get_item().await
    }

    pub async fn put_item(&mut self, item: Item) -> Result<()> {
        self.builder.put_item(item).await
    }

    pub async fn update_item(&mut self, attributes: Item) -> Result<()> {
        self.builder.update_item(attributes).await
    }

    pub async fn delete_item(&mut self) -> Result<()> {
        self.builder.delete_item().await
    }

    pub async fn scan(&mut self) -> Result<ItemPage> {
        self.builder.scan().await
    }

    /// Dispatches an allow-listed verb by name.
    ///
    /// Argument conventions: maps are passed as alternating name/value
    /// pairs; comparisons as `attribute, operator[, operand]`; `_in` verbs
    /// as `attribute, values...`; `_between` verbs as `attribute, low, high`.
    pub async fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Forwarded> {
        if !Self::supports_method(method) {
            event!(Level::WARN, method, "rejected non-forwarded method");
            return Err(ModelError::UnknownMethod(method.to_string()));
        }
        check_arity(method, &args)?;

        let mut args = args.into_iter();
        match method {
            "index" => {
                let name = text_arg(method, args.next())?;
                self.index(name);
            }
            "key" => {
                self.key(pairs(method, args)?);
            }
            "exclusive_start_key" => {
                self.exclusive_start_key(pairs(method, args)?);
            }
            "consistent_read" => {
                let enabled = flag_arg(method, args.next())?;
                self.consistent_read(enabled);
            }
            "dry_run" => {
                let enabled = flag_arg(method, args.next())?;
                self.dry_run(enabled);
            }
            "get_item" => return Ok(Forwarded::Item(self.get_item().await?)),
            "put_item" => {
                self.put_item(pairs(method, args)?).await?;
                return Ok(Forwarded::Done);
            }
            "update_item" => {
                self.update_item(pairs(method, args)?).await?;
                return Ok(Forwarded::Done);
            }
            "delete_item" => {
                self.delete_item().await?;
                return Ok(Forwarded::Done);
            }
            "scan" => return Ok(Forwarded::Page(self.scan().await?)),
            "filter" | "condition" | "key_condition" => {
                let attribute = text_arg(method, args.next())?;
                let operator = text_arg(method, args.next())?;
                let predicate = Predicate::parse(&operator, args.next())?;
                match method {
                    "filter" => self.filter(attribute, predicate),
                    "condition" => self.condition(attribute, predicate),
                    _ => self.key_condition(attribute, predicate),
                };
            }
            "filter_in" | "condition_in" | "key_condition_in" => {
                let attribute = text_arg(method, args.next())?;
                let values: Vec<Value> = args.collect();
                match method {
                    "filter_in" => self.filter_in(attribute, values),
                    "condition_in" => self.condition_in(attribute, values),
                    _ => self.key_condition_in(attribute, values),
                };
            }
            "filter_between" | "condition_between" | "key_condition_between" => {
                let attribute = text_arg(method, args.next())?;
                let low = args.next().unwrap_or(Value::Null);
                let high = args.next().unwrap_or(Value::Null);
                match method {
                    "filter_between" => self.filter_between(attribute, low, high),
                    "condition_between" => self.condition_between(attribute, low, high),
                    _ => self.key_condition_between(attribute, low, high),
                };
            }
            other => return Err(ModelError::UnknownMethod(other.to_string())),
        }
        Ok(Forwarded::Chained)
    }
}

fn check_arity(method: &str, args: &[Value]) -> Result<()> {
    let Some(descriptor) = FORWARDED_METHODS
        .iter()
        .copied()
        .find(|name| *name == method)
        .map(describe)
    else {
        return Err(ModelError::UnknownMethod(method.to_string()));
    };

    let too_few = args.len() < descriptor.arg_count;
    let too_many = !descriptor.variadic && args.len() > descriptor.arg_count;
    if too_few || too_many {
        return Err(ModelError::invalid_argument(format!(
            "{} expects {}{} argument(s), got {}",
            method,
            if descriptor.variadic { "at least " } else { "" },
            descriptor.arg_count,
            args.len()
        )));
    }
    Ok(())
}

fn text_arg(method: &str, arg: Option<Value>) -> Result<String> {
    match arg {
        Some(Value::Text(text)) => Ok(text),
        Some(other) => Err(ModelError::invalid_argument(format!(
            "{} expects TEXT, got {}",
            method,
            other.type_name()
        ))),
        None => Err(ModelError::invalid_argument(format!(
            "{} is missing an argument",
            method
        ))),
    }
}

/// Optional boolean flag; no argument means `true`.
fn flag_arg(method: &str, arg: Option<Value>) -> Result<bool> {
    match arg {
        None => Ok(true),
        Some(Value::Boolean(flag)) => Ok(flag),
        Some(other) => Err(ModelError::invalid_argument(format!(
            "{} expects BOOLEAN, got {}",
            method,
            other.type_name()
        ))),
    }
}

fn pairs(method: &str, args: impl Iterator<Item = Value>) -> Result<Item> {
    let args: Vec<Value> = args.collect();
    if args.len() % 2 != 0 {
        return Err(ModelError::invalid_argument(format!(
            "{} expects name/value pairs",
            method
        )));
    }

    let mut map = Item::new();
    let mut iter = args.into_iter();
    while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
        map.insert(text_arg(method, Some(name))?, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_described() {
        let methods = EntityCommands::available_methods();
        assert_eq!(methods.len(), FORWARDED_METHODS.len());
        let put = methods.iter().find(|m| m.name == "put_item").unwrap();
        assert!(put.writes);
        assert!(EntityCommands::supports_method("key_condition_between"));
        assert!(!EntityCommands::supports_method("batch_write"));
        assert!(!EntityCommands::supports_method("query"));
    }

    #[test]
    fn arity_is_checked() {
        assert!(check_arity("index", &[]).is_err());
        assert!(check_arity("index", &[Value::from("gsi")]).is_ok());
        assert!(check_arity("condition_between", &[Value::from("a"), Value::from(1)]).is_err());
        assert!(check_arity("scan", &[Value::Null]).is_err());
    }

    #[test]
    fn pairs_decode_into_map() {
        let map = pairs(
            "key",
            vec![Value::from("id"), Value::from("a1"), Value::from("rev"), Value::from(2)]
                .into_iter(),
        )
        .unwrap();
        assert_eq!(map.get("rev"), Some(&Value::from(2)));
        assert!(pairs("key", vec![Value::from("id")].into_iter()).is_err());
        assert!(pairs("key", vec![Value::from(1), Value::from(2)].into_iter()).is_err());
    }
}
