use crate::core::{Item, Value};
use std::collections::BTreeSet;

/// Attribute bag with dirty tracking against the last sync point.
///
/// An attribute is dirty when its current value differs from the value
/// recorded at the last sync point, or when it exists on only one side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeState {
    current: Item,
    synced: Item,
}

impl AttributeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose sync point equals `item`, as after a store read.
    pub fn synced_from(item: Item) -> Self {
        Self {
            current: item.clone(),
            synced: item,
        }
    }

    /// Sets a value on both sides of the sync point; it starts clean.
    pub(crate) fn seed(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.synced.insert(name.clone(), value.clone());
        self.current.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.current.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.current.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.current.insert(name.into(), value.into());
    }

    pub fn fill<I, K, V>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in attributes {
            self.set(name, value);
        }
    }

    /// Removes an attribute, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.current.remove(name)
    }

    /// Value recorded at the last sync point.
    pub fn original(&self, name: &str) -> Option<&Value> {
        self.synced.get(name)
    }

    pub fn is_attribute_dirty(&self, name: &str) -> bool {
        self.current.get(name) != self.synced.get(name)
    }

    pub fn is_dirty(&self) -> bool {
        self.current != self.synced
    }

    pub fn dirty_names(&self) -> BTreeSet<String> {
        self.current
            .keys()
            .chain(self.synced.keys())
            .filter(|name| self.is_attribute_dirty(name))
            .cloned()
            .collect()
    }

    /// Dirty attributes with their current values; removed ones map to `Null`.
    pub fn dirty_attributes(&self) -> Item {
        self.dirty_names()
            .into_iter()
            .map(|name| {
                let value = self.current.get(&name).cloned().unwrap_or(Value::Null);
                (name, value)
            })
            .collect()
    }

    pub fn all_attributes(&self) -> Item {
        self.current.clone()
    }

    pub fn attributes(&self) -> &Item {
        &self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Moves the sync point to the current values.
    pub fn mark_synced(&mut self) {
        self.synced = self.current.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_marks_changed_attributes_only() {
        let mut state = AttributeState::synced_from(Item::from([
            ("id".to_string(), Value::from("a1")),
            ("name".to_string(), Value::from("x")),
        ]));
        assert!(!state.is_dirty());

        state.set("name", "x");
        assert!(state.dirty_names().is_empty());

        state.set("name", "y");
        state.set("age", 3);
        assert_eq!(
            state.dirty_names().into_iter().collect::<Vec<_>>(),
            vec!["age".to_string(), "name".to_string()]
        );
        assert_eq!(state.original("name"), Some(&Value::from("x")));
    }

    #[test]
    fn reverting_to_synced_value_cleans_attribute() {
        let mut state =
            AttributeState::synced_from(Item::from([("name".to_string(), Value::from("x"))]));
        state.set("name", "y");
        state.set("name", "x");
        assert!(!state.is_attribute_dirty("name"));
        assert!(state.dirty_attributes().is_empty());
    }

    #[test]
    fn unset_reports_null_in_dirty_attributes() {
        let mut state =
            AttributeState::synced_from(Item::from([("nick".to_string(), Value::from("z"))]));
        assert_eq!(state.unset("nick"), Some(Value::from("z")));
        assert_eq!(
            state.dirty_attributes(),
            Item::from([("nick".to_string(), Value::Null)])
        );
    }

    #[test]
    fn tiny_and_large_numeric_changes_are_dirty() {
        let big = 1i64 << 53;
        let mut state = AttributeState::synced_from(Item::from([
            ("rate".to_string(), Value::Float(1e-20)),
            ("count".to_string(), Value::Integer(big + 1)),
        ]));

        state.set("rate", 5e-17);
        state.set("count", big as f64);
        assert_eq!(
            state.dirty_names().into_iter().collect::<Vec<_>>(),
            vec!["count".to_string(), "rate".to_string()]
        );
        assert!(state.is_dirty());
    }

    #[test]
    fn mark_synced_clears_dirty_set() {
        let mut state = AttributeState::new();
        state.fill([("id", "a1"), ("name", "x")]);
        assert_eq!(state.dirty_attributes().len(), 2);

        state.mark_synced();
        assert!(state.dirty_attributes().is_empty());
        assert_eq!(state.all_attributes().len(), 2);
    }

    #[test]
    fn seeded_values_start_clean() {
        let mut state = AttributeState::new();
        state.seed("rev", Value::from("v0"));
        state.set("id", "a1");
        assert!(!state.is_attribute_dirty("rev"));
        assert!(state.is_attribute_dirty("id"));
        assert_eq!(state.get("rev"), Some(&Value::from("v0")));
    }
}
