// Per-entity field storage: raw JSON values plus memoized coerced handles.
use crate::core::entity::LazyEntity;
use crate::core::listing::Listing;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Raw attribute map as returned by the API.
pub type Attributes = Map<String, Value>;

/// A stored attribute: the raw value, or the handle it was coerced into.
#[derive(Clone, Debug)]
pub enum Attr {
    Value(Value),
    Entity(LazyEntity),
    Listing(Rc<Listing<LazyEntity>>),
}

impl Attr {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attr::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Value(Value::Null))
    }

    pub fn into_entity(self) -> Option<LazyEntity> {
        match self {
            Attr::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn into_listing(self) -> Option<Rc<Listing<LazyEntity>>> {
        match self {
            Attr::Listing(listing) => Some(listing),
            _ => None,
        }
    }

    /// Render back to JSON without triggering any fetch.
    pub fn to_json(&self) -> Value {
        match self {
            Attr::Value(value) => value.clone(),
            Attr::Entity(entity) => entity.to_json(),
            Attr::Listing(listing) => listing.to_json(),
        }
    }
}

impl From<Value> for Attr {
    fn from(value: Value) -> Self {
        Attr::Value(value)
    }
}

#[derive(Debug, Default)]
pub(crate) struct AttributeStore {
    values: HashMap<String, Attr>,
}

impl AttributeStore {
    pub(crate) fn from_raw(raw: Attributes) -> Self {
        let mut store = Self::default();
        store.merge(raw);
        store
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Attr> {
        self.values.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, attr: Attr) {
        self.values.insert(name.into(), attr);
    }

    /// Fetched fields replace existing ones wholesale; no deep merge.
    pub(crate) fn merge(&mut self, raw: Attributes) {
        for (name, value) in raw {
            self.values.insert(name, Attr::Value(value));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        let mut out = Map::new();
        for name in names {
            out.insert(name.clone(), self.values[name].to_json());
        }
        Value::Object(out)
    }
}
