//! Purpose: Declare which fields of an entity type wrap into nested handles.
//! Exports: `Coercion`, `CoercionRegistry`, `coerce`.
//! Role: Static per-kind table consulted by `LazyEntity::get_attribute` at read time.
//! Invariants: Raw values are only wrapped when read; nothing is wrapped at fetch time.
//! Invariants: A null entity field stays null; a null listing field reads as an empty listing.
#![allow(clippy::result_large_err)]

use crate::core::attributes::Attr;
use crate::core::client::{ApiResult, Client};
use crate::core::entity::EntityKind;
use crate::core::error::{Error, ErrorKind};
use crate::core::listing::{Listing, RawPage};
use serde_json::Value;
use std::rc::Rc;

#[derive(Clone, Copy, Debug)]
pub enum Coercion {
    Entity(&'static EntityKind),
    Listing(&'static EntityKind),
}

#[derive(Clone, Copy, Debug)]
pub struct CoercionRegistry {
    entries: &'static [(&'static str, Coercion)],
}

impl CoercionRegistry {
    pub const fn new(entries: &'static [(&'static str, Coercion)]) -> Self {
        Self { entries }
    }

    pub const fn empty() -> Self {
        Self { entries: &[] }
    }

    pub fn lookup(&self, field: &str) -> Option<Coercion> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, coercion)| *coercion)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(name, _)| *name)
    }
}

/// Wrap `raw` according to `kind`'s registry entry for `field`.
pub fn coerce(kind: &EntityKind, field: &str, raw: Value, client: &Client) -> ApiResult<Attr> {
    match kind.coercions.lookup(field) {
        None => Ok(Attr::Value(raw)),
        Some(Coercion::Entity(target)) => coerce_entity(kind, field, target, raw, client),
        Some(Coercion::Listing(target)) => coerce_listing(kind, field, target, raw, client),
    }
}

fn coerce_entity(
    owner: &EntityKind,
    field: &str,
    target: &'static EntityKind,
    raw: Value,
    client: &Client,
) -> ApiResult<Attr> {
    match raw {
        Value::Null => Ok(Attr::Value(Value::Null)),
        Value::Object(attributes) => Ok(Attr::Entity(target.build(client, attributes))),
        Value::String(id) => match target.from_id {
            Some(from_id) => Ok(Attr::Entity(from_id(client, &id))),
            None => Err(uncoercible(owner, field, target)),
        },
        _ => Err(uncoercible(owner, field, target)),
    }
}

fn coerce_listing(
    owner: &EntityKind,
    field: &str,
    target: &'static EntityKind,
    raw: Value,
    client: &Client,
) -> ApiResult<Attr> {
    let page = match raw {
        Value::Null => RawPage::default(),
        Value::String(text) if text.is_empty() => RawPage::default(),
        Value::Object(_) => RawPage::from_envelope(&raw)
            .map_err(|err| err.with_entity(owner.name).with_field(field))?,
        _ => return Err(uncoercible(owner, field, target)),
    };
    let mut items = Vec::with_capacity(page.children.len());
    for child in page.children {
        let item = if child.get("kind").is_some() {
            client.unmarshal(child)?
        } else {
            match child {
                Value::Object(attributes) => target.build(client, attributes),
                _ => return Err(uncoercible(owner, field, target)),
            }
        };
        items.push(item);
    }
    Ok(Attr::Listing(Rc::new(Listing::new(
        items,
        page.before,
        page.after,
    ))))
}

fn uncoercible(owner: &EntityKind, field: &str, target: &EntityKind) -> Error {
    Error::new(ErrorKind::Decode)
        .with_message(format!("value cannot be wrapped as {}", target.name))
        .with_entity(owner.name)
        .with_field(field)
}
