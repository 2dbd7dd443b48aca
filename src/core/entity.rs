//! Purpose: Lazily-resolved handles for remote things.
//! Exports: `EntityKind`, `LazyEntity`, `FetchThunk`, `BASIC`.
//! Role: Shared resolution engine behind every typed model handle.
//! Invariants: Construction never performs I/O; the deferred fetch runs at most once.
//! Invariants: After resolution an absent field is `UnknownAttribute`, never a re-fetch.
//! Invariants: Reads issued while the entity's own fetch is running fail with `Reentrant`.
#![allow(clippy::result_large_err)]

pub use crate::core::attributes::{Attr, Attributes};

use crate::core::attributes::AttributeStore;
use crate::core::client::{ApiResult, Client};
use crate::core::coerce::{CoercionRegistry, coerce};
use crate::core::error::{Error, ErrorKind};
use crate::core::fullname::Fullname;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Deferred fetch returning a fresh raw attribute map.
pub type FetchThunk = Box<dyn FnOnce(&Client) -> ApiResult<Attributes>>;

/// Static description of one entity type.
pub struct EntityKind {
    pub name: &'static str,
    /// Fullname tag (`t1`, `t3`, ...), if the type has one.
    pub tag: Option<&'static str>,
    pub coercions: CoercionRegistry,
    /// Build from a (possibly partial) attribute map, attaching a fetch when possible.
    pub from_attributes: fn(&Client, Attributes) -> LazyEntity,
    /// Build a stub from a bare identifier string.
    pub from_id: Option<fn(&Client, &str) -> LazyEntity>,
}

impl EntityKind {
    pub fn build(&self, client: &Client, attributes: Attributes) -> LazyEntity {
        (self.from_attributes)(client, attributes)
    }
}

// Coercion tables can be self-referential, so only the identity is printed.
impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityKind")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Attribute-only things (mod actions, `more` stubs, unknown kinds).
pub static BASIC: EntityKind = EntityKind {
    name: "Basic",
    tag: None,
    coercions: CoercionRegistry::empty(),
    from_attributes: basic_from_attributes,
    from_id: None,
};

fn basic_from_attributes(client: &Client, attributes: Attributes) -> LazyEntity {
    LazyEntity::complete(&BASIC, client, attributes)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Resolution {
    Pending,
    Resolving,
    Resolved,
    Failed,
}

struct EntityState {
    store: AttributeStore,
    fetch: Option<FetchThunk>,
    resolution: Resolution,
}

struct EntityInner {
    kind: &'static EntityKind,
    /// Wire `kind` tag of a `Basic` record (`more`, `modaction`, ...).
    thing_kind: Option<String>,
    client: Client,
    state: RefCell<EntityState>,
}

/// Cheaply cloneable handle; clones share one attribute map and one fetch.
#[derive(Clone)]
pub struct LazyEntity {
    inner: Rc<EntityInner>,
}

impl fmt::Debug for LazyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.try_borrow();
        let mut out = f.debug_struct("LazyEntity");
        out.field("kind", &self.inner.kind.name);
        if let Ok(state) = state {
            out.field("resolution", &state.resolution)
                .field("attributes", &state.store.len());
        }
        out.finish()
    }
}

impl LazyEntity {
    pub fn new(
        kind: &'static EntityKind,
        client: &Client,
        attributes: Attributes,
        fetch: Option<FetchThunk>,
    ) -> Self {
        let resolution = if fetch.is_some() {
            Resolution::Pending
        } else {
            Resolution::Resolved
        };
        Self {
            inner: Rc::new(EntityInner {
                kind,
                thing_kind: None,
                client: client.clone(),
                state: RefCell::new(EntityState {
                    store: AttributeStore::from_raw(attributes),
                    fetch,
                    resolution,
                }),
            }),
        }
    }

    /// An entity whose attributes are already complete.
    pub fn complete(kind: &'static EntityKind, client: &Client, attributes: Attributes) -> Self {
        Self::new(kind, client, attributes, None)
    }

    /// A `Basic` record that remembers the wire tag it was decoded from.
    pub fn record(client: &Client, thing_kind: &str, attributes: Attributes) -> Self {
        let mut entity = Self::complete(&BASIC, client, attributes);
        if let Some(inner) = Rc::get_mut(&mut entity.inner) {
            inner.thing_kind = Some(thing_kind.to_string());
        }
        entity
    }

    /// An entity that fetches its remaining attributes on first missing read.
    pub fn deferred<F>(
        kind: &'static EntityKind,
        client: &Client,
        attributes: Attributes,
        fetch: F,
    ) -> Self
    where
        F: FnOnce(&Client) -> ApiResult<Attributes> + 'static,
    {
        Self::new(kind, client, attributes, Some(Box::new(fetch)))
    }

    pub fn kind(&self) -> &'static EntityKind {
        self.inner.kind
    }

    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// The `kind` tag this entity carries on the wire.
    pub fn thing_kind(&self) -> &str {
        self.inner
            .thing_kind
            .as_deref()
            .or(self.inner.kind.tag)
            .unwrap_or(self.inner.kind.name)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self.inner.state.borrow().resolution,
            Resolution::Resolved | Resolution::Failed
        )
    }

    pub fn ptr_eq(&self, other: &LazyEntity) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// True when `name` is present now; never fetches.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.inner.state.borrow().store.contains(name)
    }

    pub fn get_attribute(&self, name: &str) -> ApiResult<Attr> {
        if let Some(attr) = self.lookup(name)? {
            return Ok(attr);
        }
        if self.resolve_once()? {
            if let Some(attr) = self.lookup(name)? {
                return Ok(attr);
            }
        }
        Err(self.unknown_attribute(name))
    }

    /// Run the deferred fetch now if it has not run yet.
    pub fn resolve(&self) -> ApiResult<()> {
        self.resolve_once().map(|_| ())
    }

    /// Read a string attribute.
    pub fn get_str(&self, name: &str) -> ApiResult<String> {
        match self.get_attribute(name)? {
            Attr::Value(Value::String(value)) => Ok(value),
            _ => Err(Error::new(ErrorKind::Decode)
                .with_message("attribute is not a string")
                .with_entity(self.inner.kind.name)
                .with_field(name)),
        }
    }

    pub fn fullname(&self) -> ApiResult<Fullname> {
        let Some(tag) = self.inner.kind.tag else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("entity type has no fullname tag")
                .with_entity(self.inner.kind.name));
        };
        Ok(Fullname::new(tag, self.get_str("id")?))
    }

    /// Snapshot of the currently known attributes; never fetches.
    pub fn to_json(&self) -> Value {
        match self.inner.state.try_borrow() {
            Ok(state) => state.store.to_json(),
            Err(_) => Value::Object(Map::new()),
        }
    }

    fn lookup(&self, name: &str) -> ApiResult<Option<Attr>> {
        let attr = {
            let state = self.inner.state.borrow();
            if state.resolution == Resolution::Resolving {
                return Err(self.reentrant(name));
            }
            match state.store.get(name) {
                Some(attr) => attr.clone(),
                None => return Ok(None),
            }
        };
        let Attr::Value(raw) = attr else {
            return Ok(Some(attr));
        };
        if self.inner.kind.coercions.lookup(name).is_none() {
            return Ok(Some(Attr::Value(raw)));
        }
        let coerced = coerce(self.inner.kind, name, raw, &self.inner.client)?;
        if !coerced.is_null() {
            self.inner
                .state
                .borrow_mut()
                .store
                .insert(name, coerced.clone());
        }
        Ok(Some(coerced))
    }

    /// Returns true when this call ran the fetch and merged its result.
    fn resolve_once(&self) -> ApiResult<bool> {
        let fetch = {
            let mut state = self.inner.state.borrow_mut();
            match state.resolution {
                Resolution::Resolving => return Err(self.reentrant("<resolve>")),
                Resolution::Resolved | Resolution::Failed => return Ok(false),
                Resolution::Pending => {}
            }
            match state.fetch.take() {
                Some(fetch) => {
                    state.resolution = Resolution::Resolving;
                    fetch
                }
                None => {
                    state.resolution = Resolution::Resolved;
                    return Ok(false);
                }
            }
        };

        debug!(entity = self.inner.kind.name, "resolving deferred attributes");
        let result = fetch(&self.inner.client);
        let mut state = self.inner.state.borrow_mut();
        match result {
            Ok(attributes) => {
                state.store.merge(attributes);
                state.resolution = Resolution::Resolved;
                Ok(true)
            }
            Err(err) => {
                warn!(entity = self.inner.kind.name, error = %err, "deferred fetch failed");
                state.resolution = Resolution::Failed;
                Err(err)
            }
        }
    }

    fn unknown_attribute(&self, name: &str) -> Error {
        let failed = self.inner.state.borrow().resolution == Resolution::Failed;
        let message = if failed {
            "attribute unavailable; the deferred fetch failed"
        } else {
            "no such attribute"
        };
        Error::new(ErrorKind::UnknownAttribute)
            .with_message(message)
            .with_entity(self.inner.kind.name)
            .with_field(name)
    }

    fn reentrant(&self, name: &str) -> Error {
        Error::new(ErrorKind::Reentrant)
            .with_message("attribute read while the entity's own fetch is running")
            .with_entity(self.inner.kind.name)
            .with_field(name)
    }
}
