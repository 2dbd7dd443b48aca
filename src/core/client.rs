//! Purpose: Define the transport boundary and the client context shared by entities.
//! Exports: `Transport`, `Response`, `Params`, `Client`.
//! Role: Every deferred fetch and page request goes through `Client`.
//! Invariants: The core never inspects auth or rate-limit headers; transports map
//! Invariants: HTTP failures onto `ErrorKind` before returning.
#![allow(clippy::result_large_err)]

use crate::core::entity::{Attributes, EntityKind, LazyEntity};
use crate::core::error::{Error, ErrorKind};
use crate::core::listing::{Cursor, ListItem, Listing, RawPage};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type ApiResult<T> = Result<T, Error>;

/// Request parameters: query string for GET, form body for POST.
pub type Params = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub trait Transport {
    fn get(&self, path: &str, params: &Params) -> ApiResult<Response>;
    fn post(&self, path: &str, params: &Params) -> ApiResult<Response>;
}

#[derive(Clone)]
pub struct Client {
    transport: Rc<dyn Transport>,
    kinds: &'static [&'static EntityKind],
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.kinds.iter().map(|kind| kind.name).collect();
        f.debug_struct("Client").field("kinds", &kinds).finish()
    }
}

impl Client {
    /// Build a client that unmarshals tagged things using `kinds`.
    pub fn with_kinds(
        transport: impl Transport + 'static,
        kinds: &'static [&'static EntityKind],
    ) -> Self {
        Self {
            transport: Rc::new(transport),
            kinds,
        }
    }

    pub fn get(&self, path: &str, params: &Params) -> ApiResult<Response> {
        self.transport.get(path, params)
    }

    pub fn post(&self, path: &str, params: &Params) -> ApiResult<Response> {
        self.transport.post(path, params)
    }

    pub fn kind_for_tag(&self, tag: &str) -> Option<&'static EntityKind> {
        self.kinds
            .iter()
            .copied()
            .find(|kind| kind.tag == Some(tag))
    }

    /// Turn a `{kind, data}` thing into an entity of the registered kind.
    ///
    /// Unknown kinds become attribute-only `Basic` entities.
    pub fn unmarshal(&self, thing: Value) -> ApiResult<LazyEntity> {
        let Value::Object(mut thing) = thing else {
            return Err(Error::new(ErrorKind::Decode).with_message("thing must be an object"));
        };
        let tag = match thing.remove("kind") {
            Some(Value::String(tag)) => tag,
            _ => return Err(Error::new(ErrorKind::Decode).with_message("thing is missing `kind`")),
        };
        if tag == "Listing" {
            return Err(Error::new(ErrorKind::Decode)
                .with_message("expected a single thing, found a listing"));
        }
        let data = match thing.remove("data") {
            Some(Value::Object(data)) => data,
            _ => {
                return Err(Error::new(ErrorKind::Decode)
                    .with_message(format!("thing `{tag}` is missing `data`")));
            }
        };
        match self.kind_for_tag(&tag) {
            Some(kind) => Ok(kind.build(self, data)),
            None => Ok(LazyEntity::record(self, &tag, data)),
        }
    }

    /// Request the first page of a standard listing endpoint.
    pub fn listing<T>(&self, path: &str, params: Params) -> ApiResult<Listing<T>>
    where
        T: ListItem,
    {
        let client = self.clone();
        let path = path.to_string();
        Listing::request(self, move |cursor: &Cursor| {
            let mut params = params.clone();
            cursor.apply(&mut params);
            let response = client.get(&path, &params)?;
            RawPage::from_envelope(&response.body).map_err(|err| err.with_path(path.clone()))
        })
    }

    /// GET `path` and return the `data` object of its envelope.
    pub fn get_data(&self, path: &str, params: &Params) -> ApiResult<Attributes> {
        let response = self.get(path, params)?;
        match response.body {
            Value::Object(mut body) => match body.remove("data") {
                Some(Value::Object(data)) => Ok(data),
                _ => Err(Error::new(ErrorKind::Decode)
                    .with_message("response is missing a `data` object")
                    .with_path(path)),
            },
            _ => Err(Error::new(ErrorKind::Decode)
                .with_message("response body is not an object")
                .with_path(path)),
        }
    }
}
