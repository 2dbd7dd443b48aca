//! Purpose: One page of a cursor-paginated result set and forward/backward paging.
//! Exports: `Cursor`, `RawPage`, `ListItem`, `Listing`, `Pages`, `ListingItems`.
//! Role: Endpoint-agnostic; a caller-supplied page fetch knows the endpoint.
//! Invariants: A `Listing` is immutable; paging builds a new one from a fresh request.
//! Invariants: Paging past a null cursor fails with `NoMorePages` and issues no request.
//! Invariants: Multi-page iteration is lazy: one request per page actually consumed.
#![allow(clippy::result_large_err)]

use crate::core::client::{ApiResult, Client, Params};
use crate::core::entity::{Attributes, LazyEntity};
use crate::core::error::{Error, ErrorKind};
use serde_json::{Map, Value, json};
use std::fmt;
use std::rc::Rc;

/// Which page to request relative to the listing edges.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Cursor {
    Start,
    After(String),
    Before(String),
}

impl Cursor {
    pub fn apply(&self, params: &mut Params) {
        match self {
            Cursor::Start => {}
            Cursor::After(token) => {
                params.remove("before");
                params.insert("after".to_string(), token.clone());
            }
            Cursor::Before(token) => {
                params.remove("after");
                params.insert("before".to_string(), token.clone());
            }
        }
    }
}

/// Unparsed page: raw children plus the two edge cursors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPage {
    pub children: Vec<Value>,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl RawPage {
    /// Parse `{data: {children, before, after}}` (the `kind: Listing` wrapper is optional).
    pub fn from_envelope(body: &Value) -> ApiResult<Self> {
        let data = body.get("data").unwrap_or(body);
        let children = match data.get("children") {
            Some(Value::Array(children)) => children.clone(),
            _ => {
                return Err(
                    Error::new(ErrorKind::Decode).with_message("listing is missing `children`")
                );
            }
        };
        Ok(Self {
            children,
            before: cursor_token(data.get("before"))?,
            after: cursor_token(data.get("after"))?,
        })
    }
}

fn cursor_token(value: Option<&Value>) -> ApiResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(token)) if token.is_empty() => Ok(None),
        Some(Value::String(token)) => Ok(Some(token.clone())),
        Some(_) => Err(Error::new(ErrorKind::Decode).with_message("cursor must be a string")),
    }
}

/// First child's `data` of a single-item listing envelope.
pub fn first_child_data(body: &Value) -> ApiResult<Attributes> {
    let page = RawPage::from_envelope(body)?;
    match page.children.into_iter().next() {
        Some(Value::Object(mut child)) => match child.remove("data") {
            Some(Value::Object(data)) => Ok(data),
            _ => Err(Error::new(ErrorKind::Decode).with_message("listing child is missing `data`")),
        },
        Some(_) => Err(Error::new(ErrorKind::Decode).with_message("listing child is not an object")),
        None => Err(Error::new(ErrorKind::NotFound).with_message("listing has no children")),
    }
}

/// Something a listing page can contain.
pub trait ListItem: Sized {
    fn from_child(client: &Client, child: Value) -> ApiResult<Self>;

    /// Identity used for duplicate suppression in streams.
    fn stream_key(&self) -> Option<String>;

    fn to_json(&self) -> Value;
}

impl ListItem for LazyEntity {
    fn from_child(client: &Client, child: Value) -> ApiResult<Self> {
        client.unmarshal(child)
    }

    fn stream_key(&self) -> Option<String> {
        if self.kind().tag.is_some() && self.has_attribute("id") {
            return self.fullname().ok().map(|name| name.to_string());
        }
        if self.has_attribute("name") {
            return self.get_str("name").ok();
        }
        None
    }

    fn to_json(&self) -> Value {
        json!({"kind": self.thing_kind(), "data": LazyEntity::to_json(self)})
    }
}

/// Plain records: tagged things yield their `data`, untagged ones pass through.
impl ListItem for Value {
    fn from_child(_client: &Client, child: Value) -> ApiResult<Self> {
        match child {
            Value::Object(mut object) if object.contains_key("kind") => {
                Ok(object.remove("data").unwrap_or(Value::Object(Map::new())))
            }
            other => Ok(other),
        }
    }

    fn stream_key(&self) -> Option<String> {
        self.get("name").and_then(Value::as_str).map(str::to_string)
    }

    fn to_json(&self) -> Value {
        self.clone()
    }
}

type FetchPage = dyn Fn(&Cursor) -> ApiResult<RawPage>;

struct PageSource {
    client: Client,
    fetch: Box<FetchPage>,
}

impl PageSource {
    fn load<T: ListItem>(self: &Rc<Self>, cursor: &Cursor) -> ApiResult<Listing<T>> {
        let page = (self.fetch)(cursor)?;
        let mut listing = Listing::from_page(&self.client, page)?;
        listing.source = Some(self.clone());
        Ok(listing)
    }
}

pub struct Listing<T> {
    items: Vec<T>,
    before: Option<String>,
    after: Option<String>,
    source: Option<Rc<PageSource>>,
}

impl<T: Clone> Clone for Listing<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
            source: self.source.clone(),
        }
    }
}

impl<T> fmt::Debug for Listing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listing")
            .field("items", &self.items.len())
            .field("before", &self.before)
            .field("after", &self.after)
            .field("attached", &self.source.is_some())
            .finish()
    }
}

impl<T> Listing<T> {
    /// A listing with no page source; paging it is a usage error.
    pub fn new(items: Vec<T>, before: Option<String>, after: Option<String>) -> Self {
        Self {
            items,
            before,
            after,
            source: None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn before(&self) -> Option<&str> {
        self.before.as_deref()
    }

    pub fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: ListItem> Listing<T> {
    /// Request the first page through `fetch` and keep it for later paging.
    pub fn request<F>(client: &Client, fetch: F) -> ApiResult<Self>
    where
        F: Fn(&Cursor) -> ApiResult<RawPage> + 'static,
    {
        let source = Rc::new(PageSource {
            client: client.clone(),
            fetch: Box::new(fetch),
        });
        source.load(&Cursor::Start)
    }

    /// Parse an already-fetched page; the result is detached.
    pub fn from_page(client: &Client, page: RawPage) -> ApiResult<Self> {
        let items = page
            .children
            .into_iter()
            .map(|child| T::from_child(client, child))
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(Self::new(items, page.before, page.after))
    }

    pub fn next_page(&self) -> ApiResult<Self> {
        let token = self.after.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::NoMorePages).with_message("listing has no `after` cursor")
        })?;
        self.source()?.load(&Cursor::After(token.clone()))
    }

    pub fn previous_page(&self) -> ApiResult<Self> {
        let token = self.before.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::NoMorePages).with_message("listing has no `before` cursor")
        })?;
        self.source()?.load(&Cursor::Before(token.clone()))
    }

    /// This page followed by every later page, fetched as consumed.
    pub fn pages(self) -> Pages<T> {
        Pages {
            state: PagesState::First(self),
        }
    }

    /// Items of this page and every later page, fetched as consumed.
    pub fn all_items(self) -> ListingItems<T> {
        ListingItems {
            pages: self.pages(),
            buffer: Vec::new().into_iter(),
        }
    }

    pub fn to_json(&self) -> Value {
        let children: Vec<Value> = self.items.iter().map(ListItem::to_json).collect();
        json!({
            "kind": "Listing",
            "data": {
                "children": children,
                "before": self.before,
                "after": self.after,
            }
        })
    }

    fn source(&self) -> ApiResult<&Rc<PageSource>> {
        self.source.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message("listing is detached from its page source")
        })
    }
}

impl<T> IntoIterator for Listing<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Listing<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

enum PagesState<T> {
    First(Listing<T>),
    Next {
        source: Rc<PageSource>,
        after: String,
    },
    Done,
}

pub struct Pages<T> {
    state: PagesState<T>,
}

impl<T: ListItem> Pages<T> {
    fn follow(&mut self, listing: &Listing<T>) {
        self.state = match (&listing.source, &listing.after) {
            (Some(source), Some(after)) => PagesState::Next {
                source: source.clone(),
                after: after.clone(),
            },
            _ => PagesState::Done,
        };
    }
}

impl<T: ListItem> Iterator for Pages<T> {
    type Item = ApiResult<Listing<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, PagesState::Done) {
            PagesState::First(listing) => {
                self.follow(&listing);
                Some(Ok(listing))
            }
            PagesState::Next { source, after } => match source.load(&Cursor::After(after)) {
                Ok(listing) => {
                    self.follow(&listing);
                    Some(Ok(listing))
                }
                Err(err) => Some(Err(err)),
            },
            PagesState::Done => None,
        }
    }
}

pub struct ListingItems<T> {
    pages: Pages<T>,
    buffer: std::vec::IntoIter<T>,
}

impl<T: ListItem> Iterator for ListingItems<T> {
    type Item = ApiResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            match self.pages.next()? {
                Ok(listing) => self.buffer = listing.into_items().into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
