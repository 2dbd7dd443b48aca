//! Purpose: A comment handle with nested author, subreddit, and reply handles.
//! Exports: `Comment`, `COMMENT`.
//! Role: Fetches through its permalink when the parent post is known, else `/api/info`.
//! Invariants: `id` is always stored untagged; `replies` reads as a listing, never a string.
//! Invariants: A comment without `replies` has an empty reply listing; reading it never fetches.
#![allow(clippy::result_large_err)]

use super::capability::{Inboxable, Moderatable, Postable, Replyable};
use super::model::{Model, model_from_child, model_stream_key};
use super::subreddit::{SUBREDDIT, Subreddit};
use super::user::{USER, User};
use crate::core::client::{ApiResult, Client, Params};
use crate::core::coerce::{Coercion, CoercionRegistry};
use crate::core::entity::{Attr, Attributes, EntityKind, LazyEntity};
use crate::core::error::{Error, ErrorKind};
use crate::core::fullname::{COMMENT_TAG, LINK_TAG, strip_tag};
use crate::core::listing::{ListItem, Listing, first_child_data};
use serde_json::Value;
use std::rc::Rc;

static COMMENT_COERCIONS: [(&str, Coercion); 3] = [
    ("author", Coercion::Entity(&USER)),
    ("subreddit", Coercion::Entity(&SUBREDDIT)),
    ("replies", Coercion::Listing(&COMMENT)),
];

pub static COMMENT: EntityKind = EntityKind {
    name: "Comment",
    tag: Some(COMMENT_TAG),
    coercions: CoercionRegistry::new(&COMMENT_COERCIONS),
    from_attributes: comment_from_attributes,
    from_id: Some(comment_from_id),
};

fn comment_from_attributes(client: &Client, attributes: Attributes) -> LazyEntity {
    Comment::from_response(client, attributes).entity
}

fn comment_from_id(client: &Client, id: &str) -> LazyEntity {
    Comment::from_id(client, id).entity
}

#[derive(Clone, Debug)]
pub struct Comment {
    entity: LazyEntity,
}

impl Comment {
    pub fn from_response(client: &Client, attributes: Attributes) -> Self {
        let mut attributes = attributes;
        attributes
            .entry("replies")
            .or_insert_with(|| Value::String(String::new()));
        let id = attributes
            .get("id")
            .or_else(|| attributes.get("name"))
            .and_then(Value::as_str)
            .map(|raw| strip_tag(raw, COMMENT_TAG).to_string());
        let Some(id) = id else {
            return Self {
                entity: LazyEntity::complete(&COMMENT, client, attributes),
            };
        };
        attributes.insert("id".to_string(), Value::String(id.clone()));

        let link = attributes
            .get("link_id")
            .and_then(Value::as_str)
            .map(|raw| strip_tag(raw, LINK_TAG).to_string());
        let entity = LazyEntity::deferred(&COMMENT, client, attributes, move |client| {
            match link {
                Some(link) => fetch_from_thread(client, &link, &id),
                None => fetch_from_info(client, &id),
            }
        });
        Self { entity }
    }

    /// A stub by fullname (`t1_abc`) or bare id.
    pub fn from_id(client: &Client, id: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(
            "id".to_string(),
            Value::String(strip_tag(id, COMMENT_TAG).to_string()),
        );
        Self::from_response(client, attributes)
    }

    pub fn body(&self) -> ApiResult<String> {
        self.get_str("body")
    }

    /// `None` for deleted comments.
    pub fn author(&self) -> ApiResult<Option<User>> {
        self.related("author")
    }

    pub fn subreddit(&self) -> ApiResult<Option<Subreddit>> {
        self.related("subreddit")
    }

    /// Direct replies, including `more` stubs as `Basic` entities.
    pub fn replies_listing(&self) -> ApiResult<Rc<Listing<LazyEntity>>> {
        match self.get("replies")? {
            Attr::Listing(listing) => Ok(listing),
            _ => Err(Error::new(ErrorKind::Decode)
                .with_message("replies is not a listing")
                .with_entity(COMMENT.name)
                .with_field("replies")),
        }
    }

    /// Loaded direct replies; `more` stubs are skipped.
    pub fn replies(&self) -> ApiResult<Vec<Comment>> {
        Ok(self
            .replies_listing()?
            .iter()
            .filter_map(Comment::downcast)
            .collect())
    }
}

fn fetch_from_thread(client: &Client, link: &str, id: &str) -> ApiResult<Attributes> {
    let path = format!("/comments/{link}/_/{id}");
    let response = client.get(&path, &Params::new())?;
    // The thread endpoint returns [post listing, comment listing].
    let comments = response.body.get(1).ok_or_else(|| {
        Error::new(ErrorKind::Decode)
            .with_message("thread response is missing the comment listing")
            .with_path(path.clone())
    })?;
    first_child_data(comments).map_err(|err| err.with_path(path))
}

fn fetch_from_info(client: &Client, id: &str) -> ApiResult<Attributes> {
    let mut params = Params::new();
    params.insert("id".to_string(), format!("{COMMENT_TAG}_{id}"));
    let response = client.get("/api/info", &params)?;
    first_child_data(&response.body).map_err(|err| err.with_path("/api/info"))
}

impl Model for Comment {
    fn kind() -> &'static EntityKind {
        &COMMENT
    }

    fn from_entity(entity: LazyEntity) -> Self {
        Self { entity }
    }

    fn entity(&self) -> &LazyEntity {
        &self.entity
    }
}

impl ListItem for Comment {
    fn from_child(client: &Client, child: Value) -> ApiResult<Self> {
        model_from_child(client, child)
    }

    fn stream_key(&self) -> Option<String> {
        model_stream_key(self)
    }

    fn to_json(&self) -> Value {
        ListItem::to_json(&self.entity)
    }
}

impl Replyable for Comment {}

impl Postable for Comment {}

impl Moderatable for Comment {}

impl Inboxable for Comment {}
