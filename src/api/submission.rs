//! Purpose: A link or self post and its comment tree.
//! Exports: `Submission`, `SUBMISSION`.
//! Role: Resolves through `/comments/{id}`, which also carries the comment tree.
//! Invariants: `id` is always stored untagged.
#![allow(clippy::result_large_err)]

use super::capability::{Moderatable, Postable, Replyable};
use super::model::{Model, model_from_child, model_stream_key};
use super::subreddit::{SUBREDDIT, Subreddit};
use super::user::{USER, User};
use crate::core::client::{ApiResult, Client, Params};
use crate::core::coerce::{Coercion, CoercionRegistry};
use crate::core::entity::{Attributes, EntityKind, LazyEntity};
use crate::core::error::{Error, ErrorKind};
use crate::core::fullname::{LINK_TAG, strip_tag};
use crate::core::listing::{ListItem, Listing, RawPage, first_child_data};
use serde_json::Value;

static SUBMISSION_COERCIONS: [(&str, Coercion); 2] = [
    ("author", Coercion::Entity(&USER)),
    ("subreddit", Coercion::Entity(&SUBREDDIT)),
];

pub static SUBMISSION: EntityKind = EntityKind {
    name: "Submission",
    tag: Some(LINK_TAG),
    coercions: CoercionRegistry::new(&SUBMISSION_COERCIONS),
    from_attributes: submission_from_attributes,
    from_id: Some(submission_from_id),
};

fn submission_from_attributes(client: &Client, attributes: Attributes) -> LazyEntity {
    Submission::from_response(client, attributes).entity
}

fn submission_from_id(client: &Client, id: &str) -> LazyEntity {
    Submission::from_id(client, id).entity
}

#[derive(Clone, Debug)]
pub struct Submission {
    entity: LazyEntity,
}

impl Submission {
    pub fn from_response(client: &Client, attributes: Attributes) -> Self {
        let mut attributes = attributes;
        let id = attributes
            .get("id")
            .or_else(|| attributes.get("name"))
            .and_then(Value::as_str)
            .map(|raw| strip_tag(raw, LINK_TAG).to_string());
        let Some(id) = id else {
            return Self {
                entity: LazyEntity::complete(&SUBMISSION, client, attributes),
            };
        };
        attributes.insert("id".to_string(), Value::String(id.clone()));
        let entity = LazyEntity::deferred(&SUBMISSION, client, attributes, move |client| {
            let (post, _) = fetch_thread(client, &id, &Params::new())?;
            first_child_data(&post)
        });
        Self { entity }
    }

    /// A stub by fullname (`t3_abc`) or bare id.
    pub fn from_id(client: &Client, id: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(
            "id".to_string(),
            Value::String(strip_tag(id, LINK_TAG).to_string()),
        );
        Self::from_response(client, attributes)
    }

    pub fn title(&self) -> ApiResult<String> {
        self.get_str("title")
    }

    pub fn url(&self) -> ApiResult<String> {
        self.get_str("url")
    }

    pub fn selftext(&self) -> ApiResult<String> {
        self.get_str("selftext")
    }

    /// `None` for deleted posts.
    pub fn author(&self) -> ApiResult<Option<User>> {
        self.related("author")
    }

    pub fn subreddit(&self) -> ApiResult<Option<Subreddit>> {
        self.related("subreddit")
    }

    /// Top-level comments plus `more` stubs, as returned with the post.
    ///
    /// `params` takes the thread options (`sort`, `limit`, `depth`).
    pub fn comments(&self, params: Params) -> ApiResult<Listing<LazyEntity>> {
        let (_, comments) = fetch_thread(self.client(), &self.id()?, &params)?;
        let page = RawPage::from_envelope(&comments)?;
        Listing::from_page(self.client(), page)
    }
}

/// GET the thread and split it into its post and comment listings.
fn fetch_thread(client: &Client, id: &str, params: &Params) -> ApiResult<(Value, Value)> {
    let path = format!("/comments/{id}");
    let response = client.get(&path, params)?;
    match response.body {
        Value::Array(parts) if parts.len() >= 2 => {
            let mut parts = parts.into_iter();
            let post = parts.next().unwrap_or(Value::Null);
            let comments = parts.next().unwrap_or(Value::Null);
            Ok((post, comments))
        }
        _ => Err(Error::new(ErrorKind::Decode)
            .with_message("thread response must be a [post, comments] pair")
            .with_path(path)),
    }
}

impl Model for Submission {
    fn kind() -> &'static EntityKind {
        &SUBMISSION
    }

    fn from_entity(entity: LazyEntity) -> Self {
        Self { entity }
    }

    fn entity(&self) -> &LazyEntity {
        &self.entity
    }
}

impl ListItem for Submission {
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

impl Replyable for Submission {}

impl Postable for Submission {}

impl Moderatable for Submission {}
