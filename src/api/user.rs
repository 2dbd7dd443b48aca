// A reddit account, addressed by username.
#![allow(clippy::result_large_err)]

use super::capability::Messageable;
use super::model::Model;
use super::submission::Submission;
use crate::core::client::{ApiResult, Client, Params};
use crate::core::coerce::CoercionRegistry;
use crate::core::entity::{Attributes, EntityKind, LazyEntity};
use crate::core::fullname::ACCOUNT_TAG;
use crate::core::listing::{ListItem, Listing};
use serde_json::Value;

pub static USER: EntityKind = EntityKind {
    name: "User",
    tag: Some(ACCOUNT_TAG),
    coercions: CoercionRegistry::empty(),
    from_attributes: user_from_attributes,
    from_id: Some(user_from_id),
};

fn user_from_attributes(client: &Client, attributes: Attributes) -> LazyEntity {
    User::from_response(client, attributes).entity
}

fn user_from_id(client: &Client, name: &str) -> LazyEntity {
    User::from_id(client, name).entity
}

#[derive(Clone, Debug)]
pub struct User {
    entity: LazyEntity,
}

/// Per-user listings under `/user/{name}/...`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserListing {
    Overview,
    Submitted,
    Comments,
    Gilded,
}

impl UserListing {
    pub fn as_str(self) -> &'static str {
        match self {
            UserListing::Overview => "overview",
            UserListing::Submitted => "submitted",
            UserListing::Comments => "comments",
            UserListing::Gilded => "gilded",
        }
    }
}

impl User {
    /// Wrap API attributes; a known `name` lets missing fields be fetched later.
    pub fn from_response(client: &Client, attributes: Attributes) -> Self {
        let name = attributes
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let entity = match name {
            Some(name) => LazyEntity::deferred(&USER, client, attributes, move |client| {
                client.get_data(&format!("/user/{name}/about"), &Params::new())
            }),
            None => LazyEntity::complete(&USER, client, attributes),
        };
        Self { entity }
    }

    pub fn from_id(client: &Client, name: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), Value::String(name.to_string()));
        Self::from_response(client, attributes)
    }

    pub fn name(&self) -> ApiResult<String> {
        self.get_str("name")
    }

    pub fn listing<T: ListItem>(&self, kind: UserListing, params: Params) -> ApiResult<Listing<T>> {
        let path = format!("/user/{}/{}", self.name()?, kind.as_str());
        self.client().listing(&path, params)
    }

    pub fn submissions(&self, params: Params) -> ApiResult<Listing<Submission>> {
        self.listing(UserListing::Submitted, params)
    }
}

impl Model for User {
    fn kind() -> &'static EntityKind {
        &USER
    }

    fn from_entity(entity: LazyEntity) -> Self {
        Self { entity }
    }

    fn entity(&self) -> &LazyEntity {
        &self.entity
    }
}

impl ListItem for User {
    fn from_child(client: &Client, child: Value) -> ApiResult<Self> {
        super::model::model_from_child(client, child)
    }

    fn stream_key(&self) -> Option<String> {
        super::model::model_stream_key(self)
    }

    fn to_json(&self) -> Value {
        ListItem::to_json(&self.entity)
    }
}

impl Messageable for User {
    fn recipient(&self) -> ApiResult<String> {
        self.name()
    }
}
