//! Purpose: Typed handles over `LazyEntity` and the registry of known thing kinds.
//! Exports: `Model`, `Client::new` and the client's lookup helpers.
//! Role: Bridges the untyped resolution engine to concrete entity types.
//! Invariants: A typed handle always wraps an entity of its own kind.
#![allow(clippy::result_large_err)]

use super::comment::COMMENT;
use super::submission::SUBMISSION;
use super::subreddit::{SUBREDDIT, Subreddit};
use super::user::{USER, User};
use super::{Comment, Submission};
use crate::core::client::{ApiResult, Client, Params, Transport};
use crate::core::entity::{Attr, EntityKind, LazyEntity};
use crate::core::error::{Error, ErrorKind};
use crate::core::fullname::Fullname;
use crate::core::listing::Listing;
use serde_json::Value;

static KINDS: [&EntityKind; 4] = [&COMMENT, &USER, &SUBMISSION, &SUBREDDIT];

pub trait Model: Clone {
    fn kind() -> &'static EntityKind;

    /// Wrap without checking the kind; prefer `downcast`.
    fn from_entity(entity: LazyEntity) -> Self;

    fn entity(&self) -> &LazyEntity;

    fn downcast(entity: &LazyEntity) -> Option<Self> {
        if std::ptr::eq(entity.kind(), Self::kind()) {
            Some(Self::from_entity(entity.clone()))
        } else {
            None
        }
    }

    fn client(&self) -> &Client {
        self.entity().client()
    }

    fn get(&self, name: &str) -> ApiResult<Attr> {
        self.entity().get_attribute(name)
    }

    fn get_str(&self, name: &str) -> ApiResult<String> {
        self.entity().get_str(name)
    }

    fn id(&self) -> ApiResult<String> {
        self.get_str("id")
    }

    fn fullname(&self) -> ApiResult<Fullname> {
        self.entity().fullname()
    }

    /// Read a field declared as a nested entity; null reads as `None`.
    fn related<T: Model>(&self, name: &str) -> ApiResult<Option<T>> {
        match self.get(name)? {
            Attr::Entity(entity) => T::downcast(&entity).map(Some).ok_or_else(|| {
                Error::new(ErrorKind::Decode)
                    .with_message(format!("expected {}, found {}", T::kind().name, entity.kind().name))
                    .with_entity(Self::kind().name)
                    .with_field(name)
            }),
            Attr::Value(Value::Null) => Ok(None),
            _ => Err(Error::new(ErrorKind::Decode)
                .with_message(format!("field is not a {}", T::kind().name))
                .with_entity(Self::kind().name)
                .with_field(name)),
        }
    }
}

/// Unmarshal a tagged child and require it to be a `T`.
pub(crate) fn model_from_child<T: Model>(client: &Client, child: Value) -> ApiResult<T> {
    let entity = client.unmarshal(child)?;
    T::downcast(&entity).ok_or_else(|| {
        Error::new(ErrorKind::Decode).with_message(format!(
            "expected {}, found {}",
            T::kind().name,
            entity.kind().name
        ))
    })
}

pub(crate) fn model_stream_key<T: Model>(model: &T) -> Option<String> {
    if model.entity().has_attribute("id") {
        model.fullname().ok().map(|name| name.to_string())
    } else {
        None
    }
}

impl Client {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Client::with_kinds(transport, &KINDS)
    }

    pub fn subreddit(&self, display_name: &str) -> Subreddit {
        Subreddit::from_id(self, display_name)
    }

    pub fn user(&self, name: &str) -> User {
        User::from_id(self, name)
    }

    /// A comment by fullname (`t1_abc`) or bare id.
    pub fn comment(&self, id: &str) -> Comment {
        Comment::from_id(self, id)
    }

    /// A submission by fullname (`t3_abc`) or bare id.
    pub fn submission(&self, id: &str) -> Submission {
        Submission::from_id(self, id)
    }

    /// Bulk lookup of things by fullname.
    pub fn info(&self, fullnames: &[Fullname]) -> ApiResult<Listing<LazyEntity>> {
        if fullnames.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("info needs at least one fullname"));
        }
        let ids: Vec<String> = fullnames.iter().map(ToString::to_string).collect();
        let mut params = Params::new();
        params.insert("id".to_string(), ids.join(","));
        self.listing("/api/info", params)
    }
}

#[cfg(test)]
mod tests {
    use super::Model;
    use crate::api::{Comment, Submission, User};
    use crate::core::error::ErrorKind;
    use crate::core::fullname::Fullname;
    use crate::test_support::MockTransport;
    use serde_json::json;

    #[test]
    fn downcast_checks_kind() {
        let client = MockTransport::new().client();
        let comment = client.comment("t1_abc");
        assert!(Comment::downcast(comment.entity()).is_some());
        assert!(Submission::downcast(comment.entity()).is_none());
    }

    #[test]
    fn related_reads_nested_handles() {
        let mock = MockTransport::new();
        let client = mock.client();
        let entity = client
            .unmarshal(json!({
                "kind": "t1",
                "data": {"id": "c1", "author": "alice", "subreddit": null}
            }))
            .expect("entity");
        let comment = Comment::downcast(&entity).expect("comment");
        let author: User = comment.related("author").expect("author").expect("some");
        assert_eq!(author.name().expect("name"), "alice");
        assert!(comment.related::<User>("subreddit").expect("subreddit").is_none());
        let err = comment.related::<User>("id").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn info_joins_fullnames() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/api/info",
            json!({"data": {"children": [
                {"kind": "t3", "data": {"id": "a"}},
                {"kind": "t1", "data": {"id": "b"}}
            ], "before": null, "after": null}}),
        );
        let client = mock.client();
        let names = [
            Fullname::parse("t3_a").expect("name"),
            Fullname::parse("t1_b").expect("name"),
        ];
        let listing = client.info(&names).expect("info");
        assert_eq!(listing.len(), 2);
        assert_eq!(
            mock.calls()[0].params.get("id").map(String::as_str),
            Some("t3_a,t1_b")
        );
        assert_eq!(client.info(&[]).expect_err("err").kind(), ErrorKind::Usage);
    }
}
