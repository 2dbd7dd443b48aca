//! Purpose: Behavior shared by unrelated entity types (messaging, search, replies, edits).
//! Exports: `Messageable`, `Searchable`, `Replyable`, `Postable`, `Moderatable`, `Inboxable`.
//! Exports: `Distinguish`.
//! Role: Small traits with default request bodies; types opt in explicitly.
//! Invariants: Write endpoints are sent with `api_type=json` and their `json.errors` checked.
#![allow(clippy::result_large_err)]

use super::comment::Comment;
use super::model::{Model, model_from_child};
use super::submission::Submission;
use super::subreddit::Subreddit;
use crate::core::client::{ApiResult, Client, Params};
use crate::core::error::{Error, ErrorKind};
use crate::core::listing::Listing;
use serde_json::Value;

/// Reject a write response whose `json.errors` array is non-empty.
pub(crate) fn check_json_errors(body: &Value, path: &str) -> ApiResult<()> {
    let Some(Value::Array(errors)) = body.pointer("/json/errors") else {
        return Ok(());
    };
    let Some(first) = errors.first() else {
        return Ok(());
    };
    // Each error is `[code, message, field]`.
    let detail = match first {
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(": "),
        other => other.to_string(),
    };
    Err(Error::new(ErrorKind::Usage)
        .with_message(format!("api rejected request: {detail}"))
        .with_path(path))
}

pub(crate) fn json_params(pairs: &[(&str, String)]) -> Params {
    let mut params: Params = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();
    params.insert("api_type".to_string(), "json".to_string());
    params
}

/// POST `path` with the model's fullname as `id` plus any extra fields.
pub(crate) fn post_by_fullname<M: Model>(
    model: &M,
    path: &str,
    extra: &[(&str, String)],
) -> ApiResult<()> {
    let mut params = Params::new();
    params.insert("id".to_string(), model.fullname()?.to_string());
    for (key, value) in extra {
        params.insert(key.to_string(), value.clone());
    }
    model.client().post(path, &params)?;
    Ok(())
}

/// Something that can receive a private message.
pub trait Messageable: Model {
    /// The `to` value of `/api/compose` (username or `/r/{name}`).
    fn recipient(&self) -> ApiResult<String>;

    /// Send a message, optionally on behalf of a moderated subreddit.
    fn send_message(&self, subject: &str, text: &str, from: Option<&Subreddit>) -> ApiResult<()> {
        let mut params = json_params(&[
            ("to", self.recipient()?),
            ("subject", subject.to_string()),
            ("text", text.to_string()),
        ]);
        if let Some(from) = from {
            params.insert("from_sr".to_string(), from.display_name()?);
        }
        let response = self.client().post("/api/compose", &params)?;
        check_json_errors(&response.body, "/api/compose")
    }
}

/// Something that can scope a search.
pub trait Searchable {
    fn search_client(&self) -> &Client;

    /// Subreddit to restrict results to, if any.
    fn restrict_to(&self) -> ApiResult<Option<String>>;

    fn search(&self, query: &str, params: Params) -> ApiResult<Listing<Submission>> {
        let mut params = params;
        params.insert("q".to_string(), query.to_string());
        let path = match self.restrict_to()? {
            Some(name) => {
                params.insert("restrict_sr".to_string(), "true".to_string());
                format!("/r/{name}/search")
            }
            None => "/search".to_string(),
        };
        self.search_client().listing(&path, params)
    }
}

/// Site-wide search.
impl Searchable for Client {
    fn search_client(&self) -> &Client {
        self
    }

    fn restrict_to(&self) -> ApiResult<Option<String>> {
        Ok(None)
    }
}

/// Something a comment can be posted under.
pub trait Replyable: Model {
    fn reply(&self, text: &str) -> ApiResult<Comment> {
        let params = json_params(&[
            ("thing_id", self.fullname()?.to_string()),
            ("text", text.to_string()),
        ]);
        let response = self.client().post("/api/comment", &params)?;
        check_json_errors(&response.body, "/api/comment")?;
        match response.body.pointer("/json/data/things/0") {
            Some(thing) => model_from_child(self.client(), thing.clone()),
            None => Err(Error::new(ErrorKind::Decode)
                .with_message("reply response has no comment")
                .with_path("/api/comment")),
        }
    }
}

/// Author-side actions on a post or comment.
pub trait Postable: Model {
    fn edit(&self, text: &str) -> ApiResult<()> {
        let params = json_params(&[
            ("thing_id", self.fullname()?.to_string()),
            ("text", text.to_string()),
        ]);
        let response = self.client().post("/api/editusertext", &params)?;
        check_json_errors(&response.body, "/api/editusertext")
    }

    fn delete(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/del", &[])
    }

    fn save(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/save", &[])
    }

    fn unsave(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/unsave", &[])
    }
}

/// How a moderator's post or comment is marked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Distinguish {
    /// Moderator distinguish.
    Yes,
    /// Remove the distinguish.
    No,
    Admin,
    Special,
}

impl Distinguish {
    fn as_str(self) -> &'static str {
        match self {
            Distinguish::Yes => "yes",
            Distinguish::No => "no",
            Distinguish::Admin => "admin",
            Distinguish::Special => "special",
        }
    }
}

/// Moderator actions on a post or comment.
pub trait Moderatable: Model {
    fn approve(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/approve", &[])
    }

    /// Remove the thing, optionally training the spam filter.
    fn remove(&self, spam: bool) -> ApiResult<()> {
        post_by_fullname(self, "/api/remove", &[("spam", spam.to_string())])
    }

    fn distinguish(&self, how: Distinguish) -> ApiResult<()> {
        let params = json_params(&[
            ("id", self.fullname()?.to_string()),
            ("how", how.as_str().to_string()),
        ]);
        let response = self.client().post("/api/distinguish", &params)?;
        check_json_errors(&response.body, "/api/distinguish")
    }

    fn undistinguish(&self) -> ApiResult<()> {
        self.distinguish(Distinguish::No)
    }

    fn ignore_reports(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/ignore_reports", &[])
    }

    fn unignore_reports(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/unignore_reports", &[])
    }
}

/// Read state of something delivered to the inbox.
pub trait Inboxable: Model {
    fn mark_as_read(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/read_message", &[])
    }

    fn mark_as_unread(&self) -> ApiResult<()> {
        post_by_fullname(self, "/api/unread_message", &[])
    }
}
