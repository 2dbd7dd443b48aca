//! Purpose: A subreddit handle and its listing, stream, and moderation endpoints.
//! Exports: `Subreddit`, `SUBREDDIT`, `Sort`, `ModeratorListing`, `Relationship`,
//! Exports: `SubmitOptions`, `FlairTarget`.
//! Role: Addressed by display name; everything else is fetched from `/r/{name}/about`.
//! Invariants: Endpoint paths are built from `display_name`, which a stub always has.
#![allow(clippy::result_large_err)]

use super::capability::{Messageable, Searchable, check_json_errors};
use super::comment::Comment;
use super::model::{Model, model_from_child, model_stream_key};
use super::submission::Submission;
use super::user::User;
use crate::core::client::{ApiResult, Client, Params};
use crate::core::coerce::CoercionRegistry;
use crate::core::entity::{Attributes, EntityKind, LazyEntity};
use crate::core::error::{Error, ErrorKind, OptionalExt};
use crate::core::fullname::SUBREDDIT_TAG;
use crate::core::listing::{Cursor, ListItem, Listing, RawPage};
use crate::core::stream::{Stream, StreamOptions};
use serde_json::Value;

pub static SUBREDDIT: EntityKind = EntityKind {
    name: "Subreddit",
    tag: Some(SUBREDDIT_TAG),
    coercions: CoercionRegistry::empty(),
    from_attributes: subreddit_from_attributes,
    from_id: Some(subreddit_from_id),
};

fn subreddit_from_attributes(client: &Client, attributes: Attributes) -> LazyEntity {
    Subreddit::from_response(client, attributes).entity
}

fn subreddit_from_id(client: &Client, name: &str) -> LazyEntity {
    Subreddit::from_id(client, name).entity
}

/// Keys returned by `settings` renamed to the keys `site_admin` expects.
const SETTINGS_MAP: [(&str, &str); 5] = [
    ("subreddit_type", "type"),
    ("language", "lang"),
    ("content_options", "link_type"),
    ("default_set", "allow_top"),
    ("header_hover_text", "header-title"),
];

#[derive(Clone, Debug)]
pub struct Subreddit {
    entity: LazyEntity,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sort {
    Hot,
    New,
    Top,
    Controversial,
    Comments,
    Rising,
    Gilded,
}

impl Sort {
    pub fn as_str(self) -> &'static str {
        match self {
            Sort::Hot => "hot",
            Sort::New => "new",
            Sort::Top => "top",
            Sort::Controversial => "controversial",
            Sort::Comments => "comments",
            Sort::Rising => "rising",
            Sort::Gilded => "gilded",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModeratorListing {
    Reports,
    Spam,
    Modqueue,
    Unmoderated,
    Edited,
}

impl ModeratorListing {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeratorListing::Reports => "reports",
            ModeratorListing::Spam => "spam",
            ModeratorListing::Modqueue => "modqueue",
            ModeratorListing::Unmoderated => "unmoderated",
            ModeratorListing::Edited => "edited",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Relationship {
    Banned,
    Muted,
    Wikibanned,
    Contributors,
    Wikicontributors,
    Moderators,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Banned => "banned",
            Relationship::Muted => "muted",
            Relationship::Wikibanned => "wikibanned",
            Relationship::Contributors => "contributors",
            Relationship::Wikicontributors => "wikicontributors",
            Relationship::Moderators => "moderators",
        }
    }
}

/// Body of a new post; a `url` makes it a link post and wins over `text`.
#[derive(Clone, Debug)]
pub struct SubmitOptions {
    pub text: Option<String>,
    pub url: Option<String>,
    pub resubmit: bool,
    pub send_replies: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            text: None,
            url: None,
            resubmit: false,
            send_replies: true,
        }
    }
}

pub enum FlairTarget<'a> {
    User(&'a User),
    Submission(&'a Submission),
}

impl Subreddit {
    /// Wrap API attributes; a known `display_name` makes the rest fetchable.
    pub fn from_response(client: &Client, attributes: Attributes) -> Self {
        let name = attributes
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let entity = match name {
            Some(name) => LazyEntity::deferred(&SUBREDDIT, client, attributes, move |client| {
                client.get_data(&format!("/r/{name}/about"), &Params::new())
            }),
            None => LazyEntity::complete(&SUBREDDIT, client, attributes),
        };
        Self { entity }
    }

    pub fn from_id(client: &Client, display_name: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(
            "display_name".to_string(),
            Value::String(display_name.to_string()),
        );
        Self::from_response(client, attributes)
    }

    pub fn display_name(&self) -> ApiResult<String> {
        self.get_str("display_name")
    }

    fn path(&self, suffix: &str) -> ApiResult<String> {
        Ok(format!("/r/{}/{suffix}", self.display_name()?))
    }

    /// `time` is accepted as an alias for the API's `t` parameter.
    pub fn listing<T: ListItem>(&self, sort: Sort, params: Params) -> ApiResult<Listing<T>> {
        let mut params = params;
        if let Some(time) = params.remove("time") {
            params.insert("t".to_string(), time);
        }
        self.client().listing(&self.path(sort.as_str())?, params)
    }

    pub fn hot(&self, params: Params) -> ApiResult<Listing<Submission>> {
        self.listing(Sort::Hot, params)
    }

    pub fn new_posts(&self, params: Params) -> ApiResult<Listing<Submission>> {
        self.listing(Sort::New, params)
    }

    pub fn top(&self, params: Params) -> ApiResult<Listing<Submission>> {
        self.listing(Sort::Top, params)
    }

    pub fn comments(&self, params: Params) -> ApiResult<Listing<Comment>> {
        self.listing(Sort::Comments, params)
    }

    /// Reports, spam, modqueue and friends; may mix posts and comments.
    pub fn moderator_listing(
        &self,
        kind: ModeratorListing,
        params: Params,
    ) -> ApiResult<Listing<LazyEntity>> {
        let path = self.path(&format!("about/{}", kind.as_str()))?;
        self.client().listing(&path, params)
    }

    /// Raw relationship records (`name`, `id`, `date`, ...).
    pub fn relationship_listing(
        &self,
        kind: Relationship,
        params: Params,
    ) -> ApiResult<Vec<Value>> {
        let path = self.path(&format!("about/{}", kind.as_str()))?;
        let response = self.client().get(&path, &params)?;
        let page = RawPage::from_envelope(&response.body).map_err(|err| err.with_path(path))?;
        Ok(page
            .children
            .into_iter()
            .map(|child| match child {
                Value::Object(mut object) if object.contains_key("kind") => {
                    object.remove("data").unwrap_or(Value::Null)
                }
                other => other,
            })
            .collect())
    }

    /// Newly submitted posts, oldest first, forever.
    pub fn post_stream(&self, options: StreamOptions) -> ApiResult<Stream<Submission>> {
        self.stream(Sort::New, options)
    }

    /// Newly posted comments, oldest first, forever.
    pub fn comment_stream(&self, options: StreamOptions) -> ApiResult<Stream<Comment>> {
        self.stream(Sort::Comments, options)
    }

    fn stream<T: ListItem + 'static>(
        &self,
        sort: Sort,
        options: StreamOptions,
    ) -> ApiResult<Stream<T>> {
        let path = self.path(sort.as_str())?;
        let client = self.client().clone();
        let limit = options.limit.to_string();
        Ok(Stream::new(options, move |before: Option<&str>| {
            let mut params = Params::new();
            params.insert("limit".to_string(), limit.clone());
            if let Some(before) = before {
                params.insert("before".to_string(), before.to_string());
            }
            client.listing(&path, params)
        }))
    }

    /// Submit a link (when `url` is set) or a self post.
    pub fn submit(&self, title: &str, options: SubmitOptions) -> ApiResult<Submission> {
        let mut params = Params::new();
        params.insert("title".to_string(), title.to_string());
        params.insert("sr".to_string(), self.display_name()?);
        params.insert("resubmit".to_string(), options.resubmit.to_string());
        params.insert("sendreplies".to_string(), options.send_replies.to_string());
        params.insert("api_type".to_string(), "json".to_string());
        match (&options.url, &options.text) {
            (Some(url), _) => {
                params.insert("kind".to_string(), "link".to_string());
                params.insert("url".to_string(), url.clone());
            }
            (None, text) => {
                params.insert("kind".to_string(), "self".to_string());
                if let Some(text) = text {
                    params.insert("text".to_string(), text.clone());
                }
            }
        }
        let response = self.client().post("/api/submit", &params)?;
        check_json_errors(&response.body, "/api/submit")?;
        match response.body.pointer("/json/data") {
            Some(Value::Object(data)) => Ok(Submission::from_response(self.client(), data.clone())),
            _ => Err(Error::new(ErrorKind::Decode)
                .with_message("submit response is missing `json.data`")
                .with_path("/api/submit")),
        }
    }

    pub fn set_flair(
        &self,
        target: FlairTarget<'_>,
        text: &str,
        css_class: Option<&str>,
    ) -> ApiResult<()> {
        let mut params = Params::new();
        params.insert("text".to_string(), text.to_string());
        match target {
            FlairTarget::User(user) => params.insert("name".to_string(), user.name()?),
            FlairTarget::Submission(post) => {
                params.insert("link".to_string(), post.fullname()?.to_string())
            }
        };
        if let Some(css_class) = css_class {
            params.insert("css_class".to_string(), css_class.to_string());
        }
        self.client().post(&self.path("api/flair")?, &params)?;
        Ok(())
    }

    /// User flair records; pages through the endpoint's `prev`/`next` cursors.
    pub fn flair_listing(&self, params: Params) -> ApiResult<Listing<Value>> {
        let path = self.path("api/flairlist")?;
        let client = self.client().clone();
        Listing::request(self.client(), move |cursor: &Cursor| {
            let mut params = params.clone();
            cursor.apply(&mut params);
            let response = client.get(&path, &params)?;
            flair_page(&response.body).map_err(|err| err.with_path(path.clone()))
        })
    }

    /// The user's flair here, or `None` when they have none.
    pub fn get_flair(&self, user: &User) -> ApiResult<Option<Value>> {
        let name = user.name()?;
        let mut params = Params::new();
        params.insert("name".to_string(), name.clone());
        let Some(listing) = self.flair_listing(params).optional()? else {
            return Ok(None);
        };
        // An unknown user gets every flair back, so match the name explicitly.
        let flair = listing.into_items().into_iter().next().filter(|flair| {
            flair
                .get("user")
                .and_then(Value::as_str)
                .is_some_and(|found| found.eq_ignore_ascii_case(&name))
        });
        Ok(flair)
    }

    pub fn subscribe(&self) -> ApiResult<()> {
        self.set_subscription("sub", false)
    }

    pub fn unsubscribe(&self) -> ApiResult<()> {
        self.set_subscription("unsub", false)
    }

    fn set_subscription(&self, action: &str, skip_initial_defaults: bool) -> ApiResult<()> {
        let mut params = Params::new();
        params.insert("sr_name".to_string(), self.display_name()?);
        params.insert("action".to_string(), action.to_string());
        params.insert(
            "skip_initial_defaults".to_string(),
            skip_initial_defaults.to_string(),
        );
        self.client().post("/api/subscribe", &params)?;
        Ok(())
    }

    /// The stylesheet, or `None` when the subreddit has none.
    pub fn stylesheet(&self) -> ApiResult<Option<String>> {
        let path = self.path("about/stylesheet")?;
        let Some(data) = self.client().get_data(&path, &Params::new()).optional()? else {
            return Ok(None);
        };
        Ok(data
            .get("stylesheet")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub fn update_stylesheet(&self, text: &str, reason: Option<&str>) -> ApiResult<()> {
        let mut params = Params::new();
        params.insert("op".to_string(), "save".to_string());
        params.insert("stylesheet_contents".to_string(), text.to_string());
        if let Some(reason) = reason {
            params.insert("reason".to_string(), reason.to_string());
        }
        self.client()
            .post(&self.path("api/subreddit_stylesheet")?, &params)?;
        Ok(())
    }

    pub fn settings(&self) -> ApiResult<Attributes> {
        self.client()
            .get_data(&self.path("about/edit")?, &Params::new())
    }

    /// Apply `changes` on top of the current settings.
    pub fn modify_settings(&self, changes: Attributes) -> ApiResult<()> {
        let mut merged = self.settings()?;
        merged.extend(changes);
        merged.insert("sr".to_string(), Value::String(self.get_str("name")?));
        for (from, to) in SETTINGS_MAP {
            if let Some(value) = merged.remove(from) {
                merged.insert(to.to_string(), value);
            }
        }

        let mut params = Params::new();
        for (key, value) in merged {
            match value {
                Value::Null => {}
                Value::String(text) => {
                    params.insert(key, text);
                }
                other => {
                    params.insert(key, other.to_string());
                }
            }
        }
        self.client().post("/api/site_admin", &params)?;
        Ok(())
    }

    /// Moderator action records.
    pub fn mod_log(&self, params: Params) -> ApiResult<Listing<LazyEntity>> {
        self.client().listing(&self.path("about/log")?, params)
    }

    pub fn wiki_pages(&self) -> ApiResult<Vec<String>> {
        let path = self.path("wiki/pages")?;
        let response = self.client().get(&path, &Params::new())?;
        match response.body.get("data") {
            Some(Value::Array(pages)) => Ok(pages
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()),
            _ => Err(Error::new(ErrorKind::Decode)
                .with_message("wiki page list is missing `data`")
                .with_path(path)),
        }
    }

    /// One wiki page's record (`content_md`, `revision_date`, ...).
    pub fn wiki_page(&self, page: &str) -> ApiResult<Attributes> {
        let path = self.path(&format!("wiki/{page}"))?;
        self.client().get_data(&path, &Params::new())
    }
}

fn flair_page(body: &Value) -> ApiResult<RawPage> {
    let Some(Value::Array(users)) = body.get("users") else {
        return Err(Error::new(ErrorKind::Decode).with_message("flair list is missing `users`"));
    };
    let token = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    };
    Ok(RawPage {
        children: users.clone(),
        before: token("prev"),
        after: token("next"),
    })
}

impl Model for Subreddit {
    fn kind() -> &'static EntityKind {
        &SUBREDDIT
    }

    fn from_entity(entity: LazyEntity) -> Self {
        Self { entity }
    }

    fn entity(&self) -> &LazyEntity {
        &self.entity
    }
}

impl ListItem for Subreddit {
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

impl Messageable for Subreddit {
    fn recipient(&self) -> ApiResult<String> {
        Ok(format!("/r/{}", self.display_name()?))
    }
}

impl Searchable for Subreddit {
    fn search_client(&self) -> &Client {
        self.client()
    }

    fn restrict_to(&self) -> ApiResult<Option<String>> {
        self.display_name().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::{FlairTarget, ModeratorListing, Relationship, Sort, SubmitOptions};
    use crate::api::{Model, Searchable, Submission};
    use crate::core::client::Params;
    use crate::core::entity::LazyEntity;
    use crate::core::error::ErrorKind;
    use crate::core::listing::Listing;
    use crate::core::stream::StreamOptions;
    use crate::test_support::MockTransport;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn page(children: Value, after: Value) -> Value {
        json!({"kind": "Listing", "data": {"children": children, "before": null, "after": after}})
    }

    #[test]
    fn about_is_fetched_lazily_once() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/about",
            json!({"kind": "t5", "data": {"display_name": "rust", "id": "2s7lj", "subscribers": 10}}),
        );
        let sub = mock.client().subreddit("rust");
        assert_eq!(sub.display_name().expect("name"), "rust");
        assert!(mock.calls().is_empty());

        assert_eq!(
            sub.get("subscribers").expect("subscribers").as_value(),
            Some(&json!(10))
        );
        assert_eq!(sub.fullname().expect("fullname").to_string(), "t5_2s7lj");
        assert_eq!(mock.calls_to("/r/rust/about"), 1);
    }

    #[test]
    fn listing_renames_time_param() {
        let mock = MockTransport::new();
        mock.respond_get("/r/rust/top", page(json!([]), Value::Null));
        let sub = mock.client().subreddit("rust");
        let mut params = Params::new();
        params.insert("time".to_string(), "week".to_string());
        let _: Listing<Submission> = sub.listing(Sort::Top, params).expect("listing");
        let call = &mock.calls()[0];
        assert_eq!(call.params.get("t").map(String::as_str), Some("week"));
        assert!(call.params.get("time").is_none());
    }

    #[test]
    fn typed_listing_rejects_foreign_kinds() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/hot",
            page(json!([{"kind": "t1", "data": {"id": "c1"}}]), Value::Null),
        );
        let err = mock
            .client()
            .subreddit("rust")
            .hot(Params::new())
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn moderator_listing_mixes_kinds() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/about/modqueue",
            page(
                json!([
                    {"kind": "t3", "data": {"id": "p1"}},
                    {"kind": "t1", "data": {"id": "c1"}}
                ]),
                Value::Null,
            ),
        );
        let listing: Listing<LazyEntity> = mock
            .client()
            .subreddit("rust")
            .moderator_listing(ModeratorListing::Modqueue, Params::new())
            .expect("listing");
        let kinds: Vec<_> = listing.iter().map(|item| item.kind().name).collect();
        assert_eq!(kinds, vec!["Submission", "Comment"]);
    }

    #[test]
    fn relationship_listing_returns_records() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/about/moderators",
            json!({"kind": "UserList", "data": {"children": [{"name": "alice", "id": "t2_1"}]}}),
        );
        let records = mock
            .client()
            .subreddit("rust")
            .relationship_listing(Relationship::Moderators, Params::new())
            .expect("records");
        assert_eq!(records, vec![json!({"name": "alice", "id": "t2_1"})]);
    }

    #[test]
    fn post_stream_polls_new_with_before_cursor() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/new",
            page(
                json!([
                    {"kind": "t3", "data": {"id": "b"}},
                    {"kind": "t3", "data": {"id": "a"}}
                ]),
                Value::Null,
            ),
        );
        mock.respond_get(
            "/r/rust/new",
            page(
                json!([
                    {"kind": "t3", "data": {"id": "c"}},
                    {"kind": "t3", "data": {"id": "b"}}
                ]),
                Value::Null,
            ),
        );
        let options = StreamOptions::new()
            .with_limit(10)
            .with_delays(Duration::ZERO, Duration::ZERO);
        let stream = mock
            .client()
            .subreddit("rust")
            .post_stream(options)
            .expect("stream")
            .with_sleeper(|_| {});
        let ids: Vec<String> = stream
            .take(3)
            .map(|post| post.expect("post").id().expect("id"))
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let calls = mock.calls();
        assert_eq!(calls[0].params.get("limit").map(String::as_str), Some("10"));
        assert_eq!(calls[0].params.get("before"), None);
        assert_eq!(calls[1].params.get("before").map(String::as_str), Some("t3_b"));
    }

    #[test]
    fn submit_prefers_url_and_wraps_result() {
        let mock = MockTransport::new();
        mock.respond_post(
            "/api/submit",
            json!({"json": {"errors": [], "data": {"id": "p9", "name": "t3_p9", "url": "https://x"}}}),
        );
        let sub = mock.client().subreddit("rust");
        let options = SubmitOptions {
            text: Some("ignored".to_string()),
            url: Some("https://example.com".to_string()),
            ..SubmitOptions::default()
        };
        let post = sub.submit("title", options).expect("submit");
        assert_eq!(post.id().expect("id"), "p9");

        let call = &mock.calls()[0];
        assert_eq!(call.params.get("kind").map(String::as_str), Some("link"));
        assert_eq!(call.params.get("sr").map(String::as_str), Some("rust"));
        assert!(call.params.get("text").is_none());
    }

    #[test]
    fn set_flair_keys_by_target_type() {
        let mock = MockTransport::new();
        mock.respond_post("/r/rust/api/flair", Value::Null);
        let client = mock.client();
        let sub = client.subreddit("rust");
        sub.set_flair(FlairTarget::User(&client.user("alice")), "crab", None)
            .expect("flair");
        sub.set_flair(
            FlairTarget::Submission(&client.submission("t3_p1")),
            "news",
            Some("blue"),
        )
        .expect("flair");
        let calls = mock.calls();
        assert_eq!(calls[0].params.get("name").map(String::as_str), Some("alice"));
        assert_eq!(calls[1].params.get("link").map(String::as_str), Some("t3_p1"));
        assert_eq!(calls[1].params.get("css_class").map(String::as_str), Some("blue"));
    }

    #[test]
    fn flair_listing_pages_with_next_cursor() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/api/flairlist",
            json!({"users": [{"user": "alice", "flair_text": "crab"}], "next": "t2_1", "prev": null}),
        );
        let listing = mock
            .client()
            .subreddit("rust")
            .flair_listing(Params::new())
            .expect("flairs");
        assert_eq!(listing.after(), Some("t2_1"));
        assert_eq!(
            listing.previous_page().expect_err("err").kind(),
            ErrorKind::NoMorePages
        );
        let _ = listing.next_page().expect("next");
        assert_eq!(
            mock.calls()[1].params.get("after").map(String::as_str),
            Some("t2_1")
        );
    }

    #[test]
    fn get_flair_matches_user_case_insensitively() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/api/flairlist",
            json!({"users": [{"user": "Alice", "flair_text": "crab"}]}),
        );
        let client = mock.client();
        let sub = client.subreddit("rust");
        let flair = sub.get_flair(&client.user("alice")).expect("flair");
        assert_eq!(flair.expect("some")["flair_text"], "crab");
        assert!(sub.get_flair(&client.user("bob")).expect("flair").is_none());
    }

    #[test]
    fn missing_stylesheet_is_none() {
        let mock = MockTransport::new();
        mock.fail_get("/r/rust/about/stylesheet", ErrorKind::NotFound);
        let sub = mock.client().subreddit("rust");
        assert_eq!(sub.stylesheet().expect("stylesheet"), None);

        let mock = MockTransport::new();
        mock.fail_get("/r/rust/about/stylesheet", ErrorKind::Server);
        let sub = mock.client().subreddit("rust");
        assert_eq!(sub.stylesheet().expect_err("err").kind(), ErrorKind::Server);
    }

    #[test]
    fn modify_settings_renames_keys() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/about",
            json!({"data": {"display_name": "rust", "name": "t5_2s7lj"}}),
        );
        mock.respond_get(
            "/r/rust/about/edit",
            json!({"data": {"subreddit_type": "public", "language": "en", "title": "Rust"}}),
        );
        mock.respond_post("/api/site_admin", Value::Null);
        let sub = mock.client().subreddit("rust");
        let mut changes = serde_json::Map::new();
        changes.insert("title".to_string(), json!("The Rust Language"));
        changes.insert("over_18".to_string(), json!(false));
        sub.modify_settings(changes).expect("modify");

        let call = mock
            .calls()
            .into_iter()
            .find(|call| call.path == "/api/site_admin")
            .expect("site_admin call");
        let get = |key: &str| call.params.get(key).map(String::as_str);
        assert_eq!(get("type"), Some("public"));
        assert_eq!(get("lang"), Some("en"));
        assert_eq!(get("title"), Some("The Rust Language"));
        assert_eq!(get("over_18"), Some("false"));
        assert_eq!(get("sr"), Some("t5_2s7lj"));
        assert_eq!(get("subreddit_type"), None);
    }

    #[test]
    fn search_is_restricted_to_subreddit() {
        let mock = MockTransport::new();
        mock.respond_get("/r/rust/search", page(json!([]), Value::Null));
        let sub = mock.client().subreddit("rust");
        let _ = sub.search("borrowck", Params::new()).expect("search");
        let call = &mock.calls()[0];
        assert_eq!(call.params.get("q").map(String::as_str), Some("borrowck"));
        assert_eq!(call.params.get("restrict_sr").map(String::as_str), Some("true"));
    }

    #[test]
    fn wiki_page_returns_page_data() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/wiki/faq",
            json!({"kind": "wikipage", "data": {"content_md": "# FAQ", "may_revise": false}}),
        );
        let page = mock.client().subreddit("rust").wiki_page("faq").expect("page");
        assert_eq!(page.get("content_md"), Some(&json!("# FAQ")));

        let err = mock
            .client()
            .subreddit("rust")
            .wiki_page("missing")
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn wiki_pages_reads_string_array() {
        let mock = MockTransport::new();
        mock.respond_get(
            "/r/rust/wiki/pages",
            json!({"kind": "wikipagelisting", "data": ["index", "faq"]}),
        );
        let pages = mock.client().subreddit("rust").wiki_pages().expect("pages");
        assert_eq!(pages, vec!["index", "faq"]);
    }
}
