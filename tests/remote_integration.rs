//! Purpose: End-to-end tests for `HttpTransport` against an in-process fake API.
//! Exports: None (integration test module).
//! Role: Validate lazy fetches, paging, streams, and status mapping across TCP.
//! Invariants: The fake API binds loopback port 0; no external network access.
//! Invariants: Stream tests use a no-op sleeper so no test waits on wall-clock delay.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::{Json, body::Bytes};
use redd::api::{
    Client, ErrorKind, HttpTransport, Messageable, Model, Params, StreamOptions, SubmitOptions,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Clone, Debug)]
struct Seen {
    method: String,
    path: String,
    query: BTreeMap<String, String>,
    form: BTreeMap<String, String>,
    user_agent: Option<String>,
    authorization: Option<String>,
}

#[derive(Clone, Default)]
struct FakeState {
    requests: Arc<Mutex<Vec<Seen>>>,
}

struct FakeApi {
    base_url: String,
    state: FakeState,
}

impl FakeApi {
    fn start() -> TestResult<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let state = FakeState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
                axum::serve(listener, app).await.expect("serve");
            });
        });
        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
        })
    }

    /// Public-style transport: `.json` paths, no token.
    fn client(&self) -> TestResult<Client> {
        let transport = HttpTransport::new(self.base_url.clone())?
            .with_json_suffix(true)
            .with_user_agent("redd-tests/1.0")
            .with_timeout(Duration::from_secs(5));
        Ok(Client::new(transport))
    }

    fn requests(&self) -> Vec<Seen> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    fn requests_to(&self, path: &str) -> Vec<Seen> {
        self.requests()
            .into_iter()
            .filter(|seen| seen.path == path)
            .collect()
    }
}

fn parse_pairs(raw: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(raw)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

async fn handle(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let seen = Seen {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: parse_pairs(uri.query().unwrap_or("").as_bytes()),
        form: parse_pairs(&body),
        user_agent: header("user-agent"),
        authorization: header("authorization"),
    };
    let (status, body) = route(&seen);
    state
        .requests
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .push(seen);
    (status, Json(body)).into_response()
}

fn post(id: &str, title: &str) -> Value {
    json!({"kind": "t3", "data": {
        "id": id, "name": format!("t3_{id}"), "title": title,
        "author": "alice", "subreddit": "rust"
    }})
}

fn page(children: Vec<Value>, after: Option<&str>) -> Value {
    json!({"kind": "Listing", "data": {"children": children, "before": null, "after": after}})
}

fn route(seen: &Seen) -> (StatusCode, Value) {
    let query = |key: &str| seen.query.get(key).map(String::as_str);
    match (seen.method.as_str(), seen.path.as_str()) {
        ("GET", "/r/rust/about.json") => (
            StatusCode::OK,
            json!({"kind": "t5", "data": {
                "display_name": "rust", "id": "2s7lj", "name": "t5_2s7lj",
                "title": "The Rust Programming Language", "subscribers": 300000
            }}),
        ),
        ("GET", "/r/missing/about.json") => (
            StatusCode::NOT_FOUND,
            json!({"message": "Not Found", "error": 404}),
        ),
        ("GET", "/r/busy/about.json") => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"message": "Service Unavailable"}),
        ),
        ("GET", "/r/slow/about.json") => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({"message": "Too Many Requests", "error": 429}),
        ),
        ("GET", "/r/rust/about/stylesheet.json") => {
            (StatusCode::NOT_FOUND, json!({"error": 404}))
        }
        ("GET", "/r/rust/new.json") => {
            let body = match (query("before"), query("after")) {
                (Some("t3_p2"), _) => page(vec![post("p3", "third"), post("p2", "second")], None),
                (Some(_), _) => page(vec![], None),
                (None, Some("t3_p1")) => page(vec![post("p0", "zeroth")], None),
                (None, _) => page(
                    vec![post("p2", "second"), post("p1", "first")],
                    Some("t3_p1"),
                ),
            };
            (StatusCode::OK, body)
        }
        ("GET", "/comments/p1.json") => (
            StatusCode::OK,
            json!([
                page(vec![post("p1", "first")], None),
                page(
                    vec![
                        json!({"kind": "t1", "data": {"id": "c1", "body": "nice", "replies": ""}}),
                        json!({"kind": "more", "data": {"count": 7, "children": ["c2"]}}),
                    ],
                    None,
                ),
            ]),
        ),
        ("GET", "/user/alice/about") => match seen.authorization.as_deref() {
            Some("Bearer secret") => (
                StatusCode::OK,
                json!({"kind": "t2", "data": {"name": "alice", "id": "u1", "link_karma": 42}}),
            ),
            _ => (StatusCode::UNAUTHORIZED, json!({"message": "Unauthorized"})),
        },
        ("POST", "/api/compose.json") => (StatusCode::OK, json!({"json": {"errors": []}})),
        ("POST", "/api/submit.json") => (
            StatusCode::OK,
            json!({"json": {"errors": [
                ["RATELIMIT", "you are doing that too much", "ratelimit"]
            ]}}),
        ),
        _ => (StatusCode::NOT_FOUND, json!({"error": 404})),
    }
}

#[test]
fn subreddit_about_is_fetched_once_on_first_missing_field() -> TestResult<()> {
    let api = FakeApi::start()?;
    let client = api.client()?;
    let sub = client.subreddit("rust");
    assert_eq!(sub.display_name()?, "rust");
    assert!(api.requests().is_empty());

    let subscribers = sub.get("subscribers")?;
    assert_eq!(subscribers.as_value(), Some(&json!(300000)));
    assert_eq!(sub.get_str("title")?, "The Rust Programming Language");
    assert_eq!(sub.fullname()?.to_string(), "t5_2s7lj");

    let requests = api.requests_to("/r/rust/about.json");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_agent.as_deref(), Some("redd-tests/1.0"));
    assert_eq!(requests[0].query.get("raw_json").map(String::as_str), Some("1"));
    Ok(())
}

#[test]
fn listing_pages_forward_through_after_cursor() -> TestResult<()> {
    let api = FakeApi::start()?;
    let client = api.client()?;
    let mut params = Params::new();
    params.insert("limit".to_string(), "2".to_string());
    let first = client.subreddit("rust").new_posts(params)?;
    let ids: Vec<String> = first.iter().map(|post| post.id()).collect::<Result<_, _>>()?;
    assert_eq!(ids, vec!["p2", "p1"]);
    assert_eq!(first.previous_page().err().map(|err| err.kind()), Some(ErrorKind::NoMorePages));

    let second = first.next_page()?;
    assert_eq!(second.len(), 1);
    assert_eq!(second.first().map(|post| post.title()).transpose()?.as_deref(), Some("zeroth"));
    assert_eq!(second.next_page().err().map(|err| err.kind()), Some(ErrorKind::NoMorePages));

    let requests = api.requests_to("/r/rust/new.json");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].query.get("after").map(String::as_str), Some("t3_p1"));
    assert_eq!(requests[1].query.get("limit").map(String::as_str), Some("2"));
    Ok(())
}

#[test]
fn post_stream_yields_each_post_once_oldest_first() -> TestResult<()> {
    let api = FakeApi::start()?;
    let client = api.client()?;
    let options = StreamOptions::new()
        .with_limit(2)
        .with_delays(Duration::ZERO, Duration::ZERO);
    let stream = client
        .subreddit("rust")
        .post_stream(options)?
        .with_sleeper(|_| {});
    let titles: Vec<String> = stream
        .take(3)
        .map(|post| post.and_then(|post| post.title()))
        .collect::<Result<_, _>>()?;
    assert_eq!(titles, vec!["first", "second", "third"]);

    let requests = api.requests_to("/r/rust/new.json");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].query.get("before"), None);
    assert_eq!(requests[1].query.get("before").map(String::as_str), Some("t3_p2"));
    assert_eq!(requests[1].query.get("limit").map(String::as_str), Some("2"));
    Ok(())
}

#[test]
fn http_statuses_map_to_error_kinds() -> TestResult<()> {
    let api = FakeApi::start()?;
    let client = api.client()?;

    let err = client.subreddit("missing").get("title").expect_err("not found");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status(), Some(404));
    assert!(err.message().unwrap_or_default().contains("Not Found"));

    let err = client.subreddit("busy").get("title").expect_err("server");
    assert_eq!(err.kind(), ErrorKind::Server);
    let err = client.subreddit("slow").get("title").expect_err("rate limited");
    assert_eq!(err.kind(), ErrorKind::RateLimited);

    assert_eq!(client.subreddit("rust").stylesheet()?, None);
    Ok(())
}

#[test]
fn bearer_token_is_sent_on_plain_paths() -> TestResult<()> {
    let api = FakeApi::start()?;
    let transport = HttpTransport::new(api.base_url.clone())?.with_token("secret");
    let client = Client::new(transport);
    let karma = client.user("alice").get("link_karma")?;
    assert_eq!(karma.as_value(), Some(&json!(42)));

    let anonymous = Client::new(HttpTransport::new(api.base_url.clone())?);
    let err = anonymous.user("alice").get("link_karma").expect_err("unauthorized");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let requests = api.requests_to("/user/alice/about");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer secret"));
    assert_eq!(requests[1].authorization, None);
    Ok(())
}

#[test]
fn posts_send_form_bodies_and_surface_api_errors() -> TestResult<()> {
    let api = FakeApi::start()?;
    let client = api.client()?;
    client.user("bob").send_message("hello", "hi bob", None)?;

    let compose = api.requests_to("/api/compose.json");
    assert_eq!(compose.len(), 1);
    assert_eq!(compose[0].method, "POST");
    assert_eq!(compose[0].form.get("to").map(String::as_str), Some("bob"));
    assert_eq!(compose[0].form.get("subject").map(String::as_str), Some("hello"));
    assert_eq!(compose[0].form.get("api_type").map(String::as_str), Some("json"));

    let options = SubmitOptions {
        text: Some("body".to_string()),
        ..SubmitOptions::default()
    };
    let err = client
        .subreddit("rust")
        .submit("title", options)
        .expect_err("ratelimited");
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(err.to_string().contains("RATELIMIT"));
    Ok(())
}

#[test]
fn submission_resolves_from_thread_and_lists_comments() -> TestResult<()> {
    let api = FakeApi::start()?;
    let client = api.client()?;
    let post = client.submission("t3_p1");
    assert_eq!(post.title()?, "first");
    let author = post.author()?.expect("author");
    assert_eq!(author.name()?, "alice");

    let comments = post.comments(Params::new())?;
    let kinds: Vec<&str> = comments.iter().map(|item| item.kind().name).collect();
    assert_eq!(kinds, vec!["Comment", "Basic"]);
    let wire: Vec<&str> = comments.iter().map(|item| item.thing_kind()).collect();
    assert_eq!(wire, vec!["t1", "more"]);
    assert_eq!(api.requests_to("/comments/p1.json").len(), 2);
    Ok(())
}
