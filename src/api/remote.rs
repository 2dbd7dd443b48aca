//! Purpose: Blocking HTTP transport for the reddit REST API.
//! Exports: `HttpTransport`.
//! Role: `Transport` implementation backed by a shared `ureq::Agent`.
//! Invariants: Base URLs are origin-only (http/https); paths come from callers.
//! Invariants: Non-2xx statuses map to `ErrorKind` here; callers never see raw statuses.
//! Invariants: GET params go to the query string, POST params to a form body.
#![allow(clippy::result_large_err)]

use crate::core::client::{ApiResult, Params, Response, Transport};
use crate::core::error::{Error, ErrorKind};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";

#[derive(Clone, Debug)]
pub struct HttpTransport {
    base_url: Url,
    token: Option<String>,
    user_agent: String,
    json_suffix: bool,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    reason: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            token: None,
            user_agent: default_user_agent(),
            json_suffix: false,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    /// Send a pre-obtained bearer token with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Append `.json` to request paths, as the public www endpoints require.
    pub fn with_json_suffix(mut self, enabled: bool) -> Self {
        self.json_suffix = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::AgentBuilder::new().timeout(timeout).build();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> ApiResult<Url> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("request path is empty")
                .with_path(path));
        }
        let mut url = self.base_url.clone();
        {
            let mut out = url.path_segments_mut().map_err(|_| {
                Error::new(ErrorKind::Usage).with_message("base url cannot be a base")
            })?;
            out.clear();
            let last = segments.len() - 1;
            for (index, segment) in segments.iter().enumerate() {
                if index == last && self.json_suffix {
                    out.push(&format!("{segment}.json"));
                } else {
                    out.push(segment);
                }
            }
        }
        Ok(url)
    }

    fn send(&self, method: &str, path: &str, params: &Params) -> ApiResult<Response> {
        let url = self.url_for(path)?;
        debug!(method, path, params = params.len(), "api request");

        let mut request = self
            .agent
            .request(method, url.as_str())
            .set("User-Agent", &self.user_agent)
            .set("Accept", "application/json")
            .query("raw_json", "1");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = if method == "GET" {
            for (key, value) in params {
                request = request.query(key, value);
            }
            request.call()
        } else {
            let form: Vec<(&str, &str)> = params
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect();
            request.send_form(&form)
        };

        match response {
            Ok(resp) => read_response(resp, path),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp, path)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_path(path)
                .with_source(err)),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, params: &Params) -> ApiResult<Response> {
        self.send("GET", path, params)
    }

    fn post(&self, path: &str, params: &Params) -> ApiResult<Response> {
        self.send("POST", path, params)
    }
}

fn default_user_agent() -> String {
    format!("redd/{}", env!("CARGO_PKG_VERSION"))
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("base url must use http or https scheme")
        );
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("base url must not include a path"));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn read_response(response: ureq::Response, path: &str) -> ApiResult<Response> {
    let status = response.status();
    let headers = response
        .headers_names()
        .into_iter()
        .filter_map(|name| {
            let value = response.header(&name)?.to_string();
            Some((name, value))
        })
        .collect();
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_path(path)
            .with_source(err)
    })?;
    let body = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).map_err(|err| {
            Error::new(ErrorKind::Decode)
                .with_message("invalid response json")
                .with_path(path)
                .with_source(err)
        })?
    };
    Ok(Response {
        status,
        headers,
        body,
    })
}

fn parse_error_response(status: u16, response: ureq::Response, path: &str) -> Error {
    let body = response.into_string().unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| body.message.or(body.reason));
    let message = match detail {
        Some(detail) => format!("remote error status {status}: {detail}"),
        None => format!("remote error status {status}"),
    };
    Error::new(error_kind_from_status(status))
        .with_message(message)
        .with_status(status)
        .with_path(path)
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 | 422 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Io,
    }
}
