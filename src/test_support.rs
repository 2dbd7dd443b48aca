// Recording in-memory transport for unit tests.
use crate::core::client::{ApiResult, Client, Params, Response, Transport};
use crate::core::error::{Error, ErrorKind};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Call {
    pub method: &'static str,
    pub path: String,
    pub params: Params,
}

type Reply = Result<Value, ErrorKind>;

#[derive(Default)]
struct MockState {
    replies: HashMap<(&'static str, String), VecDeque<Reply>>,
    calls: Vec<Call>,
}

/// Replies are queued per route; the last queued reply repeats.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn client(&self) -> Client {
        Client::new(self.clone())
    }

    pub(crate) fn respond_get(&self, path: &str, body: Value) {
        self.push("GET", path, Ok(body));
    }

    pub(crate) fn respond_post(&self, path: &str, body: Value) {
        self.push("POST", path, Ok(body));
    }

    pub(crate) fn fail_get(&self, path: &str, kind: ErrorKind) {
        self.push("GET", path, Err(kind));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.path == path)
            .count()
    }

    fn push(&self, method: &'static str, path: &str, reply: Reply) {
        self.state
            .borrow_mut()
            .replies
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    fn reply(&self, method: &'static str, path: &str, params: &Params) -> ApiResult<Response> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call {
            method,
            path: path.to_string(),
            params: params.clone(),
        });
        let queue = state.replies.get_mut(&(method, path.to_string()));
        let reply = match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match reply {
            Some(Ok(body)) => Ok(Response {
                status: 200,
                headers: Vec::new(),
                body,
            }),
            Some(Err(kind)) => Err(Error::new(kind).with_path(path)),
            None => Err(Error::new(ErrorKind::NotFound)
                .with_message("no mock reply")
                .with_path(path)),
        }
    }
}

impl Transport for MockTransport {
    fn get(&self, path: &str, params: &Params) -> ApiResult<Response> {
        self.reply("GET", path, params)
    }

    fn post(&self, path: &str, params: &Params) -> ApiResult<Response> {
        self.reply("POST", path, params)
    }
}
