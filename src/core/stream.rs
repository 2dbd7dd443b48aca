//! Purpose: Present a listing endpoint as an endless feed of newly appeared items.
//! Exports: `StreamOptions`, `SeenSet`, `Stream`.
//! Role: Repeated `Listing` polling with duplicate suppression and adaptive delay.
//! Invariants: Items are yielded oldest-to-newest within each poll, never twice.
//! Invariants: The seen set is bounded; memory does not grow with stream lifetime.
//! Invariants: Empty polls never shorten the delay; a productive poll resets it.
#![allow(clippy::result_large_err)]

use crate::core::client::ApiResult;
use crate::core::listing::{ListItem, Listing};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::trace;

#[derive(Clone, Debug)]
pub struct StreamOptions {
    /// Target page size requested per poll.
    pub limit: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Delay multiplier applied after a poll with no new items.
    pub backoff: u32,
    /// Seen-set bound; `None` means four pages' worth. Never below one page.
    pub seen_capacity: Option<usize>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self {
            limit: 100,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(32),
            backoff: 2,
            seen_capacity: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    fn seen_capacity(&self) -> usize {
        self.seen_capacity
            .unwrap_or_else(|| self.limit.saturating_mul(4))
            .max(self.limit)
            .max(1)
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion-ordered set that evicts its oldest entry once full.
#[derive(Clone, Debug)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let reserve = capacity.min(1024);
        Self {
            order: VecDeque::with_capacity(reserve),
            members: HashSet::with_capacity(reserve),
            capacity,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    /// Returns false when `key` was already present.
    pub fn insert(&mut self, key: String) -> bool {
        if self.members.contains(&key) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        self.members.insert(key.clone());
        self.order.push_back(key);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

type PageRequest<T> = dyn FnMut(Option<&str>) -> ApiResult<Listing<T>>;

pub struct Stream<T> {
    request: Box<PageRequest<T>>,
    options: StreamOptions,
    seen: SeenSet,
    before: Option<String>,
    delay: Duration,
    pending: VecDeque<T>,
    polled: bool,
    sleep: Box<dyn FnMut(Duration)>,
}

impl<T: ListItem> Stream<T> {
    /// `request(before)` returns the page of items newer than `before`
    /// (the most recent page when `None`).
    pub fn new<F>(options: StreamOptions, request: F) -> Self
    where
        F: FnMut(Option<&str>) -> ApiResult<Listing<T>> + 'static,
    {
        let mut options = options;
        if options.max_delay < options.min_delay {
            options.max_delay = options.min_delay;
        }
        let seen = SeenSet::new(options.seen_capacity());
        let delay = options.min_delay;
        Self {
            request: Box::new(request),
            options,
            seen,
            before: None,
            delay,
            pending: VecDeque::new(),
            polled: false,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the inter-poll wait (defaults to `std::thread::sleep`).
    pub fn with_sleeper<S>(mut self, sleep: S) -> Self
    where
        S: FnMut(Duration) + 'static,
    {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn cursor(&self) -> Option<&str> {
        self.before.as_deref()
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Run one poll and queue its unseen items; returns how many were queued.
    pub fn poll(&mut self) -> ApiResult<usize> {
        self.polled = true;
        let listing = (self.request)(self.before.as_deref())?;

        if listing.is_empty() {
            // The anchor item may have been removed, which would pin every
            // later `before` page to empty; fall back to the newest page.
            self.before = None;
            self.back_off();
            trace!(delay_ms = self.delay.as_millis() as u64, "stream poll empty");
            return Ok(0);
        }

        let newest = listing.first().and_then(ListItem::stream_key);
        let mut fresh = 0;
        for item in listing.into_items().into_iter().rev() {
            // Keyless items are identified by their full contents.
            let key = item
                .stream_key()
                .unwrap_or_else(|| item.to_json().to_string());
            if !self.seen.insert(key) {
                continue;
            }
            self.pending.push_back(item);
            fresh += 1;
        }
        if newest.is_some() {
            self.before = newest;
        }

        if fresh == 0 {
            self.back_off();
        } else {
            self.delay = self.options.min_delay;
        }
        trace!(
            fresh,
            delay_ms = self.delay.as_millis() as u64,
            "stream poll"
        );
        Ok(fresh)
    }

    /// Block until the next new item is available.
    pub fn next_item(&mut self) -> ApiResult<T> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(item);
            }
            if self.polled {
                (self.sleep)(self.delay);
            }
            self.poll()?;
        }
    }

    fn back_off(&mut self) {
        let next = self.delay.saturating_mul(self.options.backoff.max(1));
        self.delay = next.min(self.options.max_delay);
    }
}

/// Never ends; transport failures surface as `Some(Err(_))` and the next call polls again.
impl<T: ListItem> Iterator for Stream<T> {
    type Item = ApiResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_item())
    }
}
