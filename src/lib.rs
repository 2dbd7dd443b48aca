//! Purpose: Typed, lazily-resolved handles over the reddit REST API.
//! Exports: `core` (resolution engine, listings, streams, errors) and `api`
//! Exports: (HTTP transport, concrete entity types, capabilities).
//! Role: Library backing the `redd` CLI.
//! Invariants: Single-threaded; handles are `Rc`-shared and never cross threads.
//! Invariants: No call performs I/O until a missing attribute or a page is requested.
pub mod api;
pub mod core;

#[cfg(test)]
pub(crate) mod test_support;
