//! Purpose: Define the public surface for reddit entities and the HTTP transport.
//! Exports: Entity types, capabilities, `HttpTransport`, and the core types callers need.
//! Role: Public, additive-only surface; entity modules stay private behind re-exports.
//! Invariants: Every `Client` built here unmarshals the four known thing kinds.

mod capability;
mod comment;
mod model;
mod remote;
mod submission;
mod subreddit;
mod user;

pub use crate::core::client::{ApiResult, Client, Params, Response, Transport};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::entity::{Attr, LazyEntity};
pub use crate::core::error::{Error, ErrorKind, OptionalExt};
pub use crate::core::fullname::Fullname;
pub use crate::core::listing::{ListItem, Listing};
pub use crate::core::stream::{Stream, StreamOptions};
pub use capability::{
    Distinguish, Inboxable, Messageable, Moderatable, Postable, Replyable, Searchable,
};
pub use comment::{COMMENT, Comment};
pub use model::Model;
pub use remote::{DEFAULT_BASE_URL, HttpTransport, OAUTH_BASE_URL};
pub use submission::{SUBMISSION, Submission};
pub use subreddit::{
    FlairTarget, ModeratorListing, Relationship, SUBREDDIT, Sort, SubmitOptions, Subreddit,
};
pub use user::{USER, User, UserListing};
