// Resolution and pagination engine: lazy entities, coercion, listings, streams.
pub mod attributes;
pub mod client;
pub mod coerce;
pub mod entity;
pub mod error;
pub mod fullname;
pub mod listing;
pub mod stream;
