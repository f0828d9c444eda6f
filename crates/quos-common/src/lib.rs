//! Shared domain types for the quos incident pipeline.
//!
//! Every crate in the workspace speaks these enums and payload structs; the
//! wire representation (HTTP bodies, outbox payloads, database columns) is
//! the SCREAMING_SNAKE form produced by `Display` and accepted by `FromStr`.

pub mod events;
pub mod types;
