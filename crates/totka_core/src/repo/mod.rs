//! Persistence layer: a string-keyed document store and typed helpers.
//!
//! # Responsibility
//! - Own the two top-level documents (medicine list, history log).
//! - Keep SQL and JSON encoding out of the service layer.
//!
//! # Invariants
//! - A write replaces the whole document for its key.
//! - Read failures degrade to empty documents; write failures are returned.

pub mod document;
pub mod kv_store;
