//! Persistent message log
//!
//! This module implements the relay's storage layer: an append-only,
//! timestamp-keyed message table plus one merkle trie per group, kept in a
//! single SQLite database.

mod message_store;
mod tagged;

pub use message_store::MessageStore;
pub use tagged::{decode_value, encode_value, ValueTag};
