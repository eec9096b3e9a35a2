//! # hlc_relay
//!
//! Causality tracking and cheap set reconciliation for offline-first sync.
//!
//! Clients keep an append-only log of cell writes and exchange it with a
//! central relay. Instead of shipping the whole log on every sync, both sides
//! keep a merkle trie of their message timestamps and use it to find the
//! point where their histories forked.
//!
//! ## Core Concepts
//!
//! - **Timestamps**: Hybrid logical clock values; unique, causally ordered
//! - **Clock**: One per node; stamps local writes, merges remote ones
//! - **Merkle trie**: Base-3 trie of per-minute XOR hashes
//! - **Relay**: Idempotent, transactional log plus one trie per group
//!
//! ## Example
//!
//! ```ignore
//! use hlc_relay::{Clock, MessageStore, Replica, SyncEndpoint};
//! use std::sync::Arc;
//!
//! let relay = SyncEndpoint::new(Arc::new(MessageStore::open("relay.db")?));
//! let mut replica = Replica::new("my-group", Clock::new("a1b2c3d4e5f60718")?);
//! replica.record("todos", "t1", "title", "buy milk")?;
//! replica.sync_with(|req| relay.handle(req))?;
//! ```

pub mod clock;
pub mod config;
pub mod model;
pub mod ops;
pub mod relay;
pub mod remote;
pub mod replica;
pub mod store;
pub mod trie;

mod error;

pub use clock::{Clock, ClockConfig, ManualTimeSource, SystemTimeSource, TimeSource};
pub use config::RelayConfig;
pub use error::{Error, Result};
pub use model::{Message, Timestamp, Value, WireMessage};
pub use ops::diff;
pub use relay::{Envelope, SyncEndpoint, SyncRequest, SyncResponse};
pub use remote::{SyncClient, SyncConfig, DEFAULT_RELAY_URL};
pub use replica::Replica;
pub use store::MessageStore;
pub use trie::MerkleNode;
