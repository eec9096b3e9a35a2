//! Merkle trie over time buckets
//!
//! This implements a base-3 prefix tree where:
//! - The path to a leaf is the base-3 rendering of a timestamp's minute
//! - Each node's hash is the XOR of the hashes of all timestamps below it
//! - Unchanged subtrees are shared between snapshots
//!
//! XOR makes the hash independent of insertion order, so two replicas holding
//! the same set of messages always end up with identical tries.

mod node;
mod tree;

pub use node::MerkleNode;
pub use tree::{key_for, key_to_millis, BUCKET_MILLIS, DEFAULT_PRUNE_KEEP, KEY_DIGITS};
