//! Trie node type and its wire format

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Digit keys as they appear on the wire
const DIGIT_KEYS: [&str; 3] = ["0", "1", "2"];

/// A node in the base-3 merkle trie
///
/// `hash` is the XOR of the hashes of every timestamp inserted through this
/// node. Children are shared between snapshots: inserting builds new nodes
/// along one path and reuses every other subtree.
///
/// Wire format (JSON):
/// ```text
/// { "0": { ... }, "2": { ... }, "hash": -1234567 }
/// ```
/// Absent digits are absent keys; `{}` is the empty trie.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleNode {
    pub(crate) hash: i32,
    pub(crate) children: [Option<Arc<MerkleNode>>; 3],
}

impl MerkleNode {
    /// The empty trie (hash 0, no children)
    pub fn empty() -> Self {
        MerkleNode::default()
    }

    pub fn hash(&self) -> i32 {
        self.hash
    }

    /// Child under `digit` (0, 1 or 2)
    pub fn child(&self, digit: u8) -> Option<&MerkleNode> {
        self.children.get(digit as usize)?.as_deref()
    }

    /// Hash of the child under `digit`; an absent child hashes to 0
    pub fn child_hash(&self, digit: u8) -> i32 {
        self.child(digit).map_or(0, |c| c.hash)
    }

    /// Digits that have a child, ascending
    pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        (0..3u8).filter(move |d| self.children[*d as usize].is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.hash == 0 && self.children.iter().all(Option::is_none)
    }

    /// Length of the longest path below this node
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .flatten()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.node_count())
            .sum::<usize>()
    }
}

impl Serialize for MerkleNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.digits().count() + 1;
        let mut map = serializer.serialize_map(Some(len))?;
        for digit in self.digits() {
            if let Some(child) = self.child(digit) {
                map.serialize_entry(DIGIT_KEYS[digit as usize], child)?;
            }
        }
        map.serialize_entry("hash", &self.hash)?;
        map.end()
    }
}

#[derive(Deserialize)]
struct WireNode {
    #[serde(rename = "0", default)]
    zero: Option<MerkleNode>,
    #[serde(rename = "1", default)]
    one: Option<MerkleNode>,
    #[serde(rename = "2", default)]
    two: Option<MerkleNode>,
    #[serde(default, deserialize_with = "deserialize_hash")]
    hash: i32,
}

/// Accept both signed and unsigned 32-bit renderings of the same bits
fn deserialize_hash<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let n = i64::deserialize(deserializer)?;
    if let Ok(h) = i32::try_from(n) {
        return Ok(h);
    }
    u32::try_from(n)
        .map(|h| h as i32)
        .map_err(|_| de::Error::custom(format!("merkle hash {} is not a 32-bit integer", n)))
}

impl<'de> Deserialize<'de> for MerkleNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireNode::deserialize(deserializer)?;
        Ok(MerkleNode {
            hash: wire.hash,
            children: [
                wire.zero.map(Arc::new),
                wire.one.map(Arc::new),
                wire.two.map(Arc::new),
            ],
        })
    }
}
