//! Insertion, keys and pruning for the time-bucketed trie

use super::MerkleNode;
use crate::model::Timestamp;
use std::sync::Arc;

/// Width of a bucket in milliseconds (one minute)
pub const BUCKET_MILLIS: u64 = 60_000;

/// Number of base-3 digits in a bucket key
pub const KEY_DIGITS: usize = 16;

/// Default number of children kept per level by [`MerkleNode::prune`]
pub const DEFAULT_PRUNE_KEEP: usize = 2;

/// The trie path for a timestamp: base-3 digits of its minute
///
/// Keys are left padded to [`KEY_DIGITS`] digits. Every minute between 1997
/// and 2052 already has exactly 16 digits, so padding only matters for
/// earlier times, where it keeps the decoded fork point a lower bound.
pub fn key_for(millis: u64) -> Vec<u8> {
    let mut minutes = millis / BUCKET_MILLIS;
    let mut digits = Vec::with_capacity(KEY_DIGITS);
    while minutes > 0 {
        digits.push((minutes % 3) as u8);
        minutes /= 3;
    }
    digits.resize(digits.len().max(KEY_DIGITS), 0);
    digits.reverse();
    digits
}

/// Decode a (possibly partial) trie path back into milliseconds
///
/// The path is right padded with `0` digits to full key length, which yields
/// the start of the earliest bucket under that prefix. Digits past
/// [`KEY_DIGITS`] are ignored.
pub fn key_to_millis(path: &[u8]) -> u64 {
    let minutes = path
        .iter()
        .copied()
        .chain(std::iter::repeat(0))
        .take(KEY_DIGITS)
        .fold(0u64, |acc, d| acc.saturating_mul(3).saturating_add(u64::from(d)));
    minutes.saturating_mul(BUCKET_MILLIS)
}

impl MerkleNode {
    /// Return a new trie with `timestamp` folded in
    ///
    /// `self` is left untouched and keeps sharing every subtree off the
    /// insertion path with the result. Inserting the same timestamp twice
    /// cancels out (XOR), so callers must only insert new messages.
    pub fn insert(&self, timestamp: &Timestamp) -> MerkleNode {
        insert_path(self, &key_for(timestamp.millis()), timestamp.hash())
    }

    /// Build a trie from scratch
    pub fn build<'a>(timestamps: impl IntoIterator<Item = &'a Timestamp>) -> MerkleNode {
        timestamps
            .into_iter()
            .fold(MerkleNode::empty(), |trie, ts| trie.insert(ts))
    }

    /// Keep only the `keep` most recent (highest) children at every level
    ///
    /// Hashes are unchanged, so a pruned trie still answers "do we agree";
    /// diffs against it may just report an earlier fork point.
    pub fn prune(&self, keep: usize) -> MerkleNode {
        if self.hash == 0 {
            return self.clone();
        }
        let digits: Vec<u8> = self.digits().collect();
        let skip = digits.len().saturating_sub(keep);

        let mut pruned = MerkleNode {
            hash: self.hash,
            children: Default::default(),
        };
        for digit in digits.into_iter().skip(skip) {
            if let Some(child) = self.child(digit) {
                pruned.children[digit as usize] = Some(Arc::new(child.prune(keep)));
            }
        }
        pruned
    }
}

fn insert_path(node: &MerkleNode, key: &[u8], hash: i32) -> MerkleNode {
    let mut next = MerkleNode {
        hash: node.hash ^ hash,
        children: node.children.clone(),
    };
    if let Some((&digit, rest)) = key.split_first() {
        let empty = MerkleNode::empty();
        let child = node.child(digit).unwrap_or(&empty);
        next.children[digit as usize] = Some(Arc::new(insert_path(child, rest, hash)));
    }
    next
}
