//! Fork-point discovery between two tries

use crate::trie::{key_to_millis, MerkleNode};

/// Find the earliest time at which two tries may disagree
///
/// Returns `None` when the root hashes match. Otherwise walks down from the
/// root, always following the lowest digit whose child hashes differ (an
/// absent child counts as hash 0), until it reaches a level where every
/// digit agrees. The path walked so far is decoded into milliseconds.
///
/// The result is a lower bound: everything either side is missing was
/// stamped at or after it. Resending from there may duplicate messages the
/// other side already has, which is harmless because inserts are idempotent.
pub fn diff(left: &MerkleNode, right: &MerkleNode) -> Option<u64> {
    if left.hash() == right.hash() {
        return None;
    }

    let empty = MerkleNode::empty();
    let mut left = left;
    let mut right = right;
    let mut path = Vec::new();

    loop {
        let diverging = (0..3u8).find(|d| left.child_hash(*d) != right.child_hash(*d));
        match diverging {
            Some(digit) => {
                path.push(digit);
                left = left.child(digit).unwrap_or(&empty);
                right = right.child(digit).unwrap_or(&empty);
            }
            None => return Some(key_to_millis(&path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use crate::trie::BUCKET_MILLIS;

    const NODE_A: &str = "aaaaaaaaaaaaaa01";
    const NODE_B: &str = "bbbbbbbbbbbbbb02";
    const T0: u64 = 1_709_296_245_123;

    fn floor_minute(millis: u64) -> u64 {
        millis / BUCKET_MILLIS * BUCKET_MILLIS
    }

    #[test]
    fn test_diff_identical_is_none() {
        let trie = MerkleNode::build(&[
            Timestamp::new(T0, 0, NODE_A),
            Timestamp::new(T0 + 300_000, 2, NODE_B),
        ]);
        assert_eq!(diff(&trie, &trie), None);
        assert_eq!(diff(&MerkleNode::empty(), &MerkleNode::empty()), None);
    }

    #[test]
    fn test_diff_against_empty_finds_earliest_message() {
        let t1 = Timestamp::new(T0, 0, NODE_A);
        let t2 = Timestamp::new(T0 + 3_600_000, 0, NODE_A);
        let trie = MerkleNode::build(&[t1.clone(), t2]);
        let fork = diff(&trie, &MerkleNode::empty()).unwrap();
        assert!(fork <= floor_minute(t1.millis()));
    }

    #[test]
    fn test_diff_finds_missing_recent_message() {
        let shared = vec![
            Timestamp::new(T0, 0, NODE_A),
            Timestamp::new(T0 + 60_000, 0, NODE_B),
        ];
        let extra = Timestamp::new(T0 + 7_200_000, 0, NODE_A);

        let mut with_extra = shared.clone();
        with_extra.push(extra.clone());
        let a = MerkleNode::build(&shared);
        let b = MerkleNode::build(&with_extra);

        let fork = diff(&a, &b).unwrap();
        assert!(fork <= extra.millis());
        // the shared history before the fork does not need resending
        assert!(fork > T0 + 60_000);
        assert_eq!(fork, floor_minute(extra.millis()));
    }

    #[test]
    fn test_diff_symmetric_for_same_keys() {
        let a = MerkleNode::build(&[
            Timestamp::new(T0, 0, NODE_A),
            Timestamp::new(T0 + 120_000, 0, NODE_A),
        ]);
        let b = MerkleNode::build(&[
            Timestamp::new(T0, 1, NODE_A),
            Timestamp::new(T0 + 120_000, 0, NODE_A),
        ]);
        assert!(diff(&a, &b).is_some());
        assert_eq!(diff(&a, &b), diff(&b, &a));
    }

    #[test]
    fn test_diff_with_pruned_trie_still_detects() {
        let stamps: Vec<Timestamp> = (0..6)
            .map(|i| Timestamp::new(T0 + i * 900_000, 0, NODE_A))
            .collect();
        let full = MerkleNode::build(&stamps);
        let partial = MerkleNode::build(&stamps[..5]);
        let fork = diff(&full.prune(2), &partial).unwrap();
        assert!(fork <= stamps[5].millis());
    }
}
