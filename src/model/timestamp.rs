//! Hybrid logical clock timestamps
//!
//! A timestamp is `(millis, counter, node)`. Its string form is fixed width:
//!
//! ```text
//! 2024-03-01T12:30:45.123Z-000A-0123456789abcdef
//! └──── ISO-8601 millis ──┘ └ctr┘ └──── node ────┘
//! ```
//!
//! Because every field has a fixed width, comparing two encoded strings gives
//! the same answer as comparing `(millis, counter, node)`. The relay relies on
//! this: timestamps are its primary key and range queries run on the strings.

use super::hash::murmur3_32;
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of the node segment in the string encoding
pub const NODE_WIDTH: usize = 16;

/// Largest logical counter value
pub const MAX_COUNTER: u16 = u16::MAX;

/// An immutable HLC timestamp
///
/// Ordering is `(millis, counter, node)`, which matches the ordering of the
/// string encoding since `node` is always normalized to [`NODE_WIDTH`] chars.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: u64,
    counter: u16,
    node: String,
}

impl Timestamp {
    /// Create a timestamp, normalizing `node` to 16 characters
    ///
    /// Shorter ids are left padded with `0`, longer ids keep their last 16
    /// characters.
    pub fn new(millis: u64, counter: u16, node: impl AsRef<str>) -> Self {
        Timestamp {
            millis,
            counter,
            node: Self::normalize_node(node.as_ref()),
        }
    }

    /// Render a node id the way it appears inside a timestamp
    pub fn normalize_node(node: &str) -> String {
        let len = node.chars().count();
        if len >= NODE_WIDTH {
            node.chars().skip(len - NODE_WIDTH).collect()
        } else {
            format!("{:0>width$}", node, width = NODE_WIDTH)
        }
    }

    /// The smallest timestamp inside the given millisecond
    ///
    /// Its node renders as sixteen `0`s, which sorts at or below every valid
    /// node id, so `ts > Timestamp::lower_bound(m)` selects everything stamped
    /// from `m` onward.
    pub fn lower_bound(millis: u64) -> Self {
        Timestamp::new(millis, 0, "0")
    }

    pub fn millis(&self) -> u64 {
        self.millis
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Parse the fixed-width string form
    ///
    /// Returns `None` for anything that is not a canonical encoding: wrong
    /// segment count, unparseable date or counter, or non-canonical widths.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 5 {
            return None;
        }

        let date = parts[..3].join("-");
        let millis = DateTime::parse_from_rfc3339(&date).ok()?.timestamp_millis();
        let millis = u64::try_from(millis).ok()?;
        let counter = u16::from_str_radix(parts[3], 16).ok()?;
        let node = parts[4];
        if node.chars().count() != NODE_WIDTH {
            return None;
        }

        let ts = Timestamp::new(millis, counter, node);
        // Reject anything that would not re-encode to the same string,
        // e.g. lowercase hex or a missing millisecond field.
        if ts.to_string() != s {
            return None;
        }
        Some(ts)
    }

    /// The 32-bit rolling hash of the string form
    pub fn hash(&self) -> i32 {
        murmur3_32(self.to_string().as_bytes())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = i64::try_from(self.millis)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or(fmt::Error)?;
        write!(
            f,
            "{}-{:04X}-{}",
            date.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.counter,
            self.node
        )
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Timestamp::parse(s).ok_or_else(|| Error::InvalidTimestamp(s.to_string()))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_A: &str = "aaaaaaaaaaaaaa01";

    #[test]
    fn test_timestamp_format() {
        let ts = Timestamp::new(1_709_296_245_123, 10, "0123456789abcdef");
        assert_eq!(
            ts.to_string(),
            "2024-03-01T12:30:45.123Z-000A-0123456789abcdef"
        );
    }

    #[test]
    fn test_node_normalization() {
        assert_eq!(Timestamp::new(0, 0, "7").node(), "0000000000000007");
        assert_eq!(
            Timestamp::new(0, 0, "xx0123456789abcdef").node(),
            "0123456789abcdef"
        );
        assert_eq!(Timestamp::lower_bound(0).node(), "0000000000000000");
    }

    #[test]
    fn test_parse_roundtrip() {
        let cases = [
            Timestamp::new(0, 0, NODE_A),
            Timestamp::new(1_709_296_245_123, 0xFFFF, NODE_A),
            Timestamp::new(253_402_300_799_999, 1, "ffffffffffffffff"),
        ];
        for ts in cases {
            let parsed = Timestamp::parse(&ts.to_string()).unwrap();
            assert_eq!(parsed, ts);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Timestamp::parse("").is_none());
        assert!(Timestamp::parse("not-a-timestamp").is_none());
        assert!(Timestamp::parse("2024-03-01T12:30:45.123Z-000A").is_none());
        assert!(Timestamp::parse("2024-03-01T12:30:45.123Z-XYZW-0123456789abcdef").is_none());
        assert!(Timestamp::parse("2024-13-01T12:30:45.123Z-0000-0123456789abcdef").is_none());
        // lowercase counter is not canonical
        assert!(Timestamp::parse("2024-03-01T12:30:45.123Z-000a-0123456789abcdef").is_none());
        // short node
        assert!(Timestamp::parse("2024-03-01T12:30:45.123Z-0000-abc").is_none());
        // extra segment
        assert!(Timestamp::parse("2024-03-01T12:30:45.123Z-0000-0123-456789abcdef").is_none());
    }

    #[test]
    fn test_string_order_matches_field_order() {
        let mut stamps = vec![
            Timestamp::new(2_000, 0, "0000000000000002"),
            Timestamp::new(1_000, 5, "0000000000000009"),
            Timestamp::new(1_000, 5, "0000000000000001"),
            Timestamp::new(1_000, 16, "0000000000000001"),
            Timestamp::new(999, 0xFFFF, "ffffffffffffffff"),
        ];
        let mut strings: Vec<String> = stamps.iter().map(|t| t.to_string()).collect();
        stamps.sort();
        strings.sort();
        let sorted: Vec<String> = stamps.iter().map(|t| t.to_string()).collect();
        assert_eq!(sorted, strings);
    }

    #[test]
    fn test_lower_bound_sorts_below_minute() {
        let bound = Timestamp::lower_bound(60_000);
        assert!(Timestamp::new(60_000, 0, "0000000000000001") > bound);
        assert!(Timestamp::new(59_999, 0xFFFF, "ffffffffffffffff") < bound);
    }

    #[test]
    fn test_hash_uses_string_form() {
        let ts = Timestamp::new(1_709_296_245_123, 3, NODE_A);
        assert_eq!(ts.hash(), murmur3_32(ts.to_string().as_bytes()));
        assert_ne!(ts.hash(), Timestamp::new(1_709_296_245_123, 4, NODE_A).hash());
    }

    #[test]
    fn test_serde_as_string() {
        let ts = Timestamp::new(1_709_296_245_123, 1, NODE_A);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, format!("\"{}\"", ts));
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
        assert!(serde_json::from_str::<Timestamp>("\"garbage\"").is_err());
    }
}
