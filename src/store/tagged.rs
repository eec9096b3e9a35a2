//! Type-tagged value encoding for the `value` column
//!
//! The store keeps values as text with a two character type prefix:
//!
//! ```text
//! N:42      number
//! S:hello   string
//! 0:        null
//! ```

use crate::model::Value;
use crate::{Error, Result};

/// Type tag for stored values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueTag {
    Null,
    Number,
    String,
}

impl ValueTag {
    pub fn prefix(&self) -> &'static str {
        match self {
            ValueTag::Null => "0:",
            ValueTag::Number => "N:",
            ValueTag::String => "S:",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "0:" => Some(ValueTag::Null),
            "N:" => Some(ValueTag::Number),
            "S:" => Some(ValueTag::String),
            _ => None,
        }
    }

    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueTag::Null,
            Value::Number(_) => ValueTag::Number,
            Value::String(_) => ValueTag::String,
        }
    }
}

/// Encode a value for storage
pub fn encode_value(value: &Value) -> String {
    let tag = ValueTag::of(value).prefix();
    match value {
        Value::Null => tag.to_string(),
        Value::Number(n) => format!("{}{}", tag, n),
        Value::String(s) => format!("{}{}", tag, s),
    }
}

/// Decode a stored value
pub fn decode_value(encoded: &str) -> Result<Value> {
    let (prefix, body) = match (encoded.get(..2), encoded.get(2..)) {
        (Some(prefix), Some(body)) => (prefix, body),
        _ => {
            return Err(Error::Corruption(format!(
                "Stored value too short: {:?}",
                encoded
            )))
        }
    };

    let tag = ValueTag::from_prefix(prefix)
        .ok_or_else(|| Error::Corruption(format!("Invalid value tag: {:?}", prefix)))?;

    match tag {
        ValueTag::Null => Ok(Value::Null),
        ValueTag::String => Ok(Value::String(body.to_string())),
        ValueTag::Number => {
            let n: f64 = body
                .parse()
                .map_err(|_| Error::Corruption(format!("Invalid stored number: {:?}", body)))?;
            Value::number(n).map_err(|e| Error::Corruption(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_tags() {
        assert_eq!(encode_value(&Value::Null), "0:");
        assert_eq!(encode_value(&Value::Number(42.0)), "N:42");
        assert_eq!(encode_value(&Value::Number(-0.5)), "N:-0.5");
        assert_eq!(encode_value(&Value::from("x")), "S:x");
    }

    #[test]
    fn test_numbers_and_numeric_strings_stay_distinct() {
        let number = decode_value(&encode_value(&Value::Number(42.0))).unwrap();
        let string = decode_value(&encode_value(&Value::from("42"))).unwrap();
        assert_eq!(number, Value::Number(42.0));
        assert_eq!(string, Value::String("42".into()));
    }

    #[test]
    fn test_decode_preserves_string_body() {
        assert_eq!(
            decode_value("S:N:not a number").unwrap(),
            Value::String("N:not a number".into())
        );
        assert_eq!(decode_value("S:").unwrap(), Value::String(String::new()));
        assert_eq!(decode_value("N:1e+21").unwrap(), Value::Number(1e21));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(decode_value(""), Err(Error::Corruption(_))));
        assert!(matches!(decode_value("X:1"), Err(Error::Corruption(_))));
        assert!(matches!(decode_value("N:abc"), Err(Error::Corruption(_))));
    }

    #[test]
    fn test_tag_prefix_roundtrip() {
        for tag in [ValueTag::Null, ValueTag::Number, ValueTag::String] {
            assert_eq!(ValueTag::from_prefix(tag.prefix()), Some(tag));
        }
    }
}
