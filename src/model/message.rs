//! Messages - the unit of the replicated operation log

use super::{Timestamp, Value};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One cell write: set `column` of `row` in `dataset` to `value`
///
/// The timestamp is the message's identity. HLC timestamps are globally
/// unique, so two messages with the same timestamp are the same message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: Timestamp,
    pub group_id: String,
    pub dataset: String,
    pub row: String,
    pub column: String,
    pub value: Value,
}

impl Message {
    pub fn new(
        timestamp: Timestamp,
        group_id: impl Into<String>,
        dataset: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Message {
            timestamp,
            group_id: group_id.into(),
            dataset: dataset.into(),
            row: row.into(),
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A message as it travels over the wire, timestamp still unparsed
///
/// The relay accepts these and parses timestamps inside the ingest
/// transaction, so one malformed timestamp fails the whole batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub timestamp: String,
    pub group_id: String,
    pub dataset: String,
    pub row: String,
    pub column: String,
    pub value: Value,
}

impl WireMessage {
    /// Parse into a [`Message`], failing on a malformed timestamp
    pub fn parse(&self) -> Result<Message> {
        let timestamp = Timestamp::parse(&self.timestamp)
            .ok_or_else(|| Error::InvalidTimestamp(self.timestamp.clone()))?;
        Ok(Message {
            timestamp,
            group_id: self.group_id.clone(),
            dataset: self.dataset.clone(),
            row: self.row.clone(),
            column: self.column.clone(),
            value: self.value.clone(),
        })
    }
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        WireMessage {
            timestamp: msg.timestamp.to_string(),
            group_id: msg.group_id.clone(),
            dataset: msg.dataset.clone(),
            row: msg.row.clone(),
            column: msg.column.clone(),
            value: msg.value.clone(),
        }
    }
}

impl From<Message> for WireMessage {
    fn from(msg: Message) -> Self {
        WireMessage {
            timestamp: msg.timestamp.to_string(),
            group_id: msg.group_id,
            dataset: msg.dataset,
            row: msg.row,
            column: msg.column,
            value: msg.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_parse() {
        let ts = Timestamp::new(1_709_296_245_123, 0, "aaaaaaaaaaaaaa01");
        let msg = Message::new(ts.clone(), "g", "accounts", "r1", "balance", 42.0);
        let wire = WireMessage::from(&msg);
        assert_eq!(wire.timestamp, ts.to_string());
        assert_eq!(wire.parse().unwrap(), msg);
    }

    #[test]
    fn test_wire_message_bad_timestamp() {
        let wire = WireMessage {
            timestamp: "yesterday".into(),
            group_id: "g".into(),
            dataset: "d".into(),
            row: "r".into(),
            column: "c".into(),
            value: Value::Null,
        };
        assert!(matches!(wire.parse(), Err(Error::InvalidTimestamp(_))));
    }

    #[test]
    fn test_message_json_shape() {
        let json = r#"{"timestamp":"2024-03-01T12:30:45.123Z-0000-aaaaaaaaaaaaaa01",
            "group_id":"g","dataset":"d","row":"r","column":"c","value":42}"#;
        let wire: WireMessage = serde_json::from_str(json).unwrap();
        assert_eq!(wire.value, Value::Number(42.0));
        let out = serde_json::to_value(&wire).unwrap();
        assert_eq!(out["value"], serde_json::json!(42));
    }
}
