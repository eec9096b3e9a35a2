//! Core data model types for hlc_relay

mod hash;
mod message;
mod timestamp;
mod value;

pub use hash::{murmur3_32, MURMUR_SEED};
pub use message::{Message, WireMessage};
pub use timestamp::{Timestamp, MAX_COUNTER, NODE_WIDTH};
pub use value::Value;
