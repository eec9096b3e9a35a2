//! Hybrid logical clock
//!
//! Combines physical time with a logical counter so that every timestamp a
//! node issues is:
//! - unique (the node id is part of it)
//! - at or after the node's physical time, and never more than `max_drift`
//!   ahead of it
//! - strictly greater than every timestamp the node has issued or received
//!
//! The last point gives "happens-before implies timestamp order" as long as
//! every inbound timestamp goes through [`Clock::recv`] before it is applied.

mod hlc;
mod source;

pub use hlc::{Clock, ClockConfig, DEFAULT_MAX_DRIFT_MS};
pub use source::{ManualTimeSource, SystemTimeSource, TimeSource};
