//! The hybrid logical clock state machine

use super::{SystemTimeSource, TimeSource};
use crate::model::{Timestamp, MAX_COUNTER, NODE_WIDTH};
use crate::{Error, Result};
use std::sync::Arc;

/// Default tolerance between logical and physical time
pub const DEFAULT_MAX_DRIFT_MS: u64 = 60_000;

/// Clock tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    /// How far (ms) a timestamp may run ahead of physical time
    pub max_drift_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            max_drift_ms: DEFAULT_MAX_DRIFT_MS,
        }
    }
}

/// A per-node hybrid logical clock
///
/// One clock per replica. `send` and `recv` take `&mut self`, so concurrent
/// use needs an external lock around the clock. Both leave the clock untouched
/// when they fail.
pub struct Clock {
    timestamp: Timestamp,
    config: ClockConfig,
    source: Arc<dyn TimeSource>,
}

impl Clock {
    /// Create a clock at time zero for `node`, reading the system clock
    pub fn new(node: &str) -> Result<Self> {
        Self::with_source(node, SystemTimeSource)
    }

    /// Create a clock at time zero for `node` with a custom time source
    pub fn with_source(node: &str, source: impl TimeSource + 'static) -> Result<Self> {
        validate_node(node)?;
        Ok(Clock {
            timestamp: Timestamp::new(0, 0, node),
            config: ClockConfig::default(),
            source: Arc::new(source),
        })
    }

    /// Restore a clock from its last persisted timestamp
    pub fn restore(timestamp: Timestamp, source: impl TimeSource + 'static) -> Result<Self> {
        validate_node(timestamp.node())?;
        Ok(Clock {
            timestamp,
            config: ClockConfig::default(),
            source: Arc::new(source),
        })
    }

    pub fn with_config(mut self, config: ClockConfig) -> Self {
        self.config = config;
        self
    }

    pub fn node(&self) -> &str {
        self.timestamp.node()
    }

    /// The last timestamp issued or merged
    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    /// Stamp a locally originated operation
    pub fn send(&mut self) -> Result<Timestamp> {
        let phys = self.source.now_millis();
        let l_old = self.timestamp.millis();
        let c_old = u32::from(self.timestamp.counter());

        let l_new = l_old.max(phys);
        let c_new = if l_new == l_old { c_old + 1 } else { 0 };

        self.advance(l_new, c_new, phys)
    }

    /// Merge a timestamp received from another node
    ///
    /// Must run once per inbound message, in receipt order, before the
    /// message has any effect locally.
    pub fn recv(&mut self, remote: &Timestamp) -> Result<Timestamp> {
        if remote.node() == self.timestamp.node() {
            return Err(Error::DuplicateNode(remote.node().to_string()));
        }

        let phys = self.source.now_millis();
        self.check_drift(remote.millis(), phys)?;

        let l_old = self.timestamp.millis();
        let c_old = u32::from(self.timestamp.counter());
        let l_msg = remote.millis();
        let c_msg = u32::from(remote.counter());

        let l_new = l_old.max(phys).max(l_msg);
        let c_new = if l_new == l_old && l_new == l_msg {
            c_old.max(c_msg) + 1
        } else if l_new == l_old {
            c_old + 1
        } else if l_new == l_msg {
            c_msg + 1
        } else {
            0
        };

        self.advance(l_new, c_new, phys)
    }

    fn advance(&mut self, millis: u64, counter: u32, phys: u64) -> Result<Timestamp> {
        self.check_drift(millis, phys)?;
        if counter > u32::from(MAX_COUNTER) {
            return Err(Error::Overflow { millis });
        }
        let counter = counter as u16;

        self.timestamp = Timestamp::new(millis, counter, self.timestamp.node());
        Ok(self.timestamp.clone())
    }

    fn check_drift(&self, millis: u64, phys: u64) -> Result<()> {
        let drift = millis.saturating_sub(phys);
        if drift > self.config.max_drift_ms {
            return Err(Error::ClockDrift {
                millis,
                drift,
                max_drift: self.config.max_drift_ms,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("timestamp", &self.timestamp)
            .field("config", &self.config)
            .finish()
    }
}

/// Node ids must survive the fixed-width encoding and sort above the
/// all-zero lower bound node.
fn validate_node(node: &str) -> Result<()> {
    if node.is_empty() || node.len() > NODE_WIDTH {
        return Err(Error::InvalidNodeId(format!(
            "'{}' must be 1-{} characters",
            node, NODE_WIDTH
        )));
    }
    if !node.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidNodeId(format!(
            "'{}' must be ascii alphanumeric",
            node
        )));
    }
    if node.chars().all(|c| c == '0') {
        return Err(Error::InvalidNodeId(format!(
            "'{}' collides with the lower bound node",
            node
        )));
    }
    Ok(())
}
