//! Client-side replica of a group's message log
//!
//! A replica owns the node's [`Clock`], its copy of the log and the matching
//! trie. It talks to a relay through any transport that turns a
//! [`SyncRequest`] into a [`SyncResponse`]: the HTTP [`SyncClient`] or,
//! in-process, a [`SyncEndpoint`].
//!
//! [`SyncClient`]: crate::SyncClient
//! [`SyncEndpoint`]: crate::SyncEndpoint

use crate::clock::Clock;
use crate::model::{Message, Timestamp, Value, WireMessage};
use crate::ops::diff;
use crate::relay::{SyncRequest, SyncResponse};
use crate::trie::MerkleNode;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// One node's view of a group
pub struct Replica {
    group_id: String,
    clock: Clock,
    log: BTreeMap<Timestamp, Message>,
    merkle: MerkleNode,
    /// Locally recorded messages the relay has not acknowledged yet
    outbox: Vec<Timestamp>,
}

impl Replica {
    pub fn new(group_id: impl Into<String>, clock: Clock) -> Self {
        Replica {
            group_id: group_id.into(),
            clock,
            log: BTreeMap::new(),
            merkle: MerkleNode::empty(),
            outbox: Vec::new(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn node(&self) -> &str {
        self.clock.node()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn merkle(&self) -> &MerkleNode {
        &self.merkle
    }

    /// All known messages in timestamp order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.log.values()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Messages waiting to be pushed
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Record a local cell write
    pub fn record(
        &mut self,
        dataset: &str,
        row: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<Message> {
        let timestamp = self.clock.send()?;
        let message = Message::new(
            timestamp.clone(),
            self.group_id.clone(),
            dataset,
            row,
            column,
            value,
        );
        self.merkle = self.merkle.insert(&timestamp);
        self.log.insert(timestamp.clone(), message.clone());
        self.outbox.push(timestamp);
        Ok(message)
    }

    /// Request pushing the outbox along with our trie
    pub fn request(&self) -> SyncRequest {
        let messages = self
            .outbox
            .iter()
            .filter_map(|ts| self.log.get(ts))
            .map(WireMessage::from)
            .collect();
        self.build_request(messages)
    }

    /// Request resending everything we hold from `millis` onward
    pub fn request_since(&self, millis: u64) -> SyncRequest {
        let since = Timestamp::lower_bound(millis);
        let messages = self
            .log
            .range(since..)
            .map(|(_, msg)| WireMessage::from(msg))
            .collect();
        self.build_request(messages)
    }

    fn build_request(&self, messages: Vec<WireMessage>) -> SyncRequest {
        SyncRequest {
            group_id: self.group_id.clone(),
            client_id: self.node().to_string(),
            messages,
            merkle: Some(self.merkle.clone()),
        }
    }

    /// Apply a relay response
    ///
    /// Every message we did not have goes through [`Clock::recv`] before it
    /// is stored. Returns the fork point between the relay's trie and ours
    /// after applying, or `None` once both agree.
    pub fn apply(&mut self, response: &SyncResponse) -> Result<Option<u64>> {
        let mut applied = 0usize;
        for wire in &response.messages {
            let message = wire.parse()?;
            if message.group_id != self.group_id {
                return Err(Error::GroupMismatch {
                    expected: self.group_id.clone(),
                    found: message.group_id,
                });
            }
            if self.log.contains_key(&message.timestamp) {
                continue;
            }

            self.clock.recv(&message.timestamp)?;
            self.merkle = self.merkle.insert(&message.timestamp);
            self.log.insert(message.timestamp.clone(), message);
            applied += 1;
        }
        self.outbox.clear();

        let fork = diff(&response.merkle, &self.merkle);
        debug!(
            group_id = %self.group_id,
            node = %self.node(),
            applied,
            ?fork,
            "Applied sync response"
        );
        Ok(fork)
    }

    /// Run sync rounds until our trie matches the relay's
    ///
    /// Returns how many new messages were received. Fails if the relay keeps
    /// reporting the same fork point, which means resending did not help.
    pub fn sync_with<F>(&mut self, mut transport: F) -> Result<usize>
    where
        F: FnMut(&SyncRequest) -> Result<SyncResponse>,
    {
        let before = self.len();
        let mut request = self.request();
        let mut last_fork = None;

        loop {
            let response = transport(&request)?;
            match self.apply(&response)? {
                None => return Ok(self.len() - before),
                Some(fork) if last_fork == Some(fork) => {
                    return Err(Error::NotConverging(fork));
                }
                Some(fork) => {
                    last_fork = Some(fork);
                    request = self.request_since(fork);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::relay::SyncEndpoint;
    use crate::store::MessageStore;
    use std::sync::Arc;

    const GROUP: &str = "household";
    const NODE_A: &str = "aaaaaaaaaaaaaa01";
    const NODE_B: &str = "bbbbbbbbbbbbbb02";
    const T0: u64 = 1_709_296_245_123;

    fn replica(node: &str, time: &ManualTimeSource) -> Replica {
        Replica::new(GROUP, Clock::with_source(node, time.clone()).unwrap())
    }

    fn relay() -> SyncEndpoint {
        SyncEndpoint::new(Arc::new(MessageStore::open_in_memory().unwrap()))
    }

    #[test]
    fn test_record_stamps_and_queues() {
        let time = ManualTimeSource::new(T0);
        let mut a = replica(NODE_A, &time);
        let m1 = a.record("todos", "t1", "title", "milk").unwrap();
        let m2 = a.record("todos", "t1", "done", 0.0).unwrap();
        assert!(m2.timestamp > m1.timestamp);
        assert_eq!(a.pending(), 2);
        assert_eq!(a.merkle().hash(), m1.timestamp.hash() ^ m2.timestamp.hash());

        let req = a.request();
        assert_eq!(req.client_id, NODE_A);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.merkle.as_ref(), Some(a.merkle()));
    }

    #[test]
    fn test_two_replicas_converge_through_relay() {
        let time = ManualTimeSource::new(T0);
        let relay = relay();
        let mut a = replica(NODE_A, &time);
        let mut b = replica(NODE_B, &time);

        a.record("todos", "t1", "title", "milk").unwrap();
        time.advance(90_000);
        b.record("todos", "t2", "title", "eggs").unwrap();
        time.advance(1);

        a.sync_with(|req| relay.handle(req)).unwrap();
        let received = b.sync_with(|req| relay.handle(req)).unwrap();
        assert_eq!(received, 1);
        a.sync_with(|req| relay.handle(req)).unwrap();

        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
        assert_eq!(a.merkle(), b.merkle());
        assert_eq!(a.pending(), 0);
        let a_msgs: Vec<&Message> = a.messages().collect();
        let b_msgs: Vec<&Message> = b.messages().collect();
        assert_eq!(a_msgs, b_msgs);
    }

    #[test]
    fn test_received_messages_advance_clock() {
        let time = ManualTimeSource::new(T0);
        let relay = relay();
        let ahead = ManualTimeSource::new(T0 + 30_000);
        let mut a = replica(NODE_A, &ahead);
        let mut b = replica(NODE_B, &time);

        let sent = a.record("d", "r", "c", 1.0).unwrap();
        a.sync_with(|req| relay.handle(req)).unwrap();
        b.sync_with(|req| relay.handle(req)).unwrap();

        assert!(b.clock().timestamp() > &sent.timestamp);
        let next = b.record("d", "r", "c", 2.0).unwrap();
        assert!(next.timestamp > sent.timestamp);
    }

    #[test]
    fn test_resends_history_relay_lost() {
        let time = ManualTimeSource::new(T0);
        let mut a = replica(NODE_A, &time);
        a.record("d", "r1", "c", "one").unwrap();
        time.advance(120_000);
        a.record("d", "r2", "c", "two").unwrap();

        let old_relay = relay();
        a.sync_with(|req| old_relay.handle(req)).unwrap();

        // a fresh relay knows nothing; the outbox is already empty
        let new_relay = relay();
        a.sync_with(|req| new_relay.handle(req)).unwrap();
        assert_eq!(new_relay.store().message_count(GROUP).unwrap(), 2);
        assert_eq!(new_relay.store().get_merkle(GROUP).unwrap(), *a.merkle());
    }

    #[test]
    fn test_apply_rejects_foreign_group() {
        let time = ManualTimeSource::new(T0);
        let mut a = replica(NODE_A, &time);
        let stray = Message::new(Timestamp::new(T0, 0, NODE_B), "other", "d", "r", "c", 1.0);
        let response = SyncResponse {
            messages: vec![WireMessage::from(&stray)],
            merkle: MerkleNode::empty().insert(&stray.timestamp),
        };
        assert!(matches!(a.apply(&response), Err(Error::GroupMismatch { .. })));
        assert!(a.is_empty());
    }

    #[test]
    fn test_sync_detects_stalled_relay() {
        let time = ManualTimeSource::new(T0);
        let mut a = replica(NODE_A, &time);
        a.record("d", "r", "c", 1.0).unwrap();

        // a relay that never stores anything
        let result = a.sync_with(|_req| {
            Ok(SyncResponse {
                messages: vec![],
                merkle: MerkleNode::empty(),
            })
        });
        assert!(matches!(result, Err(Error::NotConverging(_))));
    }
}
