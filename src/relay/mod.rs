//! The sync relay
//!
//! A relay is a pure append log plus index: it never issues timestamps of its
//! own. Each request is handled on its own: ingest the client's batch, then
//! answer with whatever the client is missing according to its trie.

#[cfg(feature = "server")]
mod server;

use crate::model::{Timestamp, WireMessage};
use crate::ops::diff;
use crate::store::MessageStore;
use crate::trie::{MerkleNode, KEY_DIGITS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "server")]
pub use server::{router, serve, serve_on};

/// Body of `POST /sync`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub group_id: String,
    /// Node id of the submitting client; its own messages are not echoed back
    pub client_id: String,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    /// The client's trie; absent on a first, push-only sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle: Option<MerkleNode>,
}

/// Payload of a successful sync
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub messages: Vec<WireMessage>,
    pub merkle: MerkleNode,
}

/// Response wrapper: `{"status": "ok", "data": ...}` or
/// `{"status": "error", "reason": ...}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Ok { data: SyncResponse },
    Error { reason: String },
}

/// Stateless per-request sync handler over a shared store
pub struct SyncEndpoint {
    store: Arc<MessageStore>,
}

impl SyncEndpoint {
    pub fn new(store: Arc<MessageStore>) -> Self {
        SyncEndpoint { store }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Ingest the request's messages and compute the client's delta
    ///
    /// Ingestion happens first and is committed regardless of what follows.
    pub fn handle(&self, request: &SyncRequest) -> Result<SyncResponse> {
        let group_id = request.group_id.as_str();
        if let Some(client_merkle) = &request.merkle {
            let depth = client_merkle.depth();
            if depth > KEY_DIGITS {
                return Err(Error::InvalidValue(format!(
                    "merkle is {} levels deep, keys have {} digits",
                    depth, KEY_DIGITS
                )));
            }
        }
        let trie = self.store.add_messages(group_id, &request.messages)?;

        let Some(client_merkle) = &request.merkle else {
            debug!(group_id, client_id = %request.client_id, "Push-only sync");
            return Ok(SyncResponse {
                messages: Vec::new(),
                merkle: trie,
            });
        };

        let Some(fork) = diff(&trie, client_merkle) else {
            debug!(group_id, client_id = %request.client_id, "Client already in sync");
            return Ok(SyncResponse {
                messages: Vec::new(),
                merkle: trie,
            });
        };

        let messages = self.store.messages_since(
            group_id,
            &Timestamp::lower_bound(fork),
            Some(&request.client_id),
        )?;
        info!(
            group_id,
            client_id = %request.client_id,
            received = request.messages.len(),
            fork,
            sending = messages.len(),
            "Computed sync delta"
        );

        Ok(SyncResponse {
            messages: messages.iter().map(WireMessage::from).collect(),
            merkle: trie,
        })
    }
}
