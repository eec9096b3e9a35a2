//! SQLite-backed message log with a per-group trie index
//!
//! Schema:
//! ```text
//! messages(timestamp TEXT PRIMARY KEY, group_id, dataset, row, column, value)
//! merkles(group_id TEXT PRIMARY KEY, merkle TEXT)   -- trie as JSON
//! ```
//!
//! One connection sits behind a mutex and every batch runs in a
//! `BEGIN IMMEDIATE` transaction, so "read trie, insert rows, write trie" is
//! atomic per group, including against other processes sharing the file.

use super::tagged::{decode_value, encode_value};
use crate::model::{Message, Timestamp, WireMessage, NODE_WIDTH};
use crate::trie::MerkleNode;
use crate::{Error, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// How long a writer waits for another process's transaction
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The relay's persistent message log
pub struct MessageStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl MessageStore {
    /// Open (or create) a store backed by a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;",
        )?;
        Self::init(conn, Some(path))
    }

    /// Open a throwaway store that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                timestamp TEXT PRIMARY KEY,
                group_id  TEXT NOT NULL,
                dataset   TEXT NOT NULL,
                \"row\"     TEXT NOT NULL,
                \"column\"  TEXT NOT NULL,
                value     TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_group_ts ON messages(group_id, timestamp);
            CREATE TABLE IF NOT EXISTS merkles (
                group_id TEXT PRIMARY KEY,
                merkle   TEXT NOT NULL
            );",
        )?;

        Ok(MessageStore {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Ingest a batch of messages for `group_id` and return the new trie
    ///
    /// All or nothing: a malformed timestamp, a message addressed to another
    /// group, or any storage failure rolls the whole batch back. Messages
    /// whose timestamp is already stored are skipped and do not touch the
    /// trie, so resubmitting a batch is safe.
    pub fn add_messages(&self, group_id: &str, messages: &[WireMessage]) -> Result<MerkleNode> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut trie = load_merkle(&tx, group_id)?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO messages (timestamp, group_id, dataset, \"row\", \"column\", value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for wire in messages {
                let msg = wire.parse()?;
                if msg.group_id != group_id {
                    return Err(Error::GroupMismatch {
                        expected: group_id.to_string(),
                        found: msg.group_id,
                    });
                }

                let changed = stmt.execute(params![
                    msg.timestamp.to_string(),
                    group_id,
                    msg.dataset,
                    msg.row,
                    msg.column,
                    encode_value(&msg.value),
                ])?;
                if changed > 0 {
                    trie = trie.insert(&msg.timestamp);
                    inserted += 1;
                }
            }
        }

        if inserted > 0 {
            save_merkle(&tx, group_id, &trie)?;
        }
        tx.commit()?;

        debug!(
            group_id,
            received = messages.len(),
            inserted,
            hash = trie.hash(),
            "Committed message batch"
        );
        Ok(trie)
    }

    /// The group's current trie, or the empty trie if it never synced
    pub fn get_merkle(&self, group_id: &str) -> Result<MerkleNode> {
        let conn = self.conn.lock();
        load_merkle(&conn, group_id)
    }

    /// Messages of `group_id` stamped after `since`, ascending
    ///
    /// Messages whose node equals `exclude_node` are left out. A short id is
    /// left padded with `0` the way the clock pads it; a longer one matches
    /// nothing.
    pub fn messages_since(
        &self,
        group_id: &str,
        since: &Timestamp,
        exclude_node: Option<&str>,
    ) -> Result<Vec<Message>> {
        let exclude = exclude_node.map(|node| format!("{:0>width$}", node, width = NODE_WIDTH));
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT timestamp, dataset, \"row\", \"column\", value FROM messages
             WHERE group_id = ?1 AND timestamp > ?2
             ORDER BY timestamp",
        )?;

        let rows = stmt.query_map(params![group_id, since.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (timestamp, dataset, row, column, value) = row?;
            let timestamp = Timestamp::parse(&timestamp)
                .ok_or_else(|| Error::Corruption(format!("Stored timestamp {:?}", timestamp)))?;
            if exclude.as_deref() == Some(timestamp.node()) {
                continue;
            }
            messages.push(Message {
                timestamp,
                group_id: group_id.to_string(),
                dataset,
                row,
                column,
                value: decode_value(&value)?,
            });
        }
        Ok(messages)
    }

    /// Number of stored messages for a group
    pub fn message_count(&self, group_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Every group that has a persisted trie
    pub fn groups(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT group_id FROM merkles ORDER BY group_id")?;
        let groups = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(groups)
    }

    /// The database file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn load_merkle(conn: &Connection, group_id: &str) -> Result<MerkleNode> {
    let json: Option<String> = conn
        .query_row(
            "SELECT merkle FROM merkles WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )
        .optional()?;

    match json {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            Error::Corruption(format!("Merkle for group '{}': {}", group_id, e))
        }),
        None => Ok(MerkleNode::empty()),
    }
}

fn save_merkle(conn: &Connection, group_id: &str, trie: &MerkleNode) -> Result<()> {
    let json = serde_json::to_string(trie)?;
    conn.execute(
        "INSERT OR REPLACE INTO merkles (group_id, merkle) VALUES (?1, ?2)",
        params![group_id, json],
    )?;
    Ok(())
}
