//! Talking to a remote relay

mod sync;

pub use sync::{open_envelope, SyncClient, SyncConfig, DEFAULT_RELAY_URL, ENV_RELAY_URL};
