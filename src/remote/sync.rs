//! Blocking HTTP client for a relay
//!
//! Handles `POST /sync` and `GET /health`.

use crate::relay::{Envelope, SyncRequest, SyncResponse};
#[cfg(feature = "sync")]
use crate::replica::Replica;
use crate::{Error, Result};

/// Default relay URL (local development)
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8006";

/// Environment variable overriding the relay URL
pub const ENV_RELAY_URL: &str = "HLC_RELAY_URL";

/// Sync client configuration
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Base URL of the relay
    pub api_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            api_url: DEFAULT_RELAY_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    /// Create config from the `HLC_RELAY_URL` environment variable
    pub fn from_env() -> Self {
        let api_url = std::env::var(ENV_RELAY_URL).unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string());
        SyncConfig {
            api_url,
            ..Default::default()
        }
    }

    pub fn with_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

/// Unwrap a relay envelope into its payload
pub fn open_envelope(envelope: Envelope) -> Result<SyncResponse> {
    match envelope {
        Envelope::Ok { data } => Ok(data),
        Envelope::Error { reason } => Err(Error::Remote(reason)),
    }
}

/// Sync client for a relay
#[cfg(feature = "sync")]
pub struct SyncClient {
    config: SyncConfig,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "sync")]
impl SyncClient {
    /// Create a new sync client
    pub fn new(config: SyncConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(SyncClient { config, client })
    }

    /// Create a sync client from environment
    pub fn from_env() -> Result<Self> {
        Self::new(SyncConfig::from_env())
    }

    /// Build the full URL for an endpoint
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Check that the relay is up
    pub fn health(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(response.status().is_success())
    }

    /// Send one sync request
    pub fn sync(&self, request: &SyncRequest) -> Result<SyncResponse> {
        let response = self
            .client
            .post(self.url("/sync"))
            .json(request)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let envelope: Envelope = response.json().map_err(|e| {
            Error::Http(format!("Unreadable relay response ({}): {}", status, e))
        })?;
        open_envelope(envelope)
    }

    /// Sync a replica until it agrees with the relay
    pub fn sync_replica(&self, replica: &mut Replica) -> Result<usize> {
        replica.sync_with(|request| self.sync(request))
    }
}

/// Stub implementation when sync feature is disabled
#[cfg(not(feature = "sync"))]
pub struct SyncClient;

#[cfg(not(feature = "sync"))]
impl SyncClient {
    pub fn new(_config: SyncConfig) -> Result<Self> {
        Err(Error::Remote(
            "Sync feature not enabled. Compile with --features sync".into(),
        ))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SyncConfig::default())
    }
}
