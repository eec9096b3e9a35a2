//! hlc-relay CLI - run and inspect a sync relay
//!
//! `serve` runs the HTTP relay; the remaining commands inspect a relay
//! database or trie files offline and print JSON.

use clap::{Parser, Subcommand};
use hlc_relay::{diff, MerkleNode, MessageStore, RelayConfig, Timestamp};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hlc-relay")]
#[command(about = "Hybrid logical clock sync relay")]
#[command(version)]
struct Cli {
    /// Path to the relay database (default: $HLC_RELAY_DB or the user data dir)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay HTTP server
    Serve {
        /// Listen address (default: $HLC_RELAY_BIND or 127.0.0.1:8006)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// List groups that have synced
    Groups,

    /// Print a group's merkle trie
    Merkle {
        /// Group id
        group: String,
        /// Keep only the N most recent children per level
        #[arg(short, long)]
        prune: Option<usize>,
    },

    /// List a group's messages
    Messages {
        /// Group id
        group: String,
        /// Only messages stamped at or after this unix millisecond
        #[arg(short, long, default_value = "0")]
        since: u64,
        /// Leave out messages from this node
        #[arg(short, long)]
        exclude: Option<String>,
    },

    /// Find the fork point between two merkle trie JSON files
    Diff {
        /// First trie file
        left: PathBuf,
        /// Second trie file
        right: PathBuf,
    },

    /// Parse a timestamp and show its fields and hash
    Timestamp {
        /// Timestamp string
        value: String,
    },

    /// Check that a relay is reachable
    Ping {
        /// Relay URL (default: $HLC_RELAY_URL or http://127.0.0.1:8006)
        #[arg(short, long)]
        url: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = RelayConfig::from_env()?;
    if let Some(database) = &cli.database {
        config = config.with_database(database);
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config = config.with_bind(bind);
            }
            serve(&config)?;
        }

        Commands::Groups => {
            let store = open_store(&config.database)?;
            let groups = store
                .groups()?
                .into_iter()
                .map(|group| {
                    let count = store.message_count(&group)?;
                    Ok(serde_json::json!({ "group_id": group, "messages": count }))
                })
                .collect::<hlc_relay::Result<Vec<_>>>()?;
            output(&cli.format, &serde_json::json!({ "groups": groups }))?;
        }

        Commands::Merkle { group, prune } => {
            let store = open_store(&config.database)?;
            let mut trie = store.get_merkle(&group)?;
            if let Some(keep) = prune {
                trie = trie.prune(keep);
            }
            output(
                &cli.format,
                &serde_json::json!({
                    "group_id": group,
                    "hash": trie.hash(),
                    "nodes": trie.node_count(),
                    "merkle": trie,
                }),
            )?;
        }

        Commands::Messages {
            group,
            since,
            exclude,
        } => {
            let store = open_store(&config.database)?;
            let bound = Timestamp::lower_bound(since);
            let messages = store.messages_since(&group, &bound, exclude.as_deref())?;
            output(
                &cli.format,
                &serde_json::json!({
                    "group_id": group,
                    "count": messages.len(),
                    "messages": messages,
                }),
            )?;
        }

        Commands::Diff { left, right } => {
            let left = read_trie(&left)?;
            let right = read_trie(&right)?;
            let fork = diff(&left, &right);
            let fork_time = fork.map(|millis| Timestamp::lower_bound(millis).to_string());
            output(
                &cli.format,
                &serde_json::json!({
                    "in_sync": fork.is_none(),
                    "fork_millis": fork,
                    "fork_timestamp": fork_time,
                }),
            )?;
        }

        Commands::Timestamp { value } => match Timestamp::parse(&value) {
            Some(ts) => {
                output(
                    &cli.format,
                    &serde_json::json!({
                        "timestamp": ts.to_string(),
                        "millis": ts.millis(),
                        "counter": ts.counter(),
                        "node": ts.node(),
                        "hash": ts.hash(),
                        "key": hlc_relay::trie::key_for(ts.millis())
                            .iter()
                            .map(|d| char::from(b'0' + d))
                            .collect::<String>(),
                    }),
                )?;
            }
            None => {
                output(
                    &cli.format,
                    &serde_json::json!({
                        "status": "error",
                        "message": format!("Invalid timestamp: {}", value)
                    }),
                )?;
                std::process::exit(1);
            }
        },

        Commands::Ping { url } => ping(&cli.format, url)?,
    }

    Ok(())
}

#[cfg(feature = "server")]
fn serve(config: &RelayConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(hlc_relay::relay::serve(config))?;
    Ok(())
}

#[cfg(not(feature = "server"))]
fn serve(_config: &RelayConfig) -> anyhow::Result<()> {
    anyhow::bail!("Server feature not enabled. Compile with --features server")
}

fn ping(format: &OutputFormat, url: Option<String>) -> anyhow::Result<()> {
    let mut sync_config = hlc_relay::SyncConfig::from_env();
    if let Some(url) = url {
        sync_config = sync_config.with_url(url);
    }
    let api_url = sync_config.api_url.clone();
    let client = hlc_relay::SyncClient::new(sync_config)?;
    ping_with(format, &api_url, &client)
}

#[cfg(feature = "sync")]
fn ping_with(
    format: &OutputFormat,
    api_url: &str,
    client: &hlc_relay::SyncClient,
) -> anyhow::Result<()> {
    let healthy = client.health()?;
    output(
        format,
        &serde_json::json!({ "url": api_url, "healthy": healthy }),
    )?;
    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(not(feature = "sync"))]
fn ping_with(
    _format: &OutputFormat,
    _api_url: &str,
    _client: &hlc_relay::SyncClient,
) -> anyhow::Result<()> {
    anyhow::bail!("Sync feature not enabled. Compile with --features sync")
}

fn open_store(path: &Path) -> anyhow::Result<MessageStore> {
    Ok(MessageStore::open(path)?)
}

fn read_trie(path: &Path) -> anyhow::Result<MerkleNode> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
