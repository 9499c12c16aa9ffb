#![forbid(unsafe_code)]

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use attest_core::PUBLIC_KEY_LEN;
use attest_node::{rpc, Node, NodeConfig};
use attest_store::{FileStore, SledStore, Store};

#[derive(Parser, Debug)]
#[command(name = "attest-node", version, about = "Verifiable configuration store node")]
struct Cli {
    /// RPC listen port.
    #[arg(long, default_value_t = 9090)]
    port: u16,

    /// Data directory for the persisted log.
    #[arg(long, default_value = "./data")]
    data: PathBuf,

    /// Comma-separated trusted Ed25519 public keys in hex. The first key
    /// is author `admin`, subsequent keys `admin-1`, `admin-2`, ...
    #[arg(long)]
    trusted_keys: String,

    /// Storage backend.
    #[arg(long, value_enum, default_value = "table")]
    storage: Backend,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Sled table keyed by entry index.
    Table,
    /// Flat file of length-prefixed records.
    File,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let trusted_authors = parse_trusted_keys(&cli.trusted_keys)?;
    if trusted_authors.is_empty() {
        bail!("--trusted-keys must list at least one public key");
    }

    std::fs::create_dir_all(&cli.data)
        .with_context(|| format!("failed to create data dir {}", cli.data.display()))?;

    let store: Box<dyn Store> = match cli.storage {
        Backend::Table => {
            let path = cli.data.join("entries.db");
            info!(path = %path.display(), "using table storage");
            Box::new(SledStore::open(&path)?)
        }
        Backend::File => {
            let path = cli.data.join("log.bin");
            info!(path = %path.display(), "using file storage");
            Box::new(FileStore::open(&path)?)
        }
    };

    let node = Node::open(NodeConfig { trusted_authors }, store)
        .context("failed to open node (corrupt store?)")?;
    let node = Arc::new(node);

    let listener = TcpListener::bind(("0.0.0.0", cli.port))
        .with_context(|| format!("failed to bind port {}", cli.port))?;
    info!(port = cli.port, "attest node started");

    rpc::serve(listener, node)?;
    Ok(())
}

/// Parse the comma-separated hex key list into `(author_id, key)` pairs.
///
/// Author ids are positional: the first key is `admin`, later keys
/// `admin-1`, `admin-2`, ... Client signing identity is therefore tied to
/// startup order; keep the list stable across restarts.
fn parse_trusted_keys(list: &str) -> Result<Vec<(String, Vec<u8>)>> {
    let mut authors = Vec::new();
    for (i, part) in list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        let key = hex::decode(part).with_context(|| format!("key {i} is not valid hex"))?;
        if key.len() != PUBLIC_KEY_LEN {
            bail!(
                "key {i} has wrong length: expected {PUBLIC_KEY_LEN} bytes, got {}",
                key.len()
            );
        }
        let id = if i == 0 {
            "admin".to_string()
        } else {
            format!("admin-{i}")
        };
        authors.push((id, key));
    }
    Ok(authors)
}
