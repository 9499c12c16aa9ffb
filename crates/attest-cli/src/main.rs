#![forbid(unsafe_code)]

mod rpc_client;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use time::OffsetDateTime;

use attest_core::{codec, compute_entry_hash, crypto, ConfigEntry, Hash32, Operation, SECRET_KEY_LEN};
use rpc_client::RpcClient;

#[derive(Parser, Debug)]
#[command(name = "attest-cli", version, about = "Author and verifier client for an attest node")]
struct Cli {
    /// Node RPC address.
    #[arg(long, default_value = "127.0.0.1:9090")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a fresh Ed25519 key pair.
    Keygen,
    /// Sign and submit a SET for a key.
    Set {
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: String,
        /// Author id registered on the node.
        #[arg(long, default_value = "admin")]
        author: String,
        /// Author's secret key (hex).
        #[arg(long)]
        secret_key: String,
    },
    /// Sign and submit a DELETE for a key.
    Delete {
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "admin")]
        author: String,
        #[arg(long)]
        secret_key: String,
    },
    /// Print the node's current version, state root, and head entry hash.
    Root,
    /// Fetch an inclusion proof and verify it against the published root.
    Audit {
        #[arg(long)]
        key: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(&cli.addr);

    match cli.command {
        Commands::Keygen => run_keygen(),
        Commands::Set {
            key,
            value,
            author,
            secret_key,
        } => run_mutation(&client, &key, value.into_bytes(), &author, &secret_key, Operation::Set),
        Commands::Delete {
            key,
            author,
            secret_key,
        } => run_mutation(&client, &key, Vec::new(), &author, &secret_key, Operation::Delete),
        Commands::Root => run_root(&client),
        Commands::Audit { key } => run_audit(&client, &key),
    }
}

fn run_keygen() -> Result<()> {
    let (public, secret) = crypto::generate_keypair();
    println!("Secret key (hex): {}", hex::encode(secret));
    println!("Public key (hex): {}", hex::encode(public));
    println!();
    println!("Use the public key to start the node (--trusted-keys).");
    println!("Use the secret key to sign entries (--secret-key).");
    Ok(())
}

/// Build, sign, and submit one entry.
///
/// The author derives the next index and prev hash from the node's head:
/// optimistic concurrency, a concurrent writer simply makes this submission
/// fail with INVALID_INDEX and it can be retried.
fn run_mutation(
    client: &RpcClient,
    key: &str,
    value: Vec<u8>,
    author: &str,
    secret_key_hex: &str,
    operation: Operation,
) -> Result<()> {
    let secret = hex::decode(secret_key_hex.trim())?;
    if secret.len() != SECRET_KEY_LEN {
        bail!("secret key must be {SECRET_KEY_LEN} bytes of hex");
    }

    let head = client.get_latest_root()?;
    let (index, prev_hash) = match head.last_entry_hash {
        Some(h) => (head.version + 1, h),
        None => (0, Hash32::zero()),
    };

    let mut entry = ConfigEntry {
        index,
        timestamp: OffsetDateTime::now_utc().unix_timestamp_nanos() as i64,
        author_id: author.to_string(),
        key: key.as_bytes().to_vec(),
        value: value.clone(),
        value_digest: crypto::hash(&value),
        operation,
        prev_hash,
        entry_hash: Hash32::zero(),
        signature: Vec::new(),
    };
    entry.entry_hash = compute_entry_hash(&entry)?;
    entry.signature = crypto::sign(&secret, entry.entry_hash.as_bytes())?;

    let entry_hex = hex::encode(codec::to_bytes(&entry)?);
    client.propose_entry(&entry_hex)?;
    println!("accepted index={index} entry_hash={}", entry.entry_hash);
    Ok(())
}

fn run_root(client: &RpcClient) -> Result<()> {
    let info = client.get_latest_root()?;
    println!("version:         {}", info.version);
    println!("state_root:      {}", info.state_root);
    match info.last_entry_hash {
        Some(h) => println!("last_entry_hash: {h}"),
        None => println!("last_entry_hash: (empty log)"),
    }
    Ok(())
}

/// Fetch a proof and check it locally. The node is untrusted here: a proof
/// that fails against the published root means a lying or corrupted node.
fn run_audit(client: &RpcClient, key: &str) -> Result<()> {
    let info = client.get_latest_root()?;
    let proof = client.get_proof(key)?;

    if !proof.verify(&info.state_root) {
        return Err(anyhow!(
            "PROOF INVALID: key {key:?} does not verify against root {} (version {})",
            info.state_root,
            info.version
        ));
    }

    println!("OK: proof for {key:?} verifies");
    println!("value_digest: {}", proof.value_digest);
    println!("root:         {} (version {})", info.state_root, info.version);
    println!("path length:  {}", proof.siblings.len());
    Ok(())
}
