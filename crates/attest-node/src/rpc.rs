//! JSON-lines RPC surface over TCP.
//!
//! One JSON object per line in, one per line out. Entries travel as hex of
//! their canonical encoding so the node and external verifiers hash
//! identical bytes. Validation failures map 1:1 onto stable `code` strings;
//! a store failure is answered, logged, and then terminates the process,
//! because a node whose log and store disagree must not keep running.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use attest_core::codec;
use attest_log::LogError;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::NodeError;
use crate::node::Node;

/// Serve the RPC surface on `listener`, blocking the calling thread.
///
/// Each connection gets its own handler thread; the node's internal locks
/// do the serialization.
pub fn serve(listener: TcpListener, node: Arc<Node>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "rpc listening");
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let node = Arc::clone(&node);
                thread::spawn(move || handle_client(stream, node));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
    Ok(())
}

fn handle_client(stream: TcpStream, node: Arc<Node>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let reader = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!(peer, error = %e, "failed to clone stream");
            return;
        }
    };
    let mut reader = BufReader::new(reader);
    let mut writer = stream;
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let (resp, fatal) = match serde_json::from_str::<Value>(&line) {
            Ok(req) => handle_request(req, &node),
            Err(_) => (fail("INVALID_REQUEST", "invalid json"), false),
        };
        if writer.write_all(resp.to_string().as_bytes()).is_err() {
            break;
        }
        if writer.write_all(b"\n").is_err() {
            break;
        }
        if fatal {
            let _ = writer.flush();
            error!("store failure while the log had already accepted the entry; shutting down");
            let _ = node.close();
            std::process::exit(1);
        }
    }
}

/// Dispatch one request. The bool marks a fatal store failure.
fn handle_request(req: Value, node: &Node) -> (Value, bool) {
    let method = match req.get("method").and_then(|m| m.as_str()) {
        Some(m) => m,
        None => return (fail("INVALID_REQUEST", "missing method"), false),
    };

    match method {
        "ping" => (json!({"ok": true}), false),
        "propose_entry" => {
            let entry_hex = match req.get("entry_hex").and_then(|e| e.as_str()) {
                Some(e) => e,
                None => return (fail("INVALID_REQUEST", "missing entry_hex"), false),
            };
            let bytes = match hex::decode(entry_hex) {
                Ok(b) => b,
                Err(_) => return (fail("INVALID_REQUEST", "bad entry hex"), false),
            };
            let entry = match codec::decode_entry(&bytes) {
                Ok(e) => e,
                Err(_) => return (fail("INVALID_REQUEST", "undecodable entry"), false),
            };
            match node.propose_entry(&entry) {
                Ok(()) => (json!({"ok": true}), false),
                Err(e) => {
                    let fatal = matches!(e, NodeError::Store(_));
                    (node_error_response(&e), fatal)
                }
            }
        }
        "get_latest_root" => {
            let info = node.get_latest_root();
            (
                json!({
                    "ok": true,
                    "version": info.version,
                    "state_root": info.state_root.to_string(),
                    "last_entry_hash": info
                        .last_entry_hash
                        .map(|h| h.to_string())
                        .unwrap_or_default(),
                }),
                false,
            )
        }
        "get_proof" => {
            let key = match req.get("key").and_then(|k| k.as_str()) {
                Some(k) => k,
                None => return (fail("INVALID_REQUEST", "missing key"), false),
            };
            match node.get_proof(key.as_bytes()) {
                Ok(proof) => (
                    json!({
                        "ok": true,
                        "key": key,
                        "value_digest": proof.value_digest.to_string(),
                        "siblings": proof
                            .siblings
                            .iter()
                            .map(|s| s.to_string())
                            .collect::<Vec<_>>(),
                        "sibling_is_left": proof.sibling_is_left,
                    }),
                    false,
                ),
                Err(e) => (node_error_response(&e), false),
            }
        }
        _ => (fail("INVALID_REQUEST", "unknown method"), false),
    }
}

fn node_error_response(err: &NodeError) -> Value {
    fail(error_code(err), &err.to_string())
}

/// Stable 1:1 mapping from node errors to RPC failure codes.
fn error_code(err: &NodeError) -> &'static str {
    match err {
        NodeError::Log(LogError::InvalidIndex { .. }) => "INVALID_INDEX",
        NodeError::Log(LogError::InvalidPrevHash(_)) => "INVALID_PREV_HASH",
        NodeError::Log(LogError::InvalidHash { .. }) => "INVALID_HASH",
        NodeError::Log(LogError::UntrustedAuthor(_)) => "UNTRUSTED_AUTHOR",
        NodeError::Log(LogError::InvalidSignature) => "INVALID_SIGNATURE",
        NodeError::Log(LogError::OutOfRange { .. }) => "OUT_OF_RANGE",
        NodeError::Log(LogError::Codec(_)) => "INVALID_HASH",
        NodeError::State(_) => "KEY_NOT_FOUND",
        NodeError::Store(_) => "STORE_FAILURE",
        NodeError::Replay { .. } => "STORE_FAILURE",
        NodeError::Unwritable => "UNWRITABLE",
    }
}

fn fail(code: &str, detail: &str) -> Value {
    json!({"ok": false, "code": code, "error": detail})
}
