//! Minimal JSON-lines RPC client.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use attest_core::Hash32;
use attest_state::Proof;

/// One node's view of `(version, root, head)`.
pub struct RootInfo {
    pub version: u64,
    pub state_root: Hash32,
    pub last_entry_hash: Option<Hash32>,
}

pub struct RpcClient {
    addr: String,
}

impl RpcClient {
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
        }
    }

    fn send(&self, req: Value) -> Result<Value> {
        let mut stream = TcpStream::connect(&self.addr)?;
        stream.write_all(req.to_string().as_bytes())?;
        stream.write_all(b"\n")?;
        let mut reader = BufReader::new(stream);
        let mut resp = String::new();
        reader.read_line(&mut resp)?;
        Ok(serde_json::from_str(&resp)?)
    }

    /// Send a request and fail with the node's error code when `ok` is
    /// false.
    fn call(&self, req: Value) -> Result<Value> {
        let v = self.send(req)?;
        if v.get("ok").and_then(|o| o.as_bool()) == Some(true) {
            return Ok(v);
        }
        let code = v.get("code").and_then(|c| c.as_str()).unwrap_or("UNKNOWN");
        let detail = v.get("error").and_then(|e| e.as_str()).unwrap_or("");
        Err(anyhow!("{code}: {detail}"))
    }

    pub fn get_latest_root(&self) -> Result<RootInfo> {
        let v = self.call(json!({"method": "get_latest_root"}))?;
        let version = v
            .get("version")
            .and_then(|n| n.as_u64())
            .ok_or_else(|| anyhow!("missing version"))?;
        let state_root: Hash32 = v
            .get("state_root")
            .and_then(|s| s.as_str())
            .ok_or_else(|| anyhow!("missing state_root"))?
            .parse()?;
        let head = v
            .get("last_entry_hash")
            .and_then(|s| s.as_str())
            .unwrap_or("");
        let last_entry_hash = if head.is_empty() {
            None
        } else {
            Some(head.parse()?)
        };
        Ok(RootInfo {
            version,
            state_root,
            last_entry_hash,
        })
    }

    pub fn propose_entry(&self, entry_hex: &str) -> Result<()> {
        self.call(json!({"method": "propose_entry", "entry_hex": entry_hex}))?;
        Ok(())
    }

    pub fn get_proof(&self, key: &str) -> Result<Proof> {
        let v = self.call(json!({"method": "get_proof", "key": key}))?;
        let value_digest: Hash32 = v
            .get("value_digest")
            .and_then(|s| s.as_str())
            .ok_or_else(|| anyhow!("missing value_digest"))?
            .parse()?;
        let siblings = v
            .get("siblings")
            .and_then(|s| s.as_array())
            .ok_or_else(|| anyhow!("missing siblings"))?
            .iter()
            .map(|s| {
                s.as_str()
                    .ok_or_else(|| anyhow!("bad sibling"))?
                    .parse::<Hash32>()
                    .map_err(Into::into)
            })
            .collect::<Result<Vec<_>>>()?;
        let sibling_is_left = v
            .get("sibling_is_left")
            .and_then(|s| s.as_array())
            .ok_or_else(|| anyhow!("missing sibling_is_left"))?
            .iter()
            .map(|b| b.as_bool().ok_or_else(|| anyhow!("bad direction bit")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Proof {
            key: key.as_bytes().to_vec(),
            value_digest,
            siblings,
            sibling_is_left,
        })
    }
}
