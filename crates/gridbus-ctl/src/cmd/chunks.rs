//! Chunk commands: save and fetch single chunks.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use gridbus_core::frame;

use super::http::{bus_url, post_bytes, post_message, reply_bytes, reply_json};

/// Where requests go: daemon port, bus address and optional bucket.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub port: u16,
    pub address: &'a str,
    pub bucket: Option<&'a str>,
}

impl Target<'_> {
    /// `files_id`, `n` and, when set, `bucket`.
    pub fn chunk_fields(&self, files_id: &str, n: u32) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("files_id".into(), Value::from(files_id));
        fields.insert("n".into(), Value::from(n));
        if let Some(bucket) = self.bucket {
            fields.insert("bucket".into(), Value::from(bucket));
        }
        fields
    }

    /// A JSON message for the base address.
    pub fn action(&self, action: &str, mut fields: Map<String, Value>) -> Value {
        fields.insert("action".into(), Value::from(action));
        if let Some(bucket) = self.bucket {
            fields
                .entry("bucket")
                .or_insert_with(|| Value::from(bucket));
        }
        Value::Object(fields)
    }
}

pub async fn save_chunk(target: Target<'_>, files_id: &str, n: u32, data: &[u8]) -> Result<()> {
    let raw = frame::encode(&target.chunk_fields(files_id, n), data)
        .context("failed to encode chunk frame")?;
    let url = bus_url(target.port, &format!("{}/saveChunk", target.address));
    let resp = post_bytes(&url, raw).await?;
    reply_json(resp)
        .await
        .with_context(|| format!("saving chunk {} of {}", n, files_id))?;
    Ok(())
}

pub async fn fetch_chunk(target: Target<'_>, files_id: &str, n: u32) -> Result<Vec<u8>> {
    let body = target.action("getChunk", target.chunk_fields(files_id, n));
    let resp = post_message(&bus_url(target.port, target.address), &body).await?;
    reply_bytes(resp)
        .await
        .with_context(|| format!("fetching chunk {} of {}", n, files_id))
}

pub fn parse_n(n: &str) -> Result<u32> {
    n.parse()
        .with_context(|| format!("chunk index must be a non-negative integer, got {}", n))
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_put_chunk(target: Target<'_>, files_id: &str, n: &str, path: &str) -> Result<()> {
    let n = parse_n(n)?;
    let data = std::fs::read(path).with_context(|| format!("failed to read file: {}", path))?;
    save_chunk(target, files_id, n, &data).await?;
    println!("Saved chunk {} of {} ({} bytes).", n, files_id, data.len());
    Ok(())
}

pub async fn cmd_get_chunk(
    target: Target<'_>,
    files_id: &str,
    n: &str,
    out: Option<&str>,
) -> Result<()> {
    let n = parse_n(n)?;
    let data = fetch_chunk(target, files_id, n).await?;
    match out {
        Some(path) => {
            std::fs::write(path, &data).with_context(|| format!("failed to write {}", path))?;
            println!("Wrote {} bytes to {}.", data.len(), path);
        }
        None => std::io::stdout()
            .write_all(&data)
            .context("failed to write to stdout")?,
    }
    Ok(())
}
