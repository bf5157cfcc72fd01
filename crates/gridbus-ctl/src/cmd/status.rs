//! Daemon status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    address: String,
    backend: String,
    default_bucket: String,
    chunks: u64,
    bytes: u64,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Gridbus Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Address        : {}", resp.address);
    println!("  Backend        : {}", resp.backend);
    println!("  Default bucket : {}", resp.default_bucket);
    println!("  Chunks stored  : {}", resp.chunks);
    println!(
        "  Bytes stored   : {} ({:.1} KB)",
        resp.bytes,
        resp.bytes as f64 / 1024.0
    );

    Ok(())
}
