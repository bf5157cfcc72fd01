//! File commands: split a file into chunks and reassemble it.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use gridbus_core::{FileInfo, ObjectId};

use super::chunks::{Target, fetch_chunk, save_chunk};
use super::http::{bus_url, post_message, reply_json};

/// GridFS default chunk size (255 KiB).
pub const DEFAULT_CHUNK_SIZE: u32 = 255 * 1024;

/// Split `data` into `chunk_size` pieces; the last may be shorter.
pub fn split_chunks(data: &[u8], chunk_size: u32) -> impl Iterator<Item = &[u8]> {
    data.chunks(chunk_size.max(1) as usize)
}

pub async fn cmd_put_file(target: Target<'_>, path: &str, chunk_size: Option<&str>) -> Result<()> {
    let chunk_size = match chunk_size {
        Some(s) => s
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .with_context(|| format!("--chunk-size must be a positive integer, got {}", s))?,
        None => DEFAULT_CHUNK_SIZE,
    };
    let data = std::fs::read(path).with_context(|| format!("failed to read file: {}", path))?;
    let id = ObjectId::new().to_hex();

    let mut count = 0u32;
    for (n, piece) in split_chunks(&data, chunk_size).enumerate() {
        save_chunk(target, &id, n as u32, piece).await?;
        count += 1;
    }

    let mut fields = Map::new();
    fields.insert("id".into(), Value::from(id.as_str()));
    fields.insert("length".into(), Value::from(data.len() as u64));
    fields.insert("chunkSize".into(), Value::from(chunk_size));
    if let Some(name) = std::path::Path::new(path).file_name().and_then(|n| n.to_str()) {
        fields.insert("filename".into(), Value::from(name));
    }
    let body = target.action("saveFile", fields);
    let resp = post_message(&bus_url(target.port, target.address), &body).await?;
    reply_json(resp).await.context("saving file document")?;

    println!("Stored {} ({} bytes, {} chunks).", path, data.len(), count);
    println!("{}", id);
    Ok(())
}

pub async fn cmd_get_file(target: Target<'_>, id: &str, out: &str) -> Result<()> {
    let mut fields = Map::new();
    fields.insert("id".into(), Value::from(id));
    let body = target.action("getFile", fields);
    let resp = post_message(&bus_url(target.port, target.address), &body).await?;
    let reply = reply_json(resp).await.context("fetching file document")?;
    let info: FileInfo =
        serde_json::from_value(Value::Object(reply)).context("malformed file document")?;

    let file_target = Target {
        bucket: Some(info.bucket.as_str()),
        ..target
    };
    let mut data = Vec::with_capacity(info.length as usize);
    for n in 0..info.chunk_count() {
        data.extend(fetch_chunk(file_target, &info.id, n).await?);
    }
    if data.len() as u64 != info.length {
        bail!(
            "reassembled {} bytes but the file document says {}",
            data.len(),
            info.length
        );
    }

    std::fs::write(out, &data).with_context(|| format!("failed to write {}", out))?;
    println!(
        "Wrote {} ({} bytes, {} chunks).",
        out,
        data.len(),
        info.chunk_count()
    );
    Ok(())
}
