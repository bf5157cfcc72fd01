//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Map, Value};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

/// URL that delivers a request body to `address` on the bus.
pub fn bus_url(port: u16, address: &str) -> String {
    format!("{}/bus/{}", base_url(port), address)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to gridbusd at {} (is it running?)", url))?
        .json::<T>()
        .await
        .context("failed to parse response")
}

/// POST a binary frame.
pub async fn post_bytes(url: &str, body: impl Into<reqwest::Body>) -> Result<reqwest::Response> {
    reqwest::Client::new()
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to gridbusd at {} (is it running?)", url))
}

/// POST a JSON message.
pub async fn post_message(url: &str, body: &Value) -> Result<reqwest::Response> {
    reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to gridbusd at {} (is it running?)", url))
}

/// Parse a JSON reply, turning `{"status":"error"}` into an error.
pub async fn reply_json(resp: reqwest::Response) -> Result<Map<String, Value>> {
    let body: Value = resp.json().await.context("failed to parse response")?;
    check_reply(body)
}

/// Read a binary reply. Error replies arrive as JSON with a non-2xx status.
pub async fn reply_bytes(resp: reqwest::Response) -> Result<Vec<u8>> {
    if !resp.status().is_success() {
        reply_json(resp).await?;
        bail!("request failed");
    }
    let body = resp.bytes().await.context("failed to read response")?;
    Ok(body.to_vec())
}

pub fn check_reply(body: Value) -> Result<Map<String, Value>> {
    let fields = match body {
        Value::Object(fields) => fields,
        other => bail!("unexpected reply: {}", other),
    };
    match fields.get("status").and_then(Value::as_str) {
        Some("ok") => Ok(fields),
        _ => {
            let message = fields
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            bail!("gridbusd: {}", message)
        }
    }
}
