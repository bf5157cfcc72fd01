//! The HTTP adapter in front of a real bus.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use gridbus_api::ApiState;
use gridbus_core::config::GridbusConfig;
use gridbus_core::frame::PARSE_ERROR_MESSAGE;
use gridbus_services::{ChunkStore, MemoryChunkStore};

use crate::*;

/// A running API server. Stops when dropped.
struct Api {
    base: String,
    _stop: oneshot::Sender<()>,
}

async fn spawn_api() -> Result<Api> {
    let config = GridbusConfig::default();
    let store: Arc<dyn ChunkStore> = Arc::new(MemoryChunkStore::new());
    let bus = Arc::new(bus_with(store.clone()));
    let state = ApiState::new(&config, bus, store);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = stopped.await;
        };
        let _ = gridbus_api::serve_on(listener, state, shutdown).await;
    });

    Ok(Api {
        base: format!("http://127.0.0.1:{}/api", port),
        _stop: stop,
    })
}

async fn post_binary(url: &str, body: bytes::Bytes) -> Result<reqwest::Response> {
    reqwest::Client::new()
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .send()
        .await
        .with_context(|| format!("POST {url}"))
}

async fn post_json(url: &str, body: &Value) -> Result<reqwest::Response> {
    reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("POST {url}"))
}

#[tokio::test]
async fn test_http_save_and_get_chunk() -> Result<()> {
    let api = spawn_api().await?;
    let payload: Vec<u8> = (0u8..10).collect();

    let resp = post_binary(
        &format!("{}/bus/{}", api.base, SAVE_CHUNK),
        frame(json!({"files_id": FILES_ID, "n": 0, "bucket": "it"}), &payload),
    )
    .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().await?, json!({"status": "ok"}));

    let resp = post_json(
        &format!("{}/bus/{}", api.base, ADDRESS),
        &json!({"action": "getChunk", "files_id": FILES_ID, "n": 0, "bucket": "it"}),
    )
    .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()[reqwest::header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(resp.bytes().await?.to_vec(), payload);

    let status: Value = reqwest::get(format!("{}/status", api.base))
        .await?
        .json()
        .await?;
    assert_eq!(status["address"], "gridfs");
    assert_eq!(status["default_bucket"], "fs");
    assert_eq!(status["chunks"], 1);
    assert_eq!(status["bytes"], 10);
    Ok(())
}

#[tokio::test]
async fn test_http_status_codes() -> Result<()> {
    let api = spawn_api().await?;
    let save_url = format!("{}/bus/{}", api.base, SAVE_CHUNK);

    // decode error
    let resp = post_binary(&save_url, bytes::Bytes::new()).await?;
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.json::<Value>().await?,
        json!({"status": "error", "message": PARSE_ERROR_MESSAGE})
    );

    // validation error
    let resp = post_binary(&save_url, frame(json!({}), &[0u8; 10])).await?;
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.json::<Value>().await?["message"],
        "files_id must be specified"
    );

    // not found
    let resp = post_json(
        &format!("{}/bus/{}", api.base, ADDRESS),
        &json!({"action": "getChunk", "files_id": FILES_ID, "n": 3}),
    )
    .await?;
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.json::<Value>().await?["message"], "chunk not found");

    // routing
    let resp = post_json(&format!("{}/bus/nowhere", api.base), &json!({})).await?;
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.json::<Value>().await?["message"],
        "no handler registered for address nowhere"
    );
    Ok(())
}

#[tokio::test]
async fn test_http_json_body_must_be_object() -> Result<()> {
    let api = spawn_api().await?;
    let resp = post_json(&format!("{}/bus/{}", api.base, ADDRESS), &json!([1, 2, 3])).await?;
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.json::<Value>().await?["message"],
        "unsupported message body"
    );
    Ok(())
}
