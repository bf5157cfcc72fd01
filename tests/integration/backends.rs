//! The same protocol scenarios against every persistent backend.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;

use gridbus_core::config::{StorageBackend, StorageConfig};
use gridbus_services::{open_store, ChunkStore, Message, Reply, StoreStats};

use crate::*;

async fn round_trip(store: Arc<dyn ChunkStore>) {
    let bus = bus_with(store.clone());
    let payload: Vec<u8> = (0u8..10).collect();

    let reply = bus
        .send(
            SAVE_CHUNK,
            Message::Binary(frame(
                json!({"files_id": FILES_ID, "n": 0, "bucket": "it"}),
                &payload,
            )),
        )
        .await;
    assert_eq!(reply.to_json().unwrap(), json!({"status": "ok"}));

    // overwrite with the same key is idempotent
    let reply = bus
        .send(
            SAVE_CHUNK,
            Message::Binary(frame(
                json!({"files_id": FILES_ID, "n": 0, "bucket": "it"}),
                &payload,
            )),
        )
        .await;
    assert!(reply.is_ok());

    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({
                "action": "getChunk",
                "files_id": FILES_ID,
                "n": 0,
                "bucket": "it"
            })),
        )
        .await;
    assert_eq!(reply, Reply::Binary(Bytes::from(payload)));

    assert_eq!(
        store.stats().await.unwrap(),
        StoreStats {
            chunks: 1,
            bytes: 10
        }
    );

    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({"action": "getChunk", "files_id": FILES_ID, "n": 1, "bucket": "it"})),
        )
        .await;
    assert_eq!(reply.error_message(), Some("chunk not found"));
}

#[tokio::test]
async fn test_fs_backend_round_trip() {
    let dir = temp_dir("fs");
    let store = open_store(&StorageConfig {
        backend: StorageBackend::Fs,
        path: dir.clone(),
    })
    .unwrap();
    round_trip(store).await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_sqlite_backend_round_trip() {
    let dir = temp_dir("sqlite");
    let store = open_store(&StorageConfig {
        backend: StorageBackend::Sqlite,
        path: dir.join("chunks.db"),
    })
    .unwrap();
    round_trip(store).await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_memory_backend_round_trip() {
    let store = open_store(&StorageConfig {
        backend: StorageBackend::Memory,
        path: Default::default(),
    })
    .unwrap();
    round_trip(store).await;
}

#[tokio::test]
async fn test_fs_backend_survives_reopen() {
    let dir = temp_dir("fs-reopen");
    let config = StorageConfig {
        backend: StorageBackend::Fs,
        path: dir.clone(),
    };

    let bus = bus_with(open_store(&config).unwrap());
    let reply = bus
        .send(
            SAVE_CHUNK,
            Message::Binary(frame(json!({"files_id": FILES_ID, "n": 5}), b"persisted")),
        )
        .await;
    assert!(reply.is_ok());
    drop(bus);

    let bus = bus_with(open_store(&config).unwrap());
    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({"action": "getChunk", "files_id": FILES_ID, "n": 5})),
        )
        .await;
    assert_eq!(reply, Reply::Binary(Bytes::from_static(b"persisted")));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_fs_backend_long_files_id_and_bucket() {
    let dir = temp_dir("fs-long");
    let store = open_store(&StorageConfig {
        backend: StorageBackend::Fs,
        path: dir.clone(),
    })
    .unwrap();
    let bus = bus_with(store);
    let files_id = "a".repeat(200);
    let bucket = "b".repeat(200);

    for meta in [
        json!({"files_id": files_id, "n": 0}),
        json!({"files_id": files_id, "n": 0, "bucket": bucket}),
    ] {
        let reply = bus
            .send(SAVE_CHUNK, Message::Binary(frame(meta, &[9u8; 10])))
            .await;
        assert_eq!(reply.to_json().unwrap(), json!({"status": "ok"}));
    }

    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({
                "action": "getChunk",
                "files_id": files_id,
                "n": 0,
                "bucket": bucket
            })),
        )
        .await;
    assert_eq!(reply, Reply::Binary(Bytes::from(vec![9u8; 10])));
    let _ = std::fs::remove_dir_all(&dir);
}
