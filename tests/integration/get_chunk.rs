use bytes::Bytes;
use serde_json::json;

use gridbus_services::{ErrorKind, Message, Reply};

use crate::*;

#[tokio::test]
async fn test_get_absent_chunk_is_not_found() {
    let reply = memory_bus()
        .send(
            ADDRESS,
            json_message(json!({"action": "getChunk", "files_id": FILES_ID, "n": 9})),
        )
        .await;
    assert_eq!(reply, Reply::error(ErrorKind::NotFound, "chunk not found"));
}

#[tokio::test]
async fn test_buckets_are_separate_namespaces() {
    let bus = memory_bus();
    let reply = bus
        .send(
            SAVE_CHUNK,
            Message::Binary(frame(
                json!({"files_id": FILES_ID, "n": 0, "bucket": "photos"}),
                b"in photos",
            )),
        )
        .await;
    assert!(reply.is_ok());

    // default bucket "fs" has nothing under that key
    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({"action": "getChunk", "files_id": FILES_ID, "n": 0})),
        )
        .await;
    assert_eq!(reply.error_message(), Some("chunk not found"));

    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({
                "action": "getChunk",
                "files_id": FILES_ID,
                "n": 0,
                "bucket": "photos"
            })),
        )
        .await;
    assert_eq!(reply, Reply::Binary(Bytes::from_static(b"in photos")));
}

#[tokio::test]
async fn test_resave_overwrites() {
    let bus = memory_bus();
    for payload in [&b"first"[..], &b"second"[..]] {
        let reply = bus
            .send(
                SAVE_CHUNK,
                Message::Binary(frame(json!({"files_id": FILES_ID, "n": 2}), payload)),
            )
            .await;
        assert!(reply.is_ok());
    }

    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({"action": "getChunk", "files_id": FILES_ID, "n": 2})),
        )
        .await;
    assert_eq!(reply, Reply::Binary(Bytes::from_static(b"second")));
}

#[tokio::test]
async fn test_unknown_address_and_action() {
    let bus = memory_bus();
    let reply = bus.send("elsewhere", json_message(json!({}))).await;
    assert_eq!(
        reply,
        Reply::error(
            ErrorKind::Routing,
            "no handler registered for address elsewhere"
        )
    );

    let reply = bus
        .send(ADDRESS, json_message(json!({"action": "removeChunk"})))
        .await;
    assert_eq!(
        reply.error_message(),
        Some("action removeChunk is not supported")
    );
}
