use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::json;

use gridbus_core::frame::PARSE_ERROR_MESSAGE;
use gridbus_services::{ErrorKind, Message, Reply};

use crate::*;

async fn save(raw: Bytes) -> Reply {
    memory_bus().send(SAVE_CHUNK, Message::Binary(raw)).await
}

#[tokio::test]
async fn test_empty_message_is_a_parse_error() {
    let reply = save(Bytes::new()).await;
    assert_eq!(reply, Reply::error(ErrorKind::Decode, PARSE_ERROR_MESSAGE));
    assert_eq!(
        reply.to_json().unwrap(),
        json!({"status": "error", "message": PARSE_ERROR_MESSAGE})
    );
}

#[tokio::test]
async fn test_malformed_metadata_is_a_parse_error() {
    // declared length runs one byte into the payload
    let text = b"{\"property\": 1";
    let mut buf = BytesMut::new();
    buf.put_u32(15);
    buf.put_slice(text);
    buf.put_slice(&[0u8; 10]);

    let reply = save(buf.freeze()).await;
    assert_eq!(reply.error_message(), Some(PARSE_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_length_prefix_past_end_is_a_parse_error() {
    let mut buf = BytesMut::new();
    buf.put_u32(1_000);
    buf.put_slice(b"{}");
    let reply = save(buf.freeze()).await;
    assert_eq!(reply.error_message(), Some(PARSE_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_non_object_metadata_is_a_parse_error() {
    let mut buf = BytesMut::new();
    buf.put_u32(5);
    buf.put_slice(b"[1,2]");
    buf.put_slice(b"payload");
    let reply = save(buf.freeze()).await;
    assert_eq!(reply.error_message(), Some(PARSE_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_empty_payload_is_missing_data() {
    let reply = save(frame(json!({}), &[])).await;
    assert_eq!(
        reply.to_json().unwrap(),
        json!({"status": "error", "message": "chunk data is missing"})
    );
}

#[tokio::test]
async fn test_missing_files_id() {
    let reply = save(frame(json!({}), &[0u8; 10])).await;
    assert_eq!(reply.error_message(), Some("files_id must be specified"));
}

#[tokio::test]
async fn test_empty_files_id_counts_as_missing() {
    let reply = save(frame(json!({"files_id": "", "n": 0}), &[0u8; 10])).await;
    assert_eq!(reply.error_message(), Some("files_id must be specified"));
}

#[tokio::test]
async fn test_missing_n() {
    let reply = save(frame(json!({"files_id": FILES_ID}), &[0u8; 10])).await;
    assert_eq!(reply.error_message(), Some("n must be specified"));
}

#[tokio::test]
async fn test_valid_save_then_get() {
    let bus = memory_bus();
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
}

#[tokio::test]
async fn test_concurrent_saves_are_independent() {
    let bus = Arc::new(memory_bus());
    let mut tasks = Vec::new();
    for n in 0..16u32 {
        let bus = bus.clone();
        tasks.push(tokio::spawn(async move {
            let raw = frame(json!({"files_id": FILES_ID, "n": n}), &[n as u8; 32]);
            bus.send(SAVE_CHUNK, Message::Binary(raw)).await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    for n in 0..16u32 {
        let reply = bus
            .send(
                ADDRESS,
                json_message(json!({"action": "getChunk", "files_id": FILES_ID, "n": n})),
            )
            .await;
        assert_eq!(reply, Reply::Binary(Bytes::from(vec![n as u8; 32])));
    }
}
