use serde_json::json;

use gridbus_core::{FileInfo, ObjectId};
use gridbus_services::{EventBus, Message, Reply};

use crate::*;

/// Store `data` as chunks of `chunk_size` plus a file document; returns the id.
async fn store_file(bus: &EventBus, data: &[u8], chunk_size: u32) -> String {
    let id = ObjectId::new().to_hex();
    for (n, piece) in data.chunks(chunk_size as usize).enumerate() {
        let reply = bus
            .send(
                SAVE_CHUNK,
                Message::Binary(frame(json!({"files_id": id, "n": n}), piece)),
            )
            .await;
        assert!(reply.is_ok(), "chunk {n}: {reply:?}");
    }

    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({
                "action": "saveFile",
                "id": id,
                "length": data.len(),
                "chunkSize": chunk_size,
                "filename": "report.bin",
                "contentType": "application/octet-stream"
            })),
        )
        .await;
    let body = reply.to_json().unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["id"], id.as_str());
    id
}

#[tokio::test]
async fn test_file_round_trip_through_chunks() {
    let bus = memory_bus();
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let id = store_file(&bus, &data, 256).await;

    let reply = bus
        .send(ADDRESS, json_message(json!({"action": "getFile", "id": id})))
        .await;
    let mut doc = object(reply.to_json().unwrap());
    assert_eq!(doc.remove("status"), Some(json!("ok")));
    let info: FileInfo = serde_json::from_value(serde_json::Value::Object(doc)).unwrap();
    assert_eq!(info.length, 1000);
    assert_eq!(info.chunk_size, 256);
    assert_eq!(info.chunk_count(), 4);
    assert_eq!(info.filename.as_deref(), Some("report.bin"));
    assert!(info.upload_date > 0);

    let mut rebuilt = Vec::new();
    for n in 0..info.chunk_count() {
        match bus
            .send(
                ADDRESS,
                json_message(json!({"action": "getChunk", "files_id": id, "n": n})),
            )
            .await
        {
            Reply::Binary(piece) => rebuilt.extend_from_slice(&piece),
            other => panic!("chunk {n}: {other:?}"),
        }
    }
    assert_eq!(rebuilt, data);
}

#[tokio::test]
async fn test_get_missing_file() {
    let reply = memory_bus()
        .send(
            ADDRESS,
            json_message(json!({"action": "getFile", "id": FILES_ID})),
        )
        .await;
    assert_eq!(reply.error_message(), Some("file not found"));
}

#[tokio::test]
async fn test_save_file_without_id_generates_one() {
    let bus = memory_bus();
    let reply = bus
        .send(
            ADDRESS,
            json_message(json!({"action": "saveFile", "length": 0, "chunkSize": 1024})),
        )
        .await;
    let id = reply.to_json().unwrap()["id"].as_str().unwrap().to_string();
    let parsed: ObjectId = id.parse().unwrap();
    assert_eq!(parsed.to_hex(), id);
}
