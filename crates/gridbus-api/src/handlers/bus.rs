//! /bus/{*address}: deliver the request body to a bus address.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use gridbus_services::gridfs::UNSUPPORTED_BODY;
use gridbus_services::{Message, Reply};

use super::{status_for, ApiState};

pub async fn handle_bus_send(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message = match message_from_body(&headers, body) {
        Some(m) => m,
        None => {
            let reply = Reply::error(gridbus_services::ErrorKind::Routing, UNSUPPORTED_BODY);
            return reply_response(reply);
        }
    };

    tracing::debug!(address, "bus request");
    reply_response(state.bus.send(&address, message).await)
}

/// JSON content types become JSON messages, everything else is binary.
/// `None` when a JSON body is not an object.
fn message_from_body(headers: &HeaderMap, body: Bytes) -> Option<Message> {
    if !is_json(headers) {
        return Some(Message::Binary(body));
    }
    match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(fields)) => Some(Message::Json(fields)),
        _ => None,
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn reply_response(reply: Reply) -> Response {
    match reply {
        Reply::Binary(data) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            data,
        )
            .into_response(),
        Reply::Json(fields) => (StatusCode::OK, Json(Value::Object(fields))).into_response(),
        Reply::Error { kind, ref message } => {
            let status = status_for(kind);
            if status.is_server_error() {
                tracing::warn!(error = %message, "bus request failed");
            }
            let body = reply.to_json().unwrap_or(Value::Null);
            (status, Json(body)).into_response()
        }
    }
}
