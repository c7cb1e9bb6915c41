// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! JSON-RPC message shapes and Content-Length framing.

use anyhow::{Context, Result, anyhow};
use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC `MethodNotFound`.
pub const METHOD_NOT_FOUND: i64 = -32601;

const JSONRPC_VERSION: &str = "2.0";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

fn default_null() -> Value {
    Value::Null
}

/// A request, sent by either side.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestMessage {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default = "default_null")]
    pub params: Value,
}

impl RequestMessage {
    pub fn new(id: RequestId, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// A response to a request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseMessage {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ResponseMessage {
    /// Error reply for a server-to-client request the client does not handle.
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: None,
            error: Some(ResponseError {
                code: METHOD_NOT_FOUND,
                message: format!("Method '{method}' not supported by client"),
                data: None,
            }),
        }
    }
}

/// A notification; no response is expected.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationMessage {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default = "default_null")]
    pub params: Value,
}

impl NotificationMessage {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A decoded message arriving from the server.
#[derive(Debug)]
pub enum ServerMessage {
    Response(ResponseMessage),
    Request(RequestMessage),
    Notification(NotificationMessage),
}

impl ServerMessage {
    /// Sorts a raw JSON-RPC body into response, request or notification.
    pub fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body).context("Invalid JSON-RPC body")?;

        let has_id = value.get("id").is_some_and(|id| !id.is_null());
        let message = match (value.get("method").is_some(), has_id) {
            (true, true) => Self::Request(serde_json::from_value(value)?),
            (true, false) => Self::Notification(serde_json::from_value(value)?),
            (false, true) => Self::Response(serde_json::from_value(value)?),
            (false, false) => return Err(anyhow!("Unknown message format: {body}")),
        };

        Ok(message)
    }
}

/// Serializes a message with its Content-Length header.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(message)?;
    let mut framed = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Takes one complete message body off the front of `buffer`.
///
/// Returns `Ok(None)` and leaves the buffer alone until a whole frame has
/// arrived.
pub fn try_parse_message(buffer: &mut BytesMut) -> Result<Option<String>> {
    let Some(header_len) = buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
    else {
        return Ok(None);
    };

    let headers = std::str::from_utf8(&buffer[..header_len]).context("Non-UTF-8 LSP headers")?;
    let content_len = content_length(headers)?;
    let body_start = header_len + HEADER_TERMINATOR.len();

    if buffer.len() < body_start + content_len {
        return Ok(None);
    }

    buffer.advance(body_start);
    let body = buffer.split_to(content_len);
    Ok(Some(String::from_utf8(body.to_vec())?))
}

fn content_length(headers: &str) -> Result<usize> {
    headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .ok_or_else(|| anyhow!("Missing Content-Length header"))
        .and_then(|(_, value)| {
            value
                .trim()
                .parse()
                .with_context(|| format!("Invalid Content-Length: {value}"))
        })
}
