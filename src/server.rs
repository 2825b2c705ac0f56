use crate::dune::DuneClient;
use crate::tools::{invoke, ToolRegistry};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub const SERVER_NAME: &str = "dune-echo-mcp";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    /// `None` only when the member is absent; an explicit `null` id is kept
    /// as `Some(Value::Null)` and still gets a reply.
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

pub struct ServerState {
    pub client: DuneClient,
    pub tools: ToolRegistry,
}

/// Serves newline-delimited JSON-RPC on stdin/stdout until stdin closes.
pub async fn run(client: DuneClient, tools: ToolRegistry) -> Result<()> {
    let state = Arc::new(ServerState { client, tools });
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    info!("MCP Server Ready. Waiting for JSON-RPC requests on stdin...");
    serve(state, stdin, tokio::io::stdout()).await?;
    info!("stdin closed, MCP server shutting down");

    Ok(())
}

/// Each request runs in its own task; a single writer task owns `writer` so
/// response frames never interleave. Returns the writer once every in-flight
/// request has been answered.
pub async fn serve<R, W>(state: Arc<ServerState>, mut reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(frame) = rx.recv().await {
            writer.write_all(frame.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<W, std::io::Error>(writer)
    });

    let mut in_flight = JoinSet::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        while let Some(joined) = in_flight.try_join_next() {
            log_join(joined);
        }

        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => line,
            Err(e) => {
                error!("Request is not valid UTF-8: {}", e);
                if let Some(frame) = encode(&parse_error(e)) {
                    if tx.send(frame).is_err() {
                        error!("Response writer closed; dropping response");
                    }
                }
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        debug!("Received request: {}", line.trim_end());

        let state = Arc::clone(&state);
        let tx = tx.clone();
        in_flight.spawn(async move {
            if let Some(frame) = handle_line(&line, &state).await {
                if tx.send(frame).is_err() {
                    error!("Response writer closed; dropping response");
                }
            }
        });
    }

    while let Some(joined) = in_flight.join_next().await {
        log_join(joined);
    }

    drop(tx);
    let writer = writer_task.await??;
    Ok(writer)
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!("Request task failed: {}", e);
    }
}

fn parse_error(e: impl std::fmt::Display) -> JsonRpcResponse {
    JsonRpcResponse::error(
        Value::Null,
        error_codes::PARSE_ERROR,
        format!("Parse error: {}", e),
    )
}

fn encode(response: &JsonRpcResponse) -> Option<String> {
    match serde_json::to_string(response) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            None
        }
    }
}

/// Parses and answers one line. `None` means nothing should be written back.
pub async fn handle_line(line: &str, state: &ServerState) -> Option<String> {
    let response = match serde_json::from_str::<JsonRpcRequest>(line) {
        Ok(req) => handle_request(&req, state).await?,
        Err(e) => {
            error!("Failed to parse JSON-RPC request: {}", e);
            parse_error(e)
        }
    };

    encode(&response)
}

pub async fn handle_request(req: &JsonRpcRequest, state: &ServerState) -> Option<JsonRpcResponse> {
    if req.is_notification() {
        debug!(method = %req.method, "Notification received");
        return None;
    }

    let id = req.id.clone().unwrap_or(Value::Null);

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, initialize_result(req.params.as_ref())),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": state.tools.describe() })),
        "tools/call" => handle_tool_call(id, req.params.as_ref(), state).await,
        other => {
            warn!(method = other, "Unknown method");
            JsonRpcResponse::error(id, error_codes::METHOD_NOT_FOUND, "Method not found")
        }
    };

    Some(response)
}

fn initialize_result(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

async fn handle_tool_call(id: Value, params: Option<&Value>, state: &ServerState) -> JsonRpcResponse {
    let Some(params) = params.filter(|p| p.is_object()) else {
        return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing params");
    };
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing 'name' parameter");
    };
    let Some(tool) = state.tools.get(tool_name) else {
        return JsonRpcResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Tool not found: {}", tool_name),
        );
    };

    let args = params.get("arguments").cloned().unwrap_or(json!({}));
    let output = invoke(tool, &state.client, args).await;

    JsonRpcResponse::success(id, output.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_id_is_notification() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn test_null_id_is_a_request() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert!(!req.is_notification());
        assert_eq!(req.id, Some(Value::Null));
    }
}
