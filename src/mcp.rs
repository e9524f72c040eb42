use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::config::ServerInfo;
use crate::diary::Diary;
use crate::error::{Result, ThemisError};
use crate::model::{EntriesResponse, RecentEntriesRequest};

pub const TOOL_NAME: &str = "getRecentEntries";
const TOOL_DESCRIPTION: &str = "fetches diary entries from the latest N number of days";
const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct RpcRequest {
    /// Absent (or null) for notifications, which never get a response.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// 绑定进程 stdin/stdout 运行 MCP 服务，直到输入结束。
pub async fn run_stdio(diary: Arc<Diary>, server: ServerInfo) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    serve(diary, &server, stdin, &mut stdout).await
}

/// Newline-delimited JSON-RPC loop. Requests are handled one at a time.
pub async fn serve<R, W>(
    diary: Arc<Diary>,
    server: &ServerInfo,
    reader: R,
    writer: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: RpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!("unparseable request: {e}");
                let resp = error_response(Value::Null, -32700, format!("parse error: {e}"));
                write_response(writer, resp).await?;
                continue;
            }
        };

        let Some(id) = req.id.clone() else {
            debug!(method = %req.method, "notification");
            continue;
        };

        let resp = match req.method.as_str() {
            "initialize" => handle_initialize(id, server, &req.params),
            "ping" => ok_response(id, json!({})),
            "tools/list" => ok_response(id, json!({ "tools": [tool_descriptor()] })),
            "tools/call" => handle_call_tool(&diary, id, &req.params).await,
            TOOL_NAME => handle_direct(&diary, id, &req.params).await,
            _ => error_response(id, -32601, format!("method not found: {}", req.method)),
        };

        write_response(writer, resp).await?;
    }

    Ok(())
}

fn handle_initialize(id: Value, server: &ServerInfo, params: &Value) -> RpcResponse {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    ok_response(
        id,
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": server.name,
                "version": server.version
            }
        }),
    )
}

async fn handle_call_tool(diary: &Arc<Diary>, id: Value, params: &Value) -> RpcResponse {
    let call: CallToolParams = match serde_json::from_value(params.clone()) {
        Ok(c) => c,
        Err(e) => return error_response(id, -32602, format!("invalid params: {e}")),
    };
    if call.name != TOOL_NAME {
        return error_response(id, -32602, format!("unknown tool: {}", call.name));
    }
    let request = match parse_arguments(call.arguments) {
        Ok(r) => r,
        Err(e) => return error_response(id, -32602, e.to_string()),
    };

    let outcome = fetch_entries(diary, request.days)
        .await
        .and_then(|resp| to_tool_result(&resp));
    let result = match outcome {
        Ok(v) => v,
        Err(e) => {
            warn!("{TOOL_NAME} failed: {e}");
            json!({
                "content": [{ "type": "text", "text": format!("failed to get entries: {e}") }],
                "isError": true
            })
        }
    };
    ok_response(id, result)
}

async fn handle_direct(diary: &Arc<Diary>, id: Value, params: &Value) -> RpcResponse {
    let request = match parse_arguments(params.clone()) {
        Ok(r) => r,
        Err(e) => return error_response(id, -32602, e.to_string()),
    };

    match fetch_entries(diary, request.days).await {
        Ok(resp) => match serde_json::to_value(&resp) {
            Ok(v) => ok_response(id, v),
            Err(e) => error_response(id, -32603, e.to_string()),
        },
        Err(e) => error_response(id, -32002, format!("failed to get entries: {e}")),
    }
}

fn parse_arguments(arguments: Value) -> Result<RecentEntriesRequest> {
    serde_json::from_value(arguments)
        .map_err(|e| ThemisError::InvalidRequest(format!("invalid params: {e}")))
}

/// The scan is blocking filesystem work; it runs to completion before the next request is read.
async fn fetch_entries(diary: &Arc<Diary>, days: u32) -> Result<EntriesResponse> {
    let diary = Arc::clone(diary);
    tokio::task::spawn_blocking(move || diary.recent_entries(days))
        .await
        .map_err(|e| ThemisError::Internal(e.to_string()))?
}

fn to_tool_result(resp: &EntriesResponse) -> Result<Value> {
    let structured =
        serde_json::to_value(resp).map_err(|e| ThemisError::Internal(e.to_string()))?;
    let text =
        serde_json::to_string(&structured).map_err(|e| ThemisError::Internal(e.to_string()))?;
    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
        "isError": false
    }))
}

fn tool_descriptor() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": TOOL_DESCRIPTION,
        "inputSchema": {
            "type": "object",
            "required": ["days"],
            "properties": {
                "days": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Number of days to retrieve (e.g., 7 for last week)"
                }
            }
        },
        "outputSchema": {
            "type": "object",
            "required": ["entries", "count"],
            "properties": {
                "entries": {
                    "type": "array",
                    "description": "List of diary entries, sorted newest first",
                    "items": {
                        "type": "object",
                        "required": ["date", "path", "content"],
                        "properties": {
                            "date": {
                                "type": "string",
                                "description": "Entry date in YYYY-MM-DD format"
                            },
                            "path": {
                                "type": "string",
                                "description": "Full path to the diary entry file"
                            },
                            "content": {
                                "type": "string",
                                "description": "Full markdown content of the entry"
                            }
                        }
                    }
                },
                "count": { "type": "integer", "description": "Total number of entries returned" }
            }
        }
    })
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, resp: RpcResponse) -> Result<()> {
    let line = serde_json::to_string(&resp).unwrap_or_else(|_| "{}".to_string());
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

fn ok_response(id: Value, result: Value) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn error_response(id: Value, code: i32, message: String) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(RpcError { code, message }),
    }
}
