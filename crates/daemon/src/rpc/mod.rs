// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-delimited JSON-RPC 2.0 front-end over stdin/stdout.
//!
//! One request per line, one response per line. Requests without an `id`
//! are notifications and receive no reply. Dispatch is sequential: each
//! request runs to completion before the next line is read. Unknown methods
//! answer `-32601`; errors escaping a tool answer `-32603` with the message.

mod tools;

pub use tools::ServerCtx;

use fm_core::Clock;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

/// Server identity reported by `initialize`.
pub const SERVER_NAME: &str = "foreman-orchestrator";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Drive the request loop until stdin closes.
pub async fn serve<C: Clock>(ctx: ServerCtx<C>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request: Value = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(_) => continue,
        };

        let Some(response) = handle_request(&ctx, &request).await else {
            continue;
        };
        let mut body = match serde_json::to_vec(&response) {
            Ok(body) => body,
            Err(error) => {
                warn!(error = %error, "failed to serialize response");
                continue;
            }
        };
        body.push(b'\n');
        stdout.write_all(&body).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Handle one request; `None` for notifications (no reply).
pub(crate) async fn handle_request<C: Clock>(
    ctx: &ServerCtx<C>,
    request: &Value,
) -> Option<Value> {
    let object = request.as_object()?;
    // JSON-RPC notifications do not include an id and must not be answered.
    if !object.contains_key("id") {
        return None;
    }
    let id = object.get("id").cloned().unwrap_or(Value::Null);
    let method = object
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let params = object.get("params").cloned().unwrap_or_else(|| json!({}));

    Some(match method {
        "initialize" => ok_result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "tools/list" => ok_result(id, json!({"tools": tools::tool_specs()})),
        "tools/call" => tools::handle_tool_call(ctx, id, &params).await,
        other => error_response(id, -32601, format!("Method not found: {other}")),
    })
}

pub(crate) fn ok_result(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

pub(crate) fn error_response(id: Value, code: i64, message: String) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
