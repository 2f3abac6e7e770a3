//! MCP request dispatch.
//!
//! Every request is handled under an explicit [`RoutingContext`]; the
//! transport builds one per request from the resolved session (HTTP) or
//! once from the CLI-resolved target (stdio). Execution-layer failures
//! are returned as tool results with `isError: true` so the calling model
//! sees them; only protocol-shape problems become JSON-RPC errors.

use crate::error::GatewayError;
use crate::protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, ListToolsResponse,
    RoutingContext, ToolContent,
};
use crate::tools::{QUERY_TOOL, SCHEMA_TOOL, ToolRegistry};
use serde_json::{Value, json};
use sqlgate_adapter_pg::{PoolRouter, describe_schema, display_target, run_query};
use std::io::{BufRead, Write};
use std::sync::Arc;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// The MCP server: tool surface plus the pool router it executes against.
pub struct McpServer {
    router: Arc<PoolRouter>,
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(router: Arc<PoolRouter>) -> Self {
        Self {
            router,
            tools: ToolRegistry::with_builtins(),
        }
    }

    pub fn pool_router(&self) -> &Arc<PoolRouter> {
        &self.router
    }

    /// Dispatch one JSON-RPC request under the given routing context.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RoutingContext,
    ) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_list_tools(request.id),
            "tools/call" => self.handle_call_tool(request.id, request.params, ctx).await,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            other => {
                JsonRpcResponse::error(request.id, -32601, format!("method not found: {other}"))
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": "sqlgate",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "capabilities": { "tools": {} }
            }),
        )
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let response = ListToolsResponse {
            tools: self.tools.list().into_iter().cloned().collect(),
        };
        JsonRpcResponse::success(id, serde_json::to_value(response).unwrap_or_default())
    }

    async fn handle_call_tool(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        ctx: &RoutingContext,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(value) => match serde_json::from_value(value) {
                Ok(params) => params,
                Err(err) => {
                    return JsonRpcResponse::error(id, -32602, format!("invalid params: {err}"));
                }
            },
            None => return JsonRpcResponse::error(id, -32602, "missing params"),
        };

        if !self.tools.contains(&params.name) {
            return JsonRpcResponse::error(id, -32602, format!("unknown tool: {}", params.name));
        }

        let ctx = resolve_override(&params, ctx);
        match self.call_tool(&params, &ctx).await {
            Ok(text) => JsonRpcResponse::success(id, tool_result(text)),
            Err(err) => {
                tracing::debug!(tool = %params.name, error = %err, "tool call failed");
                JsonRpcResponse::success(id, tool_error(err.to_string()))
            }
        }
    }

    async fn call_tool(
        &self,
        params: &CallToolParams,
        ctx: &RoutingContext,
    ) -> Result<String, GatewayError> {
        let pool = self.router.ensure_target(&ctx.database_url).await?;

        match params.name.as_str() {
            QUERY_TOOL => {
                let sql = params
                    .arguments
                    .get("sql")
                    .and_then(Value::as_str)
                    .ok_or(GatewayError::MissingArgument("sql"))?;
                let rows = run_query(&pool, sql, &ctx.grant).await?;
                Ok(serde_json::to_string_pretty(&rows)?)
            }
            SCHEMA_TOOL => {
                let table = params.arguments.get("table_name").and_then(Value::as_str);
                let schema = describe_schema(&pool, table).await?;
                Ok(serde_json::to_string_pretty(&schema)?)
            }
            other => Err(GatewayError::ToolNotFound(other.to_string())),
        }
    }

    /// Serve line-delimited JSON-RPC on stdin/stdout with a fixed routing
    /// context. Used by local MCP clients.
    pub async fn run_stdio(&self, ctx: RoutingContext) -> Result<(), GatewayError> {
        tracing::info!(
            target_db = %display_target(&ctx.database_url),
            grant = %ctx.grant,
            "serving MCP on stdio"
        );

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut stdout_lock = stdout.lock();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(err) => {
                    let response =
                        JsonRpcResponse::error(None, -32700, format!("parse error: {err}"));
                    writeln!(stdout_lock, "{}", serde_json::to_string(&response)?)?;
                    continue;
                }
            };

            // Notifications get no response.
            let is_notification = request.id.is_none();
            let response = self.handle_request(request, &ctx).await;
            if !is_notification {
                writeln!(stdout_lock, "{}", serde_json::to_string(&response)?)?;
                stdout_lock.flush()?;
            }
        }

        Ok(())
    }
}

/// Apply the in-band routing override, if any.
///
/// `_meta.databaseUrl` wins directly; `_meta.token` is accepted when it
/// URL-decodes to a Postgres connection URL. Either takes precedence over
/// the session's bound target for this single call.
fn resolve_override(params: &CallToolParams, ctx: &RoutingContext) -> RoutingContext {
    let Some(meta) = &params.meta else {
        return ctx.clone();
    };

    if let Some(url) = &meta.database_url {
        tracing::debug!(target_db = %display_target(url), "in-band routing override");
        return ctx.with_target(url.clone());
    }

    if let Some(token) = &meta.token {
        if let Ok(decoded) = urlencoding::decode(token) {
            let decoded = decoded.into_owned();
            if decoded.starts_with("postgres://") || decoded.starts_with("postgresql://") {
                tracing::debug!(target_db = %display_target(&decoded), "in-band routing override via token");
                return ctx.with_target(decoded);
            }
        }
    }

    ctx.clone()
}

fn tool_result(text: String) -> Value {
    serde_json::to_value(CallToolResponse {
        content: vec![ToolContent::Text { text }],
        is_error: None,
    })
    .unwrap_or_default()
}

fn tool_error(message: String) -> Value {
    serde_json::to_value(CallToolResponse {
        content: vec![ToolContent::Text { text: message }],
        is_error: Some(true),
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlgate_core::permissions::Grant;

    fn server() -> McpServer {
        McpServer::new(Arc::new(PoolRouter::default()))
    }

    fn ctx() -> RoutingContext {
        RoutingContext::new("postgres://localhost:5432/unused", Grant::read_only())
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = server().handle_request(request("initialize", None), &ctx()).await;
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "sqlgate");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn tools_list_names_both_tools() {
        let response = server().handle_request(request("tools/list", None), &ctx()).await;
        let tools = response.result.unwrap()["tools"].clone();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["query", "schema"]);
    }

    #[tokio::test]
    async fn unknown_method_is_a_json_rpc_error() {
        let response = server().handle_request(request("bogus/method", None), &ctx()).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn call_without_params_is_invalid() {
        let response = server().handle_request(request("tools/call", None), &ctx()).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn call_unknown_tool_is_invalid_params() {
        let response = server()
            .handle_request(
                request("tools/call", Some(json!({ "name": "nope", "arguments": {} }))),
                &ctx(),
            )
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn denied_statement_is_a_tool_error_not_a_transport_error() {
        // The pool is lazy, so the classifier denial fires before any
        // connection is attempted.
        let response = server()
            .handle_request(
                request(
                    "tools/call",
                    Some(json!({ "name": "query", "arguments": { "sql": "DROP TABLE x" } })),
                ),
                &ctx(),
            )
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("permission denied"));
        assert!(text.contains("ddl"));
    }

    #[tokio::test]
    async fn empty_statement_is_a_tool_error() {
        let response = server()
            .handle_request(
                request(
                    "tools/call",
                    Some(json!({ "name": "query", "arguments": { "sql": "  -- nothing" } })),
                ),
                &ctx(),
            )
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[test]
    fn meta_database_url_overrides_target() {
        let params = CallToolParams {
            name: "query".to_string(),
            arguments: json!({}),
            meta: Some(crate::protocol::CallMeta {
                database_url: Some("postgres://elsewhere/db".to_string()),
                token: None,
            }),
        };
        let resolved = resolve_override(&params, &ctx());
        assert_eq!(resolved.database_url, "postgres://elsewhere/db");
        assert!(resolved.grant.is_read_only());
    }

    #[test]
    fn meta_token_must_decode_to_a_postgres_url() {
        let params = CallToolParams {
            name: "query".to_string(),
            arguments: json!({}),
            meta: Some(crate::protocol::CallMeta {
                database_url: None,
                token: Some("postgres%3A%2F%2Fuser%3Apw%40host%2Fdb".to_string()),
            }),
        };
        let resolved = resolve_override(&params, &ctx());
        assert_eq!(resolved.database_url, "postgres://user:pw@host/db");

        let bogus = CallToolParams {
            name: "query".to_string(),
            arguments: json!({}),
            meta: Some(crate::protocol::CallMeta {
                database_url: None,
                token: Some("not-a-database".to_string()),
            }),
        };
        let resolved = resolve_override(&bogus, &ctx());
        assert_eq!(resolved.database_url, "postgres://localhost:5432/unused");
    }
}
