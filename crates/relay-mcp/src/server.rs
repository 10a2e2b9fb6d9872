//! Tool server runtime
//!
//! The serving half of the protocol: reads one JSON-RPC message per line,
//! dispatches `initialize`, `tools/list` and `tools/call` to a
//! [`ToolHandler`], and writes one response per request line.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::protocol::{
    Implementation, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    PROTOCOL_VERSION, ToolCallParams, ToolDefinition, ToolResult, codes,
};

/// The tools a server exposes.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name reported in `serverInfo`.
    fn name(&self) -> &str;

    fn tools(&self) -> Vec<ToolDefinition>;

    /// Run one tool. Failures belong in the result (`isError`), not in a
    /// JSON-RPC error.
    async fn call(&self, name: &str, arguments: Value) -> ToolResult;
}

/// Serves a [`ToolHandler`] over any line-oriented reader/writer pair.
///
/// # Example
///
/// ```ignore
/// use relay_mcp::ToolServer;
///
/// #[tokio::main]
/// async fn main() -> relay_mcp::Result<()> {
///     let mut server = ToolServer::new(MyTools::default());
///     server.run_stdio().await
/// }
/// ```
pub struct ToolServer<H> {
    handler: H,
    initialized: bool,
}

impl<H: ToolHandler> ToolServer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            initialized: false,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Whether the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve on this process's stdin/stdout until stdin closes.
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve until `reader` reaches EOF.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(server = %self.handler.name(), "Tool server ready, listening");

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!(request = %line, "Received message");

            if let Some(response) = self.handle_message(&line).await? {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        tracing::info!(server = %self.handler.name(), "Input closed, shutting down");
        Ok(())
    }

    /// Handle a single message.
    ///
    /// Returns the serialized response, or `None` for notifications.
    pub async fn handle_message(&mut self, message: &str) -> Result<Option<String>> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                let response =
                    JsonRpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {e}"));
                return Ok(Some(serde_json::to_string(&response)?));
            }
        };

        if request.is_notification() {
            self.handle_notification(&request.method);
            return Ok(None);
        }

        if request.jsonrpc != "2.0" {
            let response = JsonRpcResponse::error(
                request.id,
                codes::INVALID_REQUEST,
                format!("Invalid request: unsupported jsonrpc version '{}'", request.jsonrpc),
            );
            return Ok(Some(serde_json::to_string(&response)?));
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id)?,
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id)?,
            "tools/call" => self.handle_tools_call(id, request.params).await?,
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        Ok(Some(serde_json::to_string(&response)?))
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                self.initialized = true;
                tracing::debug!("Client initialized");
            }
            other => tracing::debug!(method = %other, "Ignoring notification"),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({ "tools": { "listChanged": false } }),
            server_info: Implementation {
                name: self.handler.name().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    fn handle_tools_list(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        let result = ListToolsResult {
            tools: self.handler.tools(),
        };
        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return Ok(JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("Invalid params: {e}"),
                ));
            }
        };

        if !self.handler.tools().iter().any(|t| t.name == params.name) {
            return Ok(JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            ));
        }

        tracing::info!(tool = %params.name, "Executing tool");
        let result = self.handler.call(&params.name, params.arguments).await;
        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Greeter;

    #[async_trait]
    impl ToolHandler for Greeter {
        fn name(&self) -> &str {
            "greeter"
        }

        fn tools(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "greet".to_string(),
                description: "Say hello".to_string(),
                input_schema: json!({"type": "object"}),
            }]
        }

        async fn call(&self, _name: &str, arguments: Value) -> ToolResult {
            match arguments["who"].as_str() {
                Some(who) => ToolResult::text(format!("hello {who}")),
                None => ToolResult::error("missing 'who'"),
            }
        }
    }

    async fn respond(server: &mut ToolServer<Greeter>, message: Value) -> Value {
        let response = server
            .handle_message(&message.to_string())
            .await
            .unwrap()
            .expect("expected a response");
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_reports_handler_name() {
        let mut server = ToolServer::new(Greeter);
        let response = respond(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(response["result"]["serverInfo"]["name"], "greeter");
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let mut server = ToolServer::new(Greeter);
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_tools_call_and_error_result() {
        let mut server = ToolServer::new(Greeter);
        let ok = respond(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "greet", "arguments": {"who": "argent"}}}),
        )
        .await;
        assert_eq!(ok["result"]["content"][0]["text"], "hello argent");

        let failed = respond(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "greet", "arguments": {}}}),
        )
        .await;
        assert_eq!(failed["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let mut server = ToolServer::new(Greeter);
        let unknown_tool = respond(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "wave", "arguments": {}}}),
        )
        .await;
        assert_eq!(unknown_tool["error"]["code"], codes::INVALID_PARAMS);

        let unknown_method = respond(
            &mut server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}),
        )
        .await;
        assert_eq!(unknown_method["error"]["code"], codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version_is_invalid_request() {
        let mut server = ToolServer::new(Greeter);
        let response = respond(
            &mut server,
            json!({"jsonrpc": "1.0", "id": 6, "method": "tools/list"}),
        )
        .await;
        assert_eq!(response["error"]["code"], codes::INVALID_REQUEST);
        assert_eq!(response["id"], 6);
        assert!(response.get("result").is_none());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut server = ToolServer::new(Greeter);
        let response = server.handle_message("{not json").await.unwrap().unwrap();
        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["error"]["code"], codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_serve_over_buffers() {
        let mut server = ToolServer::new(Greeter);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
        );
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);
        let response: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(response["result"]["tools"][0]["name"], "greet");
    }
}
