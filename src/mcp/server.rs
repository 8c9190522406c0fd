//! MCP dispatcher.
//!
//! One stateless dispatcher handles every JSON-RPC message regardless of
//! transport. Each tool call resolves the caller's identity fresh from the
//! bearer token the transport handed in; nothing is remembered between
//! messages, so any instance can serve any request.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::auth::claims::CallerIdentity;
use crate::context::AppContext;
use crate::error::{AuthError, Result};
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

pub(crate) const SERVER_NAME: &str = "gmail-gateway";
pub(crate) const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP server for the gateway.
pub struct McpServer {
    ctx: Arc<AppContext>,
    tools: ToolHandler,
}

impl McpServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            tools: ToolHandler::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Handle one JSON-RPC message. `bearer` is the caller's token if the
    /// transport carried one. Notifications produce no response.
    pub async fn handle_message(
        &self,
        message: &str,
        bearer: Option<&str>,
    ) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "notification received");
            return None;
        };

        match request.method.as_str() {
            methods::INITIALIZE => Some(respond(id, &self.initialize_result())),
            methods::PING => Some(JsonRpcResponse::success(id, serde_json::json!({}))),
            methods::LIST_TOOLS => {
                let result = ListToolsResult {
                    tools: self.tools.list_tools(),
                };
                Some(respond(id, &result))
            }
            methods::CALL_TOOL => match self.handle_call_tool(request.params, bearer).await {
                Ok(result) => Some(respond(id, &result)),
                Err(protocol_error) => Some(JsonRpcResponse::error(id, protocol_error)),
            },
            other => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::method_not_found(other),
            )),
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        }
    }

    /// Dispatch a tool call. Malformed params are a protocol error; every
    /// failure past that point is reported inside the tool result.
    async fn handle_call_tool(
        &self,
        params: Option<Value>,
        bearer: Option<&str>,
    ) -> std::result::Result<CallToolResult, JsonRpcError> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tool parameters: {e}")))?,
            None => return Err(JsonRpcError::invalid_params("Missing tool parameters")),
        };

        let identity = if ToolHandler::requires_auth(&params.name) {
            match self.resolve_identity(bearer).await {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(tool = %params.name, error = %e, "rejecting unauthenticated tool call");
                    return Ok(CallToolResult::error(e.to_string()));
                }
            }
        } else {
            None
        };

        debug!(tool = %params.name, authenticated = identity.is_some(), "dispatching tool call");
        Ok(self
            .tools
            .call_tool(&params.name, params.arguments, identity.as_ref())
            .await)
    }

    /// Resolve the caller for tools that need one.
    async fn resolve_identity(&self, bearer: Option<&str>) -> Result<CallerIdentity> {
        let Some(verifier) = &self.ctx.verifier else {
            return Err(AuthError::Disabled.into());
        };
        let token = match bearer {
            Some(token) if !token.trim().is_empty() => token,
            _ => return Err(AuthError::MissingToken.into()),
        };
        verifier.verify(token).await
    }

    /// Run the server on stdio, one JSON-RPC message per line.
    ///
    /// Requests on this transport cannot carry their own Authorization
    /// header, so the configured static token stands in for every call.
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        let ambient = self
            .ctx
            .config
            .static_token
            .as_ref()
            .map(|token| token.expose().to_string());

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line, ambient.as_deref()).await {
                let text = serde_json::to_string(&response)?;
                stdout.write_all(text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }
}

fn respond<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthMode, Config, GoogleOAuthKeys, TransportMode};
    use std::time::Duration;

    fn server(auth: AuthMode) -> McpServer {
        let config = Config {
            transport: TransportMode::Http,
            host: "127.0.0.1".to_string(),
            port: 8000,
            base_url: "http://127.0.0.1:8000".to_string(),
            auth,
            static_token: None,
            request_timeout: Duration::from_secs(5),
        };
        McpServer::new(Arc::new(AppContext::new(config).unwrap()))
    }

    fn google() -> AuthMode {
        AuthMode::Google(GoogleOAuthKeys::new("client-id", "client-secret"))
    }

    #[tokio::test]
    async fn test_initialize_reports_protocol_and_server() {
        let response = server(google())
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#, None)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let response = server(google())
            .handle_message(
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                None,
            )
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_parse_error_answers_with_null_id() {
        let response = server(google())
            .handle_message("{not json", None)
            .await
            .unwrap();
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = server(google())
            .handle_message(
                r#"{"jsonrpc":"2.0","id":"x","method":"resources/list"}"#,
                None,
            )
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_call_tool_without_params_is_a_protocol_error() {
        let response = server(google())
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call"}"#, None)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_protected_tool_without_token_fails_inside_the_result() {
        let message = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_my_email","arguments":{}}}"#;
        let response = server(google()).handle_message(message, None).await.unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("no bearer token"));
    }

    #[tokio::test]
    async fn test_anonymous_deployment_reports_auth_disabled() {
        let message = r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"send_email","arguments":{}}}"#;
        let response = server(AuthMode::Anonymous)
            .handle_message(message, Some("some-token"))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("disabled"));
    }

    #[tokio::test]
    async fn test_ping_tool_works_without_auth_in_every_mode() {
        let message = r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"ping","arguments":{}}}"#;
        for auth in [google(), AuthMode::Anonymous] {
            let response = server(auth).handle_message(message, None).await.unwrap();
            let result = response.result.unwrap();
            assert!(result.get("isError").is_none());
        }
    }
}
