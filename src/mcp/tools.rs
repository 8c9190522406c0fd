//! MCP tool definitions and handlers.
//!
//! Three tools are exposed: `ping` answers for anyone, `send_email` and
//! `get_my_email` require a verified caller. The dispatcher resolves the
//! caller before handlers run; handlers receive the identity ready-made.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::claims::{CallerIdentity, ProfileInfo};
use crate::context::AppContext;
use crate::error::{AuthError, GatewayError, Result, ValidationError};
use crate::gmail::client::GmailClient;
use crate::gmail::message::OutboundMessage;
use crate::mcp::server::{SERVER_NAME, SERVER_VERSION};
use crate::mcp::types::{CallToolResult, Tool};

/// Registered tool names.
pub mod names {
    pub const PING: &str = "ping";
    pub const SEND_EMAIL: &str = "send_email";
    pub const GET_MY_EMAIL: &str = "get_my_email";
}

/// A tool's wire definition plus its dispatch policy.
pub struct RegisteredTool {
    pub def: Tool,
    /// Whether a verified caller identity must be attached before dispatch
    pub requires_auth: bool,
}

/// Tool handler
pub struct ToolHandler {
    ctx: Arc<AppContext>,
}

impl ToolHandler {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// The full tool registry.
    pub fn registry() -> Vec<RegisteredTool> {
        vec![
            RegisteredTool {
                def: tool_def(
                    names::PING,
                    "Connectivity check; reports the gateway's health and auth mode",
                    json!({"type": "object", "properties": {}}),
                ),
                requires_auth: false,
            },
            RegisteredTool {
                def: tool_def(
                    names::SEND_EMAIL,
                    "Send an email from the authenticated user's Gmail account",
                    send_email_schema(),
                ),
                requires_auth: true,
            },
            RegisteredTool {
                def: tool_def(
                    names::GET_MY_EMAIL,
                    "Get the authenticated user's email address and profile",
                    json!({"type": "object", "properties": {}}),
                ),
                requires_auth: true,
            },
        ]
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        Self::registry().into_iter().map(|tool| tool.def).collect()
    }

    /// Whether a tool needs a verified caller. Unknown tools need none;
    /// dispatch will reject them by name instead.
    pub fn requires_auth(name: &str) -> bool {
        Self::registry()
            .iter()
            .find(|tool| tool.def.name == name)
            .map(|tool| tool.requires_auth)
            .unwrap_or(false)
    }

    /// Call a tool by name
    pub async fn call_tool(
        &self,
        name: &str,
        args: Value,
        identity: Option<&CallerIdentity>,
    ) -> CallToolResult {
        match name {
            names::PING => self.handle_ping(),
            names::SEND_EMAIL => match identity {
                Some(identity) => self.handle_send_email(args, identity).await,
                None => missing_identity(),
            },
            names::GET_MY_EMAIL => match identity {
                Some(identity) => self.handle_get_my_email(identity),
                None => missing_identity(),
            },
            _ => CallToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    // ==================== Tool Handlers ====================

    fn handle_ping(&self) -> CallToolResult {
        CallToolResult::json(&json!({
            "status": "ok",
            "server": SERVER_NAME,
            "version": SERVER_VERSION,
            "transport": self.ctx.config.transport.as_str(),
            "auth": self.ctx.config.auth.label(),
            "degraded": self.ctx.is_degraded(),
        }))
    }

    async fn handle_send_email(&self, args: Value, identity: &CallerIdentity) -> CallToolResult {
        let args: SendEmailArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        let message = match build_message(args) {
            Ok(message) => message,
            Err(e) => return CallToolResult::error(e.to_string()),
        };

        let client = GmailClient::new(self.ctx.http.clone(), identity.token.clone());
        match client.send(&message).await {
            Ok(result) => CallToolResult::json(&result),
            Err(e) => {
                tracing::warn!(error = %e, "send_email failed");
                CallToolResult::error(e.to_string())
            }
        }
    }

    fn handle_get_my_email(&self, identity: &CallerIdentity) -> CallToolResult {
        CallToolResult::json(&ProfileInfo::from(&identity.claims))
    }
}

/// Args carried by `send_email`. Everything optional at the wire level so
/// absence can be reported per field instead of as one serde error.
#[derive(Deserialize)]
struct SendEmailArgs {
    to: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    cc: Option<String>,
    bcc: Option<String>,
    #[serde(default)]
    is_html: bool,
}

fn build_message(args: SendEmailArgs) -> Result<OutboundMessage> {
    Ok(OutboundMessage {
        to: require("to", args.to)?,
        subject: require("subject", args.subject)?,
        body: require("body", args.body)?,
        cc: args.cc,
        bcc: args.bcc,
        is_html: args.is_html,
    })
}

/// A required field must be present and not blank.
fn require(field: &'static str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField { field }.into())
}

fn missing_identity() -> CallToolResult {
    CallToolResult::error(GatewayError::from(AuthError::MissingToken).to_string())
}

fn tool_def(name: &str, description: &str, schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: schema,
    }
}

fn send_email_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "to": {
                "type": "string",
                "description": "Recipient email address"
            },
            "subject": {
                "type": "string",
                "description": "Email subject line"
            },
            "body": {
                "type": "string",
                "description": "Email body, plain text or HTML depending on is_html"
            },
            "cc": {
                "type": "string",
                "description": "Optional comma-separated CC addresses"
            },
            "bcc": {
                "type": "string",
                "description": "Optional comma-separated BCC addresses"
            },
            "is_html": {
                "type": "boolean",
                "description": "Send the body as HTML instead of plain text",
                "default": false
            }
        },
        "required": ["to", "subject", "body"]
    })
}
