//! MCP (Model Context Protocol) module.
//!
//! JSON-RPC framing, the tool registry, and the transports that carry them.

pub mod http;
pub mod server;
pub mod tools;
pub mod types;
