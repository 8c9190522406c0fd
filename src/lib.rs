//! Gmail MCP Gateway Library
//!
//! A Model Context Protocol (MCP) gateway in front of the Gmail API.
//! Callers authenticate with their own Google OAuth bearer tokens; the
//! gateway verifies them per call and exposes a small tool set for sending
//! mail and inspecting the caller's profile.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use context::AppContext;
pub use error::{GatewayError, Result};
