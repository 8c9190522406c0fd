//! Gmail send path.
//!
//! Message construction and the REST client for the send endpoint.

pub mod client;
pub mod message;
pub mod types;

pub use client::GmailClient;
pub use message::OutboundMessage;
pub use types::SendResult;
