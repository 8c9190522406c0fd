//! Gmail API type definitions.
//!
//! Wire shapes for the send endpoint, plus the record handed back to the
//! caller after a successful send.

use serde::{Deserialize, Serialize};

/// Request body for `users.messages.send`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    /// Base64url-encoded RFC 822 message
    pub raw: String,
}

/// Message resource the send endpoint returns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Error envelope Gmail wraps failures in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

/// Record returned to the caller after Gmail accepts a message.
///
/// `status` is always `"sent"`; the recipient and subject are echoed back so
/// the caller can correlate the result without holding its own copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub status: String,
    pub message_id: String,
    pub thread_id: Option<String>,
    pub to: String,
    pub subject: String,
}

impl SendResult {
    pub fn sent(message: SentMessage, to: &str, subject: &str) -> Self {
        Self {
            status: "sent".to_string(),
            message_id: message.id,
            thread_id: message.thread_id,
            to: to.to_string(),
            subject: subject.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_message_parses_gmail_response() {
        let body = serde_json::json!({
            "id": "18c1a2b3d4e5f6a7",
            "threadId": "18c1a2b3d4e5f6a7",
            "labelIds": ["SENT"]
        });
        let message: SentMessage = serde_json::from_value(body).unwrap();
        assert_eq!(message.id, "18c1a2b3d4e5f6a7");
        assert_eq!(message.thread_id.as_deref(), Some("18c1a2b3d4e5f6a7"));
    }

    #[test]
    fn test_send_result_shape() {
        let message = SentMessage {
            id: "msg-1".to_string(),
            thread_id: Some("thr-1".to_string()),
        };
        let result = SendResult::sent(message, "to@example.com", "Hello");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "sent");
        assert_eq!(json["message_id"], "msg-1");
        assert_eq!(json["thread_id"], "thr-1");
        assert_eq!(json["to"], "to@example.com");
        assert_eq!(json["subject"], "Hello");
    }

    #[test]
    fn test_api_error_body_parses() {
        let body = serde_json::json!({
            "error": {
                "code": 403,
                "message": "Quota exceeded for quota metric 'Queries'",
                "status": "RESOURCE_EXHAUSTED"
            }
        });
        let parsed: ApiErrorBody = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.error.code, Some(403));
        assert!(parsed.error.message.unwrap().contains("Quota"));
    }
}
