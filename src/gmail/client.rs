//! Gmail send client.
//!
//! Thin wrapper over the REST send endpoint. One instance is built per tool
//! call from the caller's verified token; only the underlying connection
//! pool is shared across calls.

use tracing::debug;

use crate::auth::claims::AccessToken;
use crate::config::google::{GMAIL_API_BASE_URL, USER_ID};
use crate::error::{AuthError, GatewayError, ProviderError, Result, TransportError};
use crate::gmail::message::{encode_raw_message, OutboundMessage};
use crate::gmail::types::{ApiErrorBody, SendMessageRequest, SendResult, SentMessage};

/// Gmail API client scoped to one caller's token.
pub struct GmailClient {
    http: reqwest::Client,
    token: AccessToken,
}

impl GmailClient {
    pub fn new(http: reqwest::Client, token: AccessToken) -> Self {
        Self { http, token }
    }

    fn send_url() -> String {
        format!("{}/users/{}/messages/send", GMAIL_API_BASE_URL, USER_ID)
    }

    /// Send one message on behalf of the token's owner.
    pub async fn send(&self, message: &OutboundMessage) -> Result<SendResult> {
        message.validate()?;

        let request = SendMessageRequest {
            raw: encode_raw_message(&message.to_rfc822()),
        };
        let url = Self::send_url();

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(&url, e))?;
            let sent = decode_sent_message(&body)?;
            debug!(message_id = %sent.id, "gmail accepted message");
            Ok(SendResult::sent(sent, &message.to, &message.subject))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(map_send_failure(status.as_u16(), &body))
        }
    }
}

/// Map a non-2xx send response onto the error taxonomy.
///
/// A 401 means the access token itself was refused, which callers should
/// treat as an authentication problem rather than a Gmail one.
fn map_send_failure(status: u16, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.message);
    let message = match detail {
        Some(message) => message,
        None if body.trim().is_empty() => "no error detail".to_string(),
        None => body.trim().to_string(),
    };

    if status == 401 {
        AuthError::InvalidToken {
            reason: format!("gmail rejected the access token: {message}"),
        }
        .into()
    } else {
        ProviderError::Rejected { status, message }.into()
    }
}

/// Parse the message resource out of a 2xx send response.
///
/// A success status with an undecodable body is a provider anomaly, not a
/// network failure, and is reported as one.
fn decode_sent_message(body: &str) -> Result<SentMessage> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::UnexpectedResponse {
            message: format!("undecodable send response: {e}"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_url_targets_the_authenticated_user() {
        assert_eq!(
            GmailClient::send_url(),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/send"
        );
    }

    #[test]
    fn test_map_send_failure_extracts_gmail_message() {
        let body = r#"{"error": {"code": 400, "message": "Invalid To header", "status": "INVALID_ARGUMENT"}}"#;
        let err = map_send_failure(400, body);
        assert!(matches!(
            err,
            GatewayError::Provider(ProviderError::Rejected { status: 400, .. })
        ));
        assert!(err.to_string().contains("Invalid To header"));
    }

    #[test]
    fn test_map_send_failure_401_is_an_auth_error() {
        let body = r#"{"error": {"code": 401, "message": "Invalid Credentials", "status": "UNAUTHENTICATED"}}"#;
        let err = map_send_failure(401, body);
        assert!(matches!(err, GatewayError::Auth(AuthError::InvalidToken { .. })));
    }

    #[test]
    fn test_map_send_failure_with_unparseable_body() {
        let err = map_send_failure(502, "<html>Bad Gateway</html>");
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad Gateway"));

        let err = map_send_failure(500, "");
        assert!(err.to_string().contains("no error detail"));
    }

    #[test]
    fn test_decode_sent_message_reads_the_resource() {
        let sent = decode_sent_message(r#"{"id": "m-1", "threadId": "t-1"}"#).unwrap();
        assert_eq!(sent.id, "m-1");
        assert_eq!(sent.thread_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_undecodable_success_body_is_a_provider_anomaly() {
        let err = decode_sent_message("<html>proxy interstitial</html>").unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Provider(ProviderError::UnexpectedResponse { .. })
        ));
        assert!(err.to_string().contains("unexpected response from gmail"));
    }
}
