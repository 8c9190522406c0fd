//! Outbound message construction.
//!
//! Builds the RFC 822 payload the Gmail send endpoint expects, and the
//! base64url envelope around it. Messages carry no From header; Gmail fills
//! it in from the account the access token belongs to.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::{Result, ValidationError};

/// A single outbound email. Built per call, sent once, then dropped.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Primary recipient address
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Comma-separated CC addresses
    pub cc: Option<String>,
    /// Comma-separated BCC addresses
    pub bcc: Option<String>,
    /// Render the body as HTML instead of plain text
    pub is_html: bool,
}

impl OutboundMessage {
    /// Check recipient addresses before anything goes on the wire.
    pub fn validate(&self) -> Result<()> {
        if self.to.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "to" }.into());
        }
        if !validate_email(self.to.trim()) {
            return Err(ValidationError::InvalidEmail {
                email: self.to.clone(),
            }
            .into());
        }
        for list in [&self.cc, &self.bcc] {
            for address in split_addresses(list) {
                if !validate_email(address) {
                    return Err(ValidationError::InvalidEmail {
                        email: address.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Serialize to RFC 822 text.
    ///
    /// A plain message is a single text/plain body. An HTML message is a
    /// multipart/alternative envelope holding one text/html part, the shape
    /// this service has always produced.
    pub fn to_rfc822(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("To: {}", self.to.trim()));
        if let Some(cc) = non_empty(&self.cc) {
            lines.push(format!("Cc: {}", cc));
        }
        if let Some(bcc) = non_empty(&self.bcc) {
            lines.push(format!("Bcc: {}", bcc));
        }
        lines.push(format!("Subject: {}", encode_mime_header(&self.subject)));
        lines.push("MIME-Version: 1.0".to_string());

        if self.is_html {
            let boundary = format!("----=_AltPart_{}", generate_boundary());
            lines.push(format!(
                "Content-Type: multipart/alternative; boundary=\"{}\"",
                boundary
            ));
            lines.push(String::new());

            lines.push(format!("--{}", boundary));
            lines.push("Content-Type: text/html; charset=UTF-8".to_string());
            lines.push("Content-Transfer-Encoding: 7bit".to_string());
            lines.push(String::new());
            lines.push(self.body.clone());
            lines.push(String::new());

            lines.push(format!("--{}--", boundary));
        } else {
            lines.push("Content-Type: text/plain; charset=UTF-8".to_string());
            lines.push("Content-Transfer-Encoding: 7bit".to_string());
            lines.push(String::new());
            lines.push(self.body.clone());
        }

        lines.join("\r\n")
    }
}

/// Validate an email address without pulling in a full RFC 5322 parser.
///
/// Recipients are emitted verbatim into header lines, so control characters
/// are never valid anywhere in an address.
pub fn validate_email(email: &str) -> bool {
    if email.chars().any(char::is_control) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !local.contains(' ')
        && !domain.contains(' ')
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Encode text for a MIME header (RFC 2047).
pub fn encode_mime_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '\r' && c != '\n') {
        return text.to_string();
    }

    // MIME encoded-word, Base64 variant
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

/// Encode a raw RFC 822 message for the Gmail API (base64url, no padding).
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Entries of a comma-separated address list, trimmed, empties dropped.
fn split_addresses(list: &Option<String>) -> impl Iterator<Item = &str> {
    list.as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

fn non_empty(list: &Option<String>) -> Option<&str> {
    list.as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Generate a boundary string for multipart messages.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:x}", timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboundMessage {
        OutboundMessage {
            to: "recipient@example.com".to_string(),
            subject: "Quarterly report".to_string(),
            body: "Numbers attached below.".to_string(),
            cc: None,
            bcc: None,
            is_html: false,
        }
    }

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("test@example.com"));
        assert!(validate_email("user.name@domain.co.uk"));
        assert!(validate_email("a@b.co"));
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email("user@.com"));
        assert!(!validate_email("user@domain."));
        assert!(!validate_email("two@ats@domain.com"));
    }

    #[test]
    fn test_validate_email_rejects_control_characters() {
        assert!(!validate_email("a@b.co\r\nX-Injected:1"));
        assert!(!validate_email("a@b.co\nX-Bcc:undisclosed"));
        assert!(!validate_email("user\t@example.com"));
    }

    #[test]
    fn test_encode_mime_header_ascii() {
        let text = "Hello World";
        assert_eq!(encode_mime_header(text), text);
    }

    #[test]
    fn test_encode_mime_header_unicode() {
        let text = "Héllo Wörld";
        let encoded = encode_mime_header(text);
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_encode_raw_message_is_base64url_without_padding() {
        let encoded = encode_raw_message("Hello World");
        assert_eq!(encoded, "SGVsbG8gV29ybGQ");
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
    }

    #[test]
    fn test_plain_message_layout() {
        let raw = message().to_rfc822();
        assert!(raw.starts_with("To: recipient@example.com\r\n"));
        assert!(raw.contains("Subject: Quarterly report"));
        assert!(raw.contains("MIME-Version: 1.0"));
        assert!(raw.contains("Content-Type: text/plain; charset=UTF-8"));
        assert!(raw.ends_with("Numbers attached below."));
        assert!(!raw.contains("From:"));
        assert!(!raw.contains("multipart"));
    }

    #[test]
    fn test_html_message_is_alternative_with_single_html_part() {
        let mut msg = message();
        msg.is_html = true;
        msg.body = "<p>Numbers attached below.</p>".to_string();
        let raw = msg.to_rfc822();

        assert!(raw.contains("Content-Type: multipart/alternative; boundary="));
        assert!(raw.contains("Content-Type: text/html; charset=UTF-8"));
        assert!(!raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("<p>Numbers attached below.</p>"));
        // The envelope closes after exactly one part
        let boundary_markers = raw.matches("\r\n--").count();
        assert_eq!(boundary_markers, 2);
    }

    #[test]
    fn test_cc_and_bcc_headers_only_when_present() {
        let raw = message().to_rfc822();
        assert!(!raw.contains("Cc:"));
        assert!(!raw.contains("Bcc:"));

        let mut msg = message();
        msg.cc = Some("one@example.com, two@example.com".to_string());
        msg.bcc = Some("three@example.com".to_string());
        let raw = msg.to_rfc822();
        assert!(raw.contains("Cc: one@example.com, two@example.com"));
        assert!(raw.contains("Bcc: three@example.com"));

        // An empty string means no header, same as None
        let mut msg = message();
        msg.cc = Some("   ".to_string());
        assert!(!msg.to_rfc822().contains("Cc:"));
    }

    #[test]
    fn test_validate_rejects_bad_recipients() {
        let mut msg = message();
        msg.to = "not-an-address".to_string();
        assert!(msg.validate().is_err());

        let mut msg = message();
        msg.cc = Some("ok@example.com, broken".to_string());
        let err = msg.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));

        let mut msg = message();
        msg.to = "  ".to_string();
        let err = msg.validate().unwrap_err();
        assert!(err.to_string().contains("to"));
    }

    #[test]
    fn test_validate_rejects_recipients_with_embedded_header_lines() {
        // A recipient must never be able to smuggle its own header line
        let mut msg = message();
        msg.to = "a@b.co\r\nX-Injected:1".to_string();
        assert!(msg.validate().is_err());

        let mut msg = message();
        msg.cc = Some("a@b.co\r\nX-Injected:1".to_string());
        assert!(msg.validate().is_err());

        let mut msg = message();
        msg.bcc = Some("ok@example.com, a@b.co\r\nCc:undisclosed-recipients:;".to_string());
        assert!(msg.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_lists() {
        let mut msg = message();
        msg.cc = Some("one@example.com,two@example.com".to_string());
        msg.bcc = Some(" three@example.com ".to_string());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_unicode_subject_is_encoded_in_place() {
        let mut msg = message();
        msg.subject = "Überweisung bestätigt".to_string();
        let raw = msg.to_rfc822();
        assert!(raw.contains("Subject: =?UTF-8?B?"));
        assert!(!raw.contains("Überweisung"));
    }
}
