//! Error types for the gateway.
//!
//! Every failure a tool call or startup step can produce maps onto one of
//! the sub-enums here, so callers see a stable taxonomy: who you are
//! (authentication), what Gmail said (provider), whether Google was
//! reachable (transport), and what the operator got wrong (configuration).

use thiserror::Error;

/// Main error type for the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Caller authentication failures
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Rejections returned by the Gmail API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Network failures reaching Google
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Startup configuration problems
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Request validation failures
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Caller authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no bearer token presented")]
    MissingToken,

    #[error("token rejected: {reason}")]
    InvalidToken { reason: String },

    #[error("authentication is disabled on this deployment")]
    Disabled,
}

/// Rejections from the Gmail API, after the request made it onto the wire
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("gmail rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response from gmail: {message}")]
    UnexpectedResponse { message: String },
}

/// Network-level failures talking to Google endpoints
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("network error reaching {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// Classify a reqwest failure against the endpoint it was talking to.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            TransportError::Network {
                endpoint: endpoint.to_string(),
                source: err,
            }
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {var}")]
    MissingVar { var: &'static str },

    #[error("invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },

    #[error(
        "Google OAuth credentials are not configured: set {client_id_var} and {client_secret_var}, \
         or opt into degraded anonymous mode with {anonymous_var}=true"
    )]
    MissingCredentials {
        client_id_var: &'static str,
        client_secret_var: &'static str,
        anonymous_var: &'static str,
    },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid email address: {email}")]
    InvalidEmail { email: String },
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ValidationError::InvalidEmail {
            email: "not-an-address".to_string(),
        };
        assert!(err.to_string().contains("not-an-address"));

        let err = ConfigError::InvalidVar {
            var: "GATEWAY_PORT",
            message: "expected a number".to_string(),
        };
        assert!(err.to_string().contains("GATEWAY_PORT"));
    }

    #[test]
    fn test_error_conversion() {
        let auth_err = AuthError::MissingToken;
        let err: GatewayError = auth_err.into();
        assert!(matches!(err, GatewayError::Auth(_)));

        let provider_err = ProviderError::Rejected {
            status: 403,
            message: "quota exceeded".to_string(),
        };
        let err: GatewayError = provider_err.into();
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_missing_credentials_names_the_flag() {
        let err = ConfigError::MissingCredentials {
            client_id_var: "GOOGLE_CLIENT_ID",
            client_secret_var: "GOOGLE_CLIENT_SECRET",
            anonymous_var: "GATEWAY_ALLOW_ANONYMOUS",
        };
        let text = err.to_string();
        assert!(text.contains("GOOGLE_CLIENT_ID"));
        assert!(text.contains("GATEWAY_ALLOW_ANONYMOUS"));
    }
}
