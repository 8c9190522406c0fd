//! Configuration for the gateway.
//!
//! Everything comes from the environment, is validated once at startup, and
//! is carried as an explicit [`Config`] value from then on. A deployment
//! either has Google OAuth credentials or has explicitly opted into the
//! degraded anonymous mode; partial credentials are a startup error.

use std::fmt;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable names read at startup.
pub mod env {
    pub const TRANSPORT: &str = "GATEWAY_TRANSPORT";
    pub const HOST: &str = "GATEWAY_HOST";
    pub const PORT: &str = "GATEWAY_PORT";
    pub const BASE_URL: &str = "GATEWAY_BASE_URL";
    pub const CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
    pub const ALLOW_ANONYMOUS: &str = "GATEWAY_ALLOW_ANONYMOUS";
    pub const STATIC_TOKEN: &str = "GATEWAY_STATIC_TOKEN";
    pub const REQUEST_TIMEOUT_SECS: &str = "GATEWAY_REQUEST_TIMEOUT_SECS";
}

/// Google API endpoints.
pub mod google {
    /// Base URL for the Gmail API
    pub const GMAIL_API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user in Gmail URLs
    pub const USER_ID: &str = "me";

    /// Access token introspection endpoint
    pub const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

    /// OpenID Connect userinfo endpoint
    pub const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
}

/// A configuration value that must never appear in logs or Debug output.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read the underlying value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Which transport the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Stateless JSON-RPC over HTTP, plus a health route
    Http,
    /// Line-delimited JSON-RPC on stdin/stdout
    Stdio,
}

impl TransportMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Some(TransportMode::Http),
            "stdio" => Some(TransportMode::Stdio),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Http => "http",
            TransportMode::Stdio => "stdio",
        }
    }
}

/// OAuth client registration the gateway verifies callers against.
#[derive(Debug, Clone)]
pub struct GoogleOAuthKeys {
    /// The registered client ID; token audiences must match it
    pub client_id: String,
    /// Secret of the registered app; verification needs only the audience
    /// check, so this is held, never sent (kept for potential future use)
    #[allow(dead_code)]
    client_secret: Secret,
}

impl GoogleOAuthKeys {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret),
        }
    }
}

/// How callers are authenticated.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Verify caller bearer tokens against Google
    Google(GoogleOAuthKeys),
    /// Degraded mode: no identity can be resolved, Gmail tools reject every call
    Anonymous,
}

impl AuthMode {
    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::Google(_) => "google",
            AuthMode::Anonymous => "anonymous",
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthMode::Anonymous)
    }
}

/// Validated startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportMode,

    /// Interface the HTTP transport binds
    pub host: String,

    /// Port the HTTP transport binds
    pub port: u16,

    /// Public URL clients reach the gateway at
    pub base_url: String,

    pub auth: AuthMode,

    /// Ambient bearer token for the stdio transport, where requests cannot
    /// carry their own
    pub static_token: Option<Secret>,

    /// Timeout applied to every outbound request to Google
    pub request_timeout: Duration,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

impl Config {
    /// Read and validate configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let transport = match optional_var(env::TRANSPORT) {
            None => TransportMode::Http,
            Some(value) => TransportMode::parse(&value).ok_or(ConfigError::InvalidVar {
                var: env::TRANSPORT,
                message: format!("expected 'http' or 'stdio', got '{value}'"),
            })?,
        };

        let host = optional_var(env::HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match optional_var(env::PORT) {
            None => DEFAULT_PORT,
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
                var: env::PORT,
                message: format!("expected a port number, got '{value}'"),
            })?,
        };

        let base_url = optional_var(env::BASE_URL)
            .unwrap_or_else(|| format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();

        let allow_anonymous = parse_flag(env::ALLOW_ANONYMOUS)?;

        let auth = match (optional_var(env::CLIENT_ID), optional_var(env::CLIENT_SECRET)) {
            (Some(client_id), Some(client_secret)) => {
                AuthMode::Google(GoogleOAuthKeys::new(client_id, client_secret))
            }
            (None, None) if allow_anonymous => AuthMode::Anonymous,
            (None, None) => {
                return Err(ConfigError::MissingCredentials {
                    client_id_var: env::CLIENT_ID,
                    client_secret_var: env::CLIENT_SECRET,
                    anonymous_var: env::ALLOW_ANONYMOUS,
                }
                .into())
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingVar {
                    var: env::CLIENT_SECRET,
                }
                .into())
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingVar {
                    var: env::CLIENT_ID,
                }
                .into())
            }
        };

        let static_token = optional_var(env::STATIC_TOKEN).map(Secret::new);

        let request_timeout = match optional_var(env::REQUEST_TIMEOUT_SECS) {
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Some(value) => {
                let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidVar {
                    var: env::REQUEST_TIMEOUT_SECS,
                    message: format!("expected seconds, got '{value}'"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidVar {
                        var: env::REQUEST_TIMEOUT_SECS,
                        message: "timeout must be at least one second".to_string(),
                    }
                    .into());
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Self {
            transport,
            host,
            port,
            base_url,
            auth,
            static_token,
            request_timeout,
        })
    }

    /// Address string the HTTP transport binds.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read an environment variable, treating unset and empty as absent.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse a boolean flag variable. Unset means false.
fn parse_flag(name: &'static str) -> Result<bool> {
    match optional_var(name) {
        None => Ok(false),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidVar {
                var: name,
                message: format!("expected a boolean, got '{other}'"),
            }
            .into()),
        },
    }
}
