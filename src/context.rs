//! Application context.
//!
//! Everything the handlers need is assembled here once at startup and passed
//! down explicitly; nothing hangs off a global.

use crate::auth::TokenVerifier;
use crate::config::{AuthMode, Config};
use crate::error::Result;

/// Shared state behind every request.
pub struct AppContext {
    pub config: Config,

    /// Connection pool shared by the verifier and the Gmail client
    pub http: reqwest::Client,

    /// Present only when the deployment has OAuth credentials
    pub verifier: Option<TokenVerifier>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let verifier = match &config.auth {
            AuthMode::Google(keys) => Some(TokenVerifier::new(http.clone(), keys)),
            AuthMode::Anonymous => None,
        };

        Ok(Self {
            config,
            http,
            verifier,
        })
    }

    /// True when the gateway runs without OAuth credentials and cannot
    /// resolve any caller identity.
    pub fn is_degraded(&self) -> bool {
        self.config.auth.is_anonymous()
    }
}
