//! Caller identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bearer access token presented by a caller.
///
/// Kept opaque so the raw value never lands in Debug output or logs.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for forwarding to Google.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Profile claims resolved from a verified access token.
///
/// The field set mirrors the OpenID Connect userinfo response. Whatever the
/// token does not carry stays `None`; nothing is invented downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: Option<bool>,
}

/// A verified caller, attached to a single tool call and then dropped.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub token: AccessToken,
    pub claims: IdentityClaims,
}

/// Profile record returned by the `get_my_email` tool.
///
/// Absent claims serialize as explicit nulls so callers can tell "not
/// present in the token" apart from "field does not exist".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: Option<bool>,
}

impl From<&IdentityClaims> for ProfileInfo {
    fn from(claims: &IdentityClaims) -> Self {
        Self {
            email: claims.email.clone(),
            name: claims.name.clone(),
            picture: claims.picture.clone(),
            email_verified: claims.email_verified,
        }
    }
}
