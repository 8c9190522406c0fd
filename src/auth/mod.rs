//! Caller authentication.
//!
//! The gateway never issues or refreshes tokens. Callers bring their own
//! Google OAuth2 access token; this module verifies it and resolves the
//! profile claims attached to it.

pub mod claims;
pub mod verifier;

pub use claims::{AccessToken, CallerIdentity, IdentityClaims, ProfileInfo};
pub use verifier::TokenVerifier;
