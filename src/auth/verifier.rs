//! Google access token verification.
//!
//! Verification is two calls against Google: the tokeninfo endpoint proves
//! the token is live and was minted for this gateway's OAuth client, then
//! the userinfo endpoint resolves the profile claims. Verified claims are
//! cached per token for a short window so a chatty client does not turn
//! every tool call into two upstream round trips.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::{google, GoogleOAuthKeys};
use crate::error::{AuthError, Result, TransportError};

use super::claims::{AccessToken, CallerIdentity, IdentityClaims};

/// Cap on cached claim entries. When full, expired entries are pruned and
/// new entries are simply not cached.
const MAX_CACHE_ENTRIES: usize = 256;

/// Upper bound on how long verified claims may be reused.
const MAX_CACHE_TTL: Duration = Duration::from_secs(300);

/// Introspection response from the tokeninfo endpoint.
///
/// Google serializes several numeric fields as strings here, so expiry is
/// parsed leniently instead of being typed as a number.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    aud: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    scope: Option<String>,
}

struct CacheEntry {
    claims: IdentityClaims,
    expires_at: Instant,
}

/// Verifies caller bearer tokens against Google.
pub struct TokenVerifier {
    http: reqwest::Client,
    client_id: String,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl TokenVerifier {
    pub fn new(http: reqwest::Client, keys: &GoogleOAuthKeys) -> Self {
        Self {
            http,
            client_id: keys.client_id.clone(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Verify a bearer token and resolve the caller behind it.
    pub async fn verify(&self, token: &str) -> Result<CallerIdentity> {
        if let Some(claims) = self.cached(token).await {
            debug!("token verified from cache");
            return Ok(CallerIdentity {
                token: AccessToken::new(token),
                claims,
            });
        }

        let info = self.introspect(token).await?;
        match info.aud.as_deref() {
            Some(aud) if aud == self.client_id => {}
            Some(_) => {
                return Err(AuthError::InvalidToken {
                    reason: "token audience does not match the configured OAuth client"
                        .to_string(),
                }
                .into())
            }
            None => {
                return Err(AuthError::InvalidToken {
                    reason: "introspection response carried no audience".to_string(),
                }
                .into())
            }
        }
        debug!(scope = info.scope.as_deref().unwrap_or(""), "token introspected");

        let claims = self.fetch_claims(token).await?;

        let ttl = expires_in_secs(&info)
            .map(Duration::from_secs)
            .unwrap_or(MAX_CACHE_TTL)
            .min(MAX_CACHE_TTL);
        self.store(token, claims.clone(), ttl).await;

        Ok(CallerIdentity {
            token: AccessToken::new(token),
            claims,
        })
    }

    async fn introspect(&self, token: &str) -> Result<TokenInfo> {
        let url = format!(
            "{}?access_token={}",
            google::TOKENINFO_URL,
            urlencoding::encode(token)
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(google::TOKENINFO_URL, e))?;

        if response.status().is_success() {
            let info = response
                .json()
                .await
                .map_err(|e| TransportError::from_reqwest(google::TOKENINFO_URL, e))?;
            Ok(info)
        } else {
            // tokeninfo answers 4xx for expired or malformed tokens
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::InvalidToken {
                reason: format!("introspection failed ({status}): {}", body.trim()),
            }
            .into())
        }
    }

    async fn fetch_claims(&self, token: &str) -> Result<IdentityClaims> {
        let response = self
            .http
            .get(google::USERINFO_URL)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(google::USERINFO_URL, e))?;

        if response.status().is_success() {
            let claims = response
                .json()
                .await
                .map_err(|e| TransportError::from_reqwest(google::USERINFO_URL, e))?;
            Ok(claims)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::InvalidToken {
                reason: format!("userinfo rejected the token ({status}): {}", body.trim()),
            }
            .into())
        }
    }

    async fn cached(&self, token: &str) -> Option<IdentityClaims> {
        let cache = self.cache.read().await;
        cache
            .get(token)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.claims.clone())
    }

    async fn store(&self, token: &str, claims: IdentityClaims, ttl: Duration) {
        let mut cache = self.cache.write().await;
        if cache.len() >= MAX_CACHE_ENTRIES {
            let now = Instant::now();
            cache.retain(|_, entry| entry.expires_at > now);
        }
        if cache.len() < MAX_CACHE_ENTRIES {
            cache.insert(
                token.to_string(),
                CacheEntry {
                    claims,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }
}

/// tokeninfo reports expiry either as a JSON number or a decimal string.
fn expires_in_secs(info: &TokenInfo) -> Option<u64> {
    match info.expires_in.as_ref()? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(
            reqwest::Client::new(),
            &GoogleOAuthKeys::new("client-id", "client-secret"),
        )
    }

    fn claims_for(email: &str) -> IdentityClaims {
        IdentityClaims {
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_expires_in_accepts_number_and_string() {
        let info: TokenInfo =
            serde_json::from_value(serde_json::json!({ "expires_in": 3488 })).unwrap();
        assert_eq!(expires_in_secs(&info), Some(3488));

        let info: TokenInfo =
            serde_json::from_value(serde_json::json!({ "expires_in": "3488" })).unwrap();
        assert_eq!(expires_in_secs(&info), Some(3488));

        let info: TokenInfo =
            serde_json::from_value(serde_json::json!({ "expires_in": "soon" })).unwrap();
        assert_eq!(expires_in_secs(&info), None);

        let info: TokenInfo = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(expires_in_secs(&info), None);
    }

    #[test]
    fn test_tokeninfo_parses_real_shape() {
        // tokeninfo serializes numbers as strings
        let body = serde_json::json!({
            "azp": "client-id",
            "aud": "client-id",
            "sub": "1234567890",
            "scope": "openid https://www.googleapis.com/auth/gmail.send",
            "exp": "1700000000",
            "expires_in": "3488",
            "email": "user@example.com",
            "email_verified": "true",
            "access_type": "online"
        });
        let info: TokenInfo = serde_json::from_value(body).unwrap();
        assert_eq!(info.aud.as_deref(), Some("client-id"));
        assert_eq!(expires_in_secs(&info), Some(3488));
    }

    #[test]
    fn test_cache_round_trip() {
        tokio_test::block_on(async {
            let verifier = verifier();
            assert!(verifier.cached("tok-1").await.is_none());

            verifier
                .store("tok-1", claims_for("a@example.com"), Duration::from_secs(60))
                .await;
            let hit = verifier.cached("tok-1").await.unwrap();
            assert_eq!(hit.email.as_deref(), Some("a@example.com"));
        });
    }

    #[test]
    fn test_cache_expiry_is_honored() {
        tokio_test::block_on(async {
            let verifier = verifier();
            verifier
                .store("tok-2", claims_for("b@example.com"), Duration::from_secs(0))
                .await;
            assert!(verifier.cached("tok-2").await.is_none());
        });
    }

    #[test]
    fn test_cache_stops_growing_at_the_cap() {
        tokio_test::block_on(async {
            let verifier = verifier();
            for i in 0..MAX_CACHE_ENTRIES + 10 {
                verifier
                    .store(
                        &format!("tok-{i}"),
                        claims_for("c@example.com"),
                        Duration::from_secs(60),
                    )
                    .await;
            }
            let cache = verifier.cache.read().await;
            assert!(cache.len() <= MAX_CACHE_ENTRIES);
        });
    }
}
