//! Challenge verification (Cloudflare Turnstile) and verification sessions
//!
//! A visitor solves the challenge once; the outcome is cached in a
//! short-lived session (an opaque token plus an absolute expiry) carried in a
//! cookie pair. The session type here is decoupled from the cookie transport
//! so its validity rule is independently testable.

use crate::{CoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cookie carrying the opaque verification token
pub const SESSION_TOKEN_COOKIE: &str = "captcha_verified";

/// Cookie carrying the session expiry timestamp
pub const SESSION_EXPIRES_COOKIE: &str = "captcha_expires";

// ============================================================================
// Verification Session
// ============================================================================

/// A minted challenge-verification session.
///
/// Valid only while both halves are present and the expiry is in the future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSession {
    /// High-entropy opaque token
    pub token: String,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

impl ChallengeSession {
    /// Mint a fresh session expiring `ttl_secs` from `now`.
    pub fn mint(now: DateTime<Utc>, ttl_secs: u64) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            expires_at: now + chrono::Duration::seconds(ttl_secs as i64),
        }
    }

    /// Whether the session is still valid at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && self.expires_at > now
    }

    /// Reconstruct a session from the raw cookie pair, if both parse.
    pub fn from_cookie_values(token: &str, expires: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        Some(Self {
            token: token.to_string(),
            expires_at: parse_expiry(expires)?,
        })
    }
}

/// Parse an expiry cookie value.
///
/// The expiry has been written both as epoch milliseconds and as an RFC 3339
/// date string across revisions of the site; accept either.
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

// ============================================================================
// Challenge Verifier
// ============================================================================

/// Outcome of a challenge-token verification
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeOutcome {
    /// Whether the provider accepted the token
    pub success: bool,

    /// Provider error codes on rejection
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
}

/// Abstraction over the external challenge-verification service
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// Verify a client-supplied token, forwarding the client IP.
    async fn verify(&self, token: &str, client_ip: &str) -> Result<ChallengeOutcome>;
}

/// Cloudflare Turnstile siteverify client
pub struct TurnstileVerifier {
    client: reqwest::Client,
    secret: String,
    siteverify_url: String,
}

impl TurnstileVerifier {
    pub fn new(secret: impl Into<String>, siteverify_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret: secret.into(),
            siteverify_url: siteverify_url.into(),
        }
    }

    pub fn from_config(config: &crate::config::TurnstileConfig) -> Self {
        Self::new(config.secret.clone(), config.siteverify_url.clone())
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, client_ip: &str) -> Result<ChallengeOutcome> {
        let form = [
            ("secret", self.secret.as_str()),
            ("response", token),
            ("remoteip", client_ip),
        ];

        let response = self
            .client
            .post(&self.siteverify_url)
            .header("User-Agent", "cv-site-auth/1.0")
            .form(&form)
            .send()
            .await
            .map_err(|e| CoreError::ChallengeService(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::ChallengeService(format!(
                "Siteverify returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<ChallengeOutcome>()
            .await
            .map_err(|e| CoreError::ChallengeService(format!("Failed to parse response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_session_is_valid_until_ttl() {
        let now = Utc::now();
        let session = ChallengeSession::mint(now, 1800);
        assert!(session.is_valid(now));
        assert!(session.is_valid(now + chrono::Duration::seconds(1799)));
        assert!(!session.is_valid(now + chrono::Duration::seconds(1801)));
    }

    #[test]
    fn test_minted_tokens_are_unique() {
        let now = Utc::now();
        let a = ChallengeSession::mint(now, 60);
        let b = ChallengeSession::mint(now, 60);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_empty_token_invalid() {
        let session = ChallengeSession {
            token: String::new(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        };
        assert!(!session.is_valid(Utc::now()));
    }

    #[test]
    fn test_parse_expiry_epoch_millis() {
        let dt = parse_expiry("1735689600000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_expiry_rfc3339() {
        let dt = parse_expiry("2025-01-01T00:00:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_expiry_garbage() {
        assert!(parse_expiry("soon").is_none());
        assert!(parse_expiry("").is_none());
    }

    #[test]
    fn test_session_from_cookie_pair() {
        let session = ChallengeSession::from_cookie_values("tok", "2030-01-01T00:00:00Z").unwrap();
        assert!(session.is_valid(Utc::now()));

        assert!(ChallengeSession::from_cookie_values("", "2030-01-01T00:00:00Z").is_none());
        assert!(ChallengeSession::from_cookie_values("tok", "not-a-date").is_none());
    }

    #[test]
    fn test_expired_cookie_session_rejected() {
        let session = ChallengeSession::from_cookie_values("tok", "1000000000000").unwrap();
        assert!(!session.is_valid(Utc::now()));
    }

    #[test]
    fn test_outcome_deserializes_provider_error_codes() {
        let outcome: ChallengeOutcome = serde_json::from_str(
            r#"{"success": false, "error-codes": ["invalid-input-response"]}"#,
        )
        .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error_codes, vec!["invalid-input-response"]);

        let ok: ChallengeOutcome = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.success);
        assert!(ok.error_codes.is_empty());
    }
}
