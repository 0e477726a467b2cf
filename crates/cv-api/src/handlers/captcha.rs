//! Challenge verification endpoints
//!
//! `/api/auth/verify-captcha` verifies a token and mints a short-lived
//! verification session carried in a cookie pair, so one solve covers
//! multiple protected calls. `/api/validate-turnstile` is the stateless
//! variant with no cookie issuance.
//!
//! Both endpoints answer failures with a `{ valid: false, error }` body
//! rather than the generic API error envelope; that is the contract the
//! site's client code consumes. Provider error codes ride in `details`,
//! populated only outside production.

use crate::middleware::client_ip;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use cv_core::challenge::{ChallengeSession, SESSION_EXPIRES_COOKIE, SESSION_TOKEN_COOKIE};
use cv_core::CoreError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use time::Duration as CookieDuration;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(rename = "verificationToken")]
    pub verification_token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: String,
    pub message: &'static str,
}

/// Failure body shared by both verification endpoints
#[derive(Debug, Serialize)]
pub struct VerifyFailure {
    pub valid: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn verify_failure(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(VerifyFailure {
            valid: false,
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}

fn token_from(body: VerifyRequest) -> Option<String> {
    match body.token {
        Some(serde_json::Value::String(token)) if !token.is_empty() => Some(token),
        _ => None,
    }
}

fn session_cookie(
    name: &'static str,
    value: String,
    ttl_secs: u64,
    production: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        // Readable by the client for its own expiry display
        .http_only(false)
        .secure(production)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(ttl_secs as i64))
        .build()
}

/// Verify a challenge token and mint a verification session.
pub async fn verify_captcha_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<VerifyRequest>,
) -> Response {
    let gate = |msg: String| {
        if state.production() {
            None
        } else {
            Some(msg)
        }
    };

    if state.config.turnstile.secret.is_empty() {
        tracing::error!("TURNSTILE_SECRET not configured");
        return verify_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CAPTCHA service not configured",
            None,
        );
    }

    let Some(token) = token_from(body) else {
        return verify_failure(StatusCode::BAD_REQUEST, "Invalid CAPTCHA token", None);
    };

    let ip = client_ip(&headers, peer.as_ref());
    tracing::info!(client = %ip, "verifying challenge token");

    let outcome = match state.verifier.verify(&token, &ip).await {
        Ok(outcome) => outcome,
        Err(CoreError::ChallengeService(msg)) => {
            tracing::error!(error = %msg, "challenge verification service error");
            return verify_failure(
                StatusCode::BAD_GATEWAY,
                "CAPTCHA verification service error",
                gate(msg),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "challenge verification failed");
            return verify_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CAPTCHA verification failed",
                gate(e.to_string()),
            );
        }
    };

    if !outcome.success {
        tracing::warn!(client = %ip, codes = ?outcome.error_codes, "challenge token rejected");
        return verify_failure(
            StatusCode::FORBIDDEN,
            "CAPTCHA verification failed",
            gate(outcome.error_codes.join(", ")),
        );
    }

    let now = Utc::now();
    let session = ChallengeSession::mint(now, state.config.turnstile.session_ttl_secs);
    let ttl = state.config.turnstile.session_ttl_secs;
    let production = state.production();

    let jar = jar
        .add(session_cookie(
            SESSION_TOKEN_COOKIE,
            session.token.clone(),
            ttl,
            production,
        ))
        .add(session_cookie(
            SESSION_EXPIRES_COOKIE,
            session.expires_at.timestamp_millis().to_string(),
            ttl,
            production,
        ));

    tracing::info!(client = %ip, "challenge verification successful");

    (
        jar,
        Json(VerifyResponse {
            valid: true,
            verification_token: session.token,
            expires_at: session.expires_at.to_rfc3339(),
            message: "CAPTCHA verified successfully",
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Stateless token validation; no session, no cookies.
pub async fn validate_turnstile_handler(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<VerifyRequest>,
) -> Response {
    let gate = |msg: String| {
        if state.production() {
            None
        } else {
            Some(msg)
        }
    };

    let Some(token) = token_from(body) else {
        return verify_failure(StatusCode::BAD_REQUEST, "Invalid CAPTCHA token", None);
    };

    let ip = client_ip(&headers, peer.as_ref());

    match state.verifier.verify(&token, &ip).await {
        Ok(outcome) if outcome.success => Json(ValidateResponse { valid: true }).into_response(),
        Ok(outcome) => verify_failure(
            StatusCode::BAD_REQUEST,
            "CAPTCHA verification failed",
            gate(outcome.error_codes.join(", ")),
        ),
        Err(CoreError::ChallengeService(msg)) => {
            tracing::error!(error = %msg, "challenge verification service error");
            verify_failure(
                StatusCode::BAD_GATEWAY,
                "CAPTCHA verification service error",
                gate(msg),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "challenge verification failed");
            verify_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CAPTCHA verification failed",
                gate(e.to_string()),
            )
        }
    }
}
