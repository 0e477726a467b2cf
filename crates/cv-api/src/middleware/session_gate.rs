//! Challenge-session gate
//!
//! Re-checks the verification cookie pair on configured protected routes so
//! one challenge solve covers multiple calls within the session window. The
//! gate records the outcome in request extensions; the handler decides
//! whether an unverified request may still pass with a fresh inline token,
//! since the body is not readable from middleware.

use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use cv_core::challenge::{ChallengeSession, SESSION_EXPIRES_COOKIE, SESSION_TOKEN_COOKIE};
use std::sync::Arc;

/// Outcome of the session check for a protected route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    /// Both cookies present, parseable, and unexpired
    pub verified: bool,
}

/// Read the session from the cookie pair, if both halves are present.
pub fn session_from_jar(jar: &CookieJar) -> Option<ChallengeSession> {
    let token = jar.get(SESSION_TOKEN_COOKIE)?.value();
    let expires = jar.get(SESSION_EXPIRES_COOKIE)?.value();
    ChallengeSession::from_cookie_values(token, expires)
}

pub async fn session_gate_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let protected = state
        .config
        .server
        .protected_routes
        .iter()
        .any(|route| path.starts_with(route.as_str()));

    if protected {
        let jar = CookieJar::from_headers(request.headers());
        let verified = session_from_jar(&jar)
            .map(|session| session.is_valid(Utc::now()))
            .unwrap_or(false);

        if !verified {
            tracing::debug!(%path, "no valid challenge session on protected route");
        }
        request.extensions_mut().insert(SessionStatus { verified });
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn jar_with(token: &str, expires: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            format!("{SESSION_TOKEN_COOKIE}={token}; {SESSION_EXPIRES_COOKIE}={expires}")
                .parse()
                .unwrap(),
        );
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_fresh_cookie_pair_is_valid() {
        let future = (Utc::now() + chrono::Duration::minutes(10)).timestamp_millis();
        let session = session_from_jar(&jar_with("tok", &future.to_string())).unwrap();
        assert!(session.is_valid(Utc::now()));
    }

    #[test]
    fn test_expired_cookie_pair_is_invalid() {
        let past = (Utc::now() - chrono::Duration::minutes(10)).timestamp_millis();
        let session = session_from_jar(&jar_with("tok", &past.to_string())).unwrap();
        assert!(!session.is_valid(Utc::now()));
    }

    #[test]
    fn test_missing_half_yields_no_session() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            format!("{SESSION_TOKEN_COOKIE}=tok").parse().unwrap(),
        );
        let jar = CookieJar::from_headers(&headers);
        assert!(session_from_jar(&jar).is_none());
    }
}
