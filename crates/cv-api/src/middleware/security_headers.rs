//! Security headers middleware
//!
//! Adds the standard hardening headers to every response and a
//! Content-Security-Policy whose script directive carries a per-request
//! nonce plus the challenge-provider origin. The nonce is also placed in
//! request extensions for any handler that renders inline script.

use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use rand::RngCore;
use std::sync::Arc;

/// Per-request CSP nonce, available from request extensions
#[derive(Debug, Clone)]
pub struct CspNonce(pub String);

fn fresh_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn build_csp(nonce: &str, production: bool) -> String {
    let mut directives = vec![
        "default-src 'self'".to_string(),
        format!(
            "script-src 'self' 'nonce-{nonce}' https://challenges.cloudflare.com 'wasm-unsafe-eval'"
        ),
        "style-src 'self' 'unsafe-inline'".to_string(),
        "img-src 'self' data: https:".to_string(),
        "font-src 'self' data:".to_string(),
        "connect-src 'self' https://api.groq.com https://challenges.cloudflare.com".to_string(),
        "frame-src https://challenges.cloudflare.com".to_string(),
        "worker-src 'self'".to_string(),
        "manifest-src 'self'".to_string(),
        "media-src 'self'".to_string(),
        "object-src 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self'".to_string(),
        "frame-ancestors 'none'".to_string(),
    ];
    if production {
        directives.push("upgrade-insecure-requests".to_string());
    }
    directives.join("; ")
}

pub async fn security_headers_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let nonce = fresh_nonce();
    request.extensions_mut().insert(CspNonce(nonce.clone()));

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    );

    let csp = build_csp(&nonce, state.production());
    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(header::CONTENT_SECURITY_POLICY, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_router, TestAppBuilder};
    use axum::http::{Request as HttpRequest, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_csp_includes_nonce_and_challenge_origin() {
        let csp = build_csp("abc123", false);
        assert!(csp.contains("script-src 'self' 'nonce-abc123' https://challenges.cloudflare.com"));
        assert!(csp.contains("frame-ancestors 'none'"));
        assert!(!csp.contains("upgrade-insecure-requests"));
    }

    #[test]
    fn test_production_csp_upgrades_insecure_requests() {
        let csp = build_csp("abc123", true);
        assert!(csp.ends_with("upgrade-insecure-requests"));
    }

    #[test]
    fn test_nonces_are_unique() {
        assert_ne!(fresh_nonce(), fresh_nonce());
    }

    #[tokio::test]
    async fn test_headers_applied_to_responses() {
        let app = test_router(TestAppBuilder::new());

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(header::X_XSS_PROTECTION).unwrap(), "1; mode=block");
        assert_eq!(
            headers.get(header::REFERRER_POLICY).unwrap(),
            "strict-origin-when-cross-origin"
        );
        assert!(headers.get("permissions-policy").is_some());

        let csp = headers
            .get(header::CONTENT_SECURITY_POLICY)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(csp.contains("'nonce-"));
        assert!(csp.contains("https://challenges.cloudflare.com"));
    }
}
