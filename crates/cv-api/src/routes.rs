//! Route definitions and middleware stack

use crate::handlers::{captcha, chat, health, kv};
use crate::middleware::{
    rate_limit_middleware, security_headers_middleware, session_gate_middleware,
};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Assemble the full application router.
///
/// Middleware executes outermost-first: trace, security headers (so every
/// response carries them, 429s included), rate limiting, then the
/// challenge-session gate for protected routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut api = Router::new()
        .route("/api/chat", post(chat::chat_handler))
        .route(
            "/api/auth/verify-captcha",
            post(captcha::verify_captcha_handler),
        )
        .route(
            "/api/validate-turnstile",
            post(captcha::validate_turnstile_handler),
        );

    // Direct store passthrough, development only
    if state.config.server.dev_endpoints {
        api = api
            .route("/api/kv", post(kv::kv_put_handler))
            .route("/api/kv-get", post(kv::kv_get_handler));
    }

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_gate_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
