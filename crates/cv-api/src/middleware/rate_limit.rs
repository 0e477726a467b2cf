//! Rate limiting middleware
//!
//! Applies the injected fixed-window limiter to every inbound request,
//! keyed by client address. Counters live in process memory; quota resets
//! on redeploy or cold start, which is acceptable for an abuse deterrent.

use crate::error::AppError;
use crate::middleware::client_ip;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>();
    let key = client_ip(request.headers(), peer);

    if !state.limiter.try_consume(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return AppError::RateLimited.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_router, TestAppBuilder};
    use axum::http::{Request as HttpRequest, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_requests_past_quota_get_429() {
        let app = test_router(TestAppBuilder::new().rate_limit(2, 60));

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    HttpRequest::builder()
                        .uri("/health")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_distinct_clients_have_distinct_quotas() {
        let app = test_router(TestAppBuilder::new().rate_limit(1, 60));

        let first = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .header("cf-connecting-ip", "203.0.113.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let other_client = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .header("cf-connecting-ip", "203.0.113.2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(other_client.status(), StatusCode::OK);
    }
}
