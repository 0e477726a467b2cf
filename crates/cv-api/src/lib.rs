//! CV API - HTTP server for the CV site chat assistant
//!
//! Provides the chat endpoint, challenge verification, and the
//! development-only record store passthrough, behind a middleware stack of
//! security headers, rate limiting, and the challenge-session gate.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use routes::create_router;
pub use state::AppState;
