//! API error handling
//!
//! Errors are split by who caused them: validation and challenge failures
//! are the client's and their messages are safe to return verbatim;
//! configuration, store, and upstream failures are the operator's, logged in
//! full but returned to the client as generic messages. Detail fields on 5xx
//! and challenge rejections are populated only outside production, at the
//! point where the error is constructed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cv_core::{CoreError, ValidationError};
use serde::{Deserialize, Serialize};

/// JSON error envelope returned for every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional detail, present only outside production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }
}

/// Application error type mapped onto HTTP statuses
#[derive(Debug)]
pub enum AppError {
    /// Client-caused input rejection (4xx)
    Validation(ValidationError),
    /// Quota exhausted for this client key
    RateLimited,
    /// Protected route reached without a session or token
    ChallengeRequired,
    /// The challenge provider rejected the supplied token
    ChallengeRejected { details: Option<String> },
    /// The challenge provider itself failed
    ChallengeService { details: Option<String> },
    /// Resource not found
    NotFound(String),
    /// Missing or invalid deployment configuration
    Config,
    /// Third-party API failure (LLM, store)
    Internal { details: Option<String> },
}

impl AppError {
    /// Wrap a core error, logging it and gating detail to non-production.
    pub fn from_core(err: CoreError, production: bool) -> Self {
        let gate = |msg: String| if production { None } else { Some(msg) };
        match err {
            CoreError::Validation(v) => AppError::Validation(v),
            CoreError::RateLimited => AppError::RateLimited,
            CoreError::ChallengeRejected { codes } => {
                tracing::warn!(?codes, "challenge token rejected");
                AppError::ChallengeRejected {
                    details: gate(codes.join(", ")),
                }
            }
            CoreError::ChallengeService(msg) => {
                tracing::error!(error = %msg, "challenge verification service error");
                AppError::ChallengeService { details: gate(msg) }
            }
            CoreError::Config(msg) => {
                tracing::error!(error = %msg, "configuration error");
                AppError::Config
            }
            CoreError::Store(msg) => {
                tracing::error!(error = %msg, "record store error");
                AppError::Internal { details: gate(msg) }
            }
            CoreError::Upstream(msg) => {
                tracing::error!(error = %msg, "upstream LLM error");
                AppError::Internal { details: gate(msg) }
            }
            CoreError::Other(err) => {
                tracing::error!(error = %err, "internal error");
                AppError::Internal {
                    details: gate(err.to_string()),
                }
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Validation(ValidationError::PayloadTooLarge) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiError::new("PAYLOAD_TOO_LARGE", ValidationError::PayloadTooLarge.to_string()),
            ),
            AppError::Validation(v) => {
                (StatusCode::BAD_REQUEST, ApiError::new("INVALID_INPUT", v.to_string()))
            }
            AppError::RateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, ApiError::new("RATE_LIMITED", "Rate limited"))
            }
            AppError::ChallengeRequired => (
                StatusCode::FORBIDDEN,
                ApiError::new("CHALLENGE_REQUIRED", "CAPTCHA verification required"),
            ),
            AppError::ChallengeRejected { details } => (
                StatusCode::FORBIDDEN,
                ApiError::new("CHALLENGE_REJECTED", "CAPTCHA verification failed")
                    .with_details(details),
            ),
            AppError::ChallengeService { details } => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("CHALLENGE_SERVICE", "CAPTCHA verification service error")
                    .with_details(details),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ApiError::new("NOT_FOUND", format!("{resource} not found")),
            ),
            AppError::Config => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("CONFIG_ERROR", "Service not configured"),
            ),
            AppError::Internal { details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", "Internal server error").with_details(details),
            ),
        };

        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_maps_to_413() {
        let response = AppError::Validation(ValidationError::PayloadTooLarge).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError::Validation(ValidationError::TooLong).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_production_strips_upstream_detail() {
        let err = AppError::from_core(CoreError::Upstream("provider blew up".to_string()), true);
        match err {
            AppError::Internal { details } => assert!(details.is_none()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_development_keeps_upstream_detail() {
        let err = AppError::from_core(CoreError::Upstream("provider blew up".to_string()), false);
        match err {
            AppError::Internal { details } => {
                assert_eq!(details.as_deref(), Some("provider blew up"))
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
