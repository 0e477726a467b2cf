//! Inbound chat message validation
//!
//! The validator runs before anything else touches the body: raw size is
//! checked before JSON parsing, and the message text is screened against a
//! fixed denylist of abuse patterns. It rejects, never rewrites, the input.
//! Denylist matching is inherently incomplete; it reduces obvious abuse,
//! not all injection classes.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Maximum accepted raw body size in bytes
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Maximum accepted message length in characters
pub const MAX_MESSAGE_CHARS: usize = 1000;

lazy_static! {
    /// Patterns the message must not match. Checked in order; the first hit
    /// rejects the request.
    static ref DENYLIST: Vec<(&'static str, Regex)> = vec![
        (
            "script tag",
            Regex::new(r"(?is)<\s*script\b").unwrap(),
        ),
        (
            "javascript uri",
            Regex::new(r"(?i)javascript\s*:").unwrap(),
        ),
        (
            "sql keywords",
            Regex::new(r"(?is)\b(select|insert|update|delete|drop|union)\b.{0,100}\b(from|into|set|table|where)\b")
                .unwrap(),
        ),
        (
            "shell invocation",
            Regex::new(r"(?i)(;|\||&&|`|\$\()\s*(rm|ls|cat|curl|wget|sh|bash|nc)\b").unwrap(),
        ),
    ];
}

/// A validated chat request body
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    /// The visitor's question
    pub message: String,

    /// Optional fresh Turnstile token, accepted in place of a session
    #[serde(rename = "turnstileToken")]
    pub turnstile_token: Option<String>,
}

/// Validation failures, ordered by the check that produced them
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body exceeds {MAX_BODY_BYTES} bytes")]
    PayloadTooLarge,

    #[error("Request body is not valid JSON")]
    Malformed,

    #[error("Message is required and must be a string")]
    MissingField,

    #[error("Message exceeds {MAX_MESSAGE_CHARS} characters")]
    TooLong,

    #[error("Message contains disallowed content ({0})")]
    Suspicious(&'static str),
}

/// Validate a raw chat request body.
///
/// Checks run in a fixed order: byte size, JSON shape, `message` presence,
/// character length, denylist. The size check happens before any parse so an
/// oversized body is never deserialized.
pub fn validate_chat_body(raw: &[u8]) -> Result<ChatMessage, ValidationError> {
    if raw.len() > MAX_BODY_BYTES {
        return Err(ValidationError::PayloadTooLarge);
    }

    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|_| ValidationError::Malformed)?;

    // `message` must be present and a string; serde would also accept
    // missing-vs-null ambiguously, so check the shape explicitly first.
    match value.get("message") {
        Some(serde_json::Value::String(_)) => {}
        _ => return Err(ValidationError::MissingField),
    }

    let parsed: ChatMessage =
        serde_json::from_value(value).map_err(|_| ValidationError::MissingField)?;

    if parsed.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::TooLong);
    }

    for (label, pattern) in DENYLIST.iter() {
        if pattern.is_match(&parsed.message) {
            return Err(ValidationError::Suspicious(label));
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({ "message": message })).unwrap()
    }

    #[test]
    fn test_accepts_ordinary_question() {
        let msg = validate_chat_body(&body("What is your AWS experience?")).unwrap();
        assert_eq!(msg.message, "What is your AWS experience?");
        assert!(msg.turnstile_token.is_none());
    }

    #[test]
    fn test_carries_turnstile_token() {
        let raw = serde_json::to_vec(&serde_json::json!({
            "message": "hi",
            "turnstileToken": "tok-123"
        }))
        .unwrap();
        let msg = validate_chat_body(&raw).unwrap();
        assert_eq!(msg.turnstile_token.as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_oversized_body_rejected_before_parse() {
        // Not even valid JSON; the size check must fire first.
        let raw = vec![b'x'; MAX_BODY_BYTES + 1];
        assert_eq!(
            validate_chat_body(&raw),
            Err(ValidationError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_non_json_body_rejected() {
        assert_eq!(
            validate_chat_body(b"not json at all"),
            Err(ValidationError::Malformed)
        );
    }

    #[test]
    fn test_missing_message_field() {
        let raw = serde_json::to_vec(&serde_json::json!({ "question": "hi" })).unwrap();
        assert_eq!(validate_chat_body(&raw), Err(ValidationError::MissingField));
    }

    #[test]
    fn test_non_string_message_rejected() {
        let raw = serde_json::to_vec(&serde_json::json!({ "message": 42 })).unwrap();
        assert_eq!(validate_chat_body(&raw), Err(ValidationError::MissingField));

        let raw = serde_json::to_vec(&serde_json::json!({ "message": null })).unwrap();
        assert_eq!(validate_chat_body(&raw), Err(ValidationError::MissingField));
    }

    #[test]
    fn test_too_long_message() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(validate_chat_body(&body(&long)), Err(ValidationError::TooLong));
    }

    #[test]
    fn test_message_at_limit_accepted() {
        let exact = "y".repeat(MAX_MESSAGE_CHARS);
        assert!(validate_chat_body(&body(&exact)).is_ok());
    }

    #[test]
    fn test_script_tag_rejected() {
        let err = validate_chat_body(&body("<script>alert(1)</script>")).unwrap_err();
        assert!(matches!(err, ValidationError::Suspicious("script tag")));
    }

    #[test]
    fn test_javascript_uri_rejected() {
        let err = validate_chat_body(&body("click javascript:alert(1)")).unwrap_err();
        assert!(matches!(err, ValidationError::Suspicious("javascript uri")));
    }

    #[test]
    fn test_sql_sequence_rejected() {
        let err = validate_chat_body(&body("SELECT * FROM users WHERE 1=1")).unwrap_err();
        assert!(matches!(err, ValidationError::Suspicious("sql keywords")));
    }

    #[test]
    fn test_shell_invocation_rejected() {
        let err = validate_chat_body(&body("hello; rm -rf /")).unwrap_err();
        assert!(matches!(err, ValidationError::Suspicious("shell invocation")));
    }

    #[test]
    fn test_benign_sql_word_alone_passes() {
        // "select" without a clause keyword nearby is ordinary English.
        assert!(validate_chat_body(&body("How do you select a cloud region?")).is_ok());
    }
}
