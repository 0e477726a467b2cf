//! CV Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the CV site
//! backend:
//! - Embedding record model (the stored profile chunks)
//! - Chat message validation
//! - Challenge verification (Turnstile) and session model
//! - Rate limiting
//! - Common error types
//! - Configuration management

pub mod challenge;
pub mod config;
pub mod limit;
pub mod validate;

pub use challenge::{ChallengeOutcome, ChallengeSession, ChallengeVerifier, TurnstileVerifier};
pub use config::{
    AppConfig, ConfigError, LlmConfig, RateLimitConfig, RetrievalConfig, ServerConfig,
    StoreBackend, StoreConfig, TurnstileConfig,
};
pub use limit::{FixedWindowLimiter, RateLimiter};
pub use validate::{validate_chat_body, ChatMessage, ValidationError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for CV site operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Rate limited")]
    RateLimited,

    #[error("Challenge rejected")]
    ChallengeRejected { codes: Vec<String> },

    #[error("Challenge service error: {0}")]
    ChallengeService(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Upstream LLM error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================================================
// Embedding Records
// ============================================================================

/// A stored profile chunk with its precomputed embedding vector.
///
/// Records are produced once by the offline ingestion tool and stored under
/// keys of the form `"<file>-chunk-<index>"`. The serving path only reads
/// them; re-running ingestion overwrites them wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Chunk text, exactly as extracted from the source document
    pub content: String,

    /// Embedding vector for the chunk
    pub vector: Vec<f32>,

    /// Source document filename
    pub file: String,

    /// Zero-based chunk position within the source document
    #[serde(rename = "chunkIndex")]
    pub chunk_index: usize,

    /// RFC 3339 timestamp of when the record was generated
    pub timestamp: String,
}

impl EmbeddingRecord {
    /// Storage key for this record: `"<file>-chunk-<index>"`
    pub fn key(&self) -> String {
        record_key(&self.file, self.chunk_index)
    }
}

/// Build the storage key for a document chunk.
pub fn record_key(file: &str, chunk_index: usize) -> String {
    format!("{file}-chunk-{chunk_index}")
}

// ============================================================================
// LLM Client Trait
// ============================================================================

/// Abstraction over the hosted chat-completion API.
///
/// The handler composes a system prompt from retrieved context and forwards
/// it together with the visitor's message. Implementations do not retry;
/// a failed remote call surfaces as [`CoreError::Upstream`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one system + user message pair, returning the assistant text.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_format() {
        assert_eq!(record_key("cv.txt", 0), "cv.txt-chunk-0");
        assert_eq!(record_key("profile.md", 12), "profile.md-chunk-12");
    }

    #[test]
    fn test_embedding_record_serde_field_names() {
        let record = EmbeddingRecord {
            content: "Hello world".to_string(),
            vector: vec![0.1, 0.2],
            file: "doc.txt".to_string(),
            chunk_index: 3,
            timestamp: "2025-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["chunkIndex"], 3);
        assert_eq!(json["content"], "Hello world");
        assert_eq!(record.key(), "doc.txt-chunk-3");

        let back: EmbeddingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.chunk_index, 3);
    }
}
