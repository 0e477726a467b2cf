//! Test utilities: stub components and a router builder
//!
//! Compiled for unit tests and behind the `test-utils` feature for the
//! integration tests in `tests/`.

use crate::state::AppState;
use async_trait::async_trait;
use axum::Router;
use cv_core::{
    record_key, AppConfig, ChallengeOutcome, ChallengeVerifier, CoreError, EmbeddingRecord,
    FixedWindowLimiter, LlmClient, Result,
};
use cv_store::{KvStore, MemoryKv};
use std::sync::Arc;
use std::time::Duration;

/// LLM stub: returns a fixed reply, or echoes the system prompt so tests can
/// observe what context reached the model.
pub struct StubLlm {
    pub reply: String,
    pub echo_system_prompt: bool,
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, system_prompt: &str, _user_message: &str) -> Result<String> {
        if self.echo_system_prompt {
            Ok(system_prompt.to_string())
        } else {
            Ok(self.reply.clone())
        }
    }
}

/// LLM stub that always fails, for upstream-error paths.
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<String> {
        Err(CoreError::Upstream("stub provider failure".to_string()))
    }
}

/// Challenge verifier stub with a fixed outcome.
pub struct StubVerifier {
    pub accept: bool,
}

#[async_trait]
impl ChallengeVerifier for StubVerifier {
    async fn verify(&self, _token: &str, _client_ip: &str) -> Result<ChallengeOutcome> {
        Ok(ChallengeOutcome {
            success: self.accept,
            error_codes: if self.accept {
                vec![]
            } else {
                vec!["invalid-input-response".to_string()]
            },
        })
    }
}

/// Challenge verifier stub that fails at the transport layer, as when the
/// provider itself is unreachable.
pub struct UnreachableVerifier;

#[async_trait]
impl ChallengeVerifier for UnreachableVerifier {
    async fn verify(&self, _token: &str, _client_ip: &str) -> Result<ChallengeOutcome> {
        Err(CoreError::ChallengeService(
            "stub verifier unreachable".to_string(),
        ))
    }
}

/// Builder for a fully wired test application.
pub struct TestAppBuilder {
    config: AppConfig,
    store: Arc<MemoryKv>,
    verifier_accepts: bool,
    verifier_fails: bool,
    llm_reply: String,
    llm_echoes: bool,
    llm_fails: bool,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::for_dev(),
            store: Arc::new(MemoryKv::new()),
            verifier_accepts: true,
            verifier_fails: false,
            llm_reply: "stub reply".to_string(),
            llm_echoes: false,
            llm_fails: false,
        }
    }

    pub fn rate_limit(mut self, points: u32, window_secs: u64) -> Self {
        self.config.rate_limit.points = points;
        self.config.rate_limit.window_secs = window_secs;
        self
    }

    pub fn production(mut self) -> Self {
        self.config.server.production = true;
        self.config.server.dev_endpoints = false;
        self
    }

    pub fn verifier_accepts(mut self, accept: bool) -> Self {
        self.verifier_accepts = accept;
        self
    }

    pub fn verifier_fails(mut self) -> Self {
        self.verifier_fails = true;
        self
    }

    pub fn llm_reply(mut self, reply: impl Into<String>) -> Self {
        self.llm_reply = reply.into();
        self
    }

    pub fn llm_echoes_prompt(mut self) -> Self {
        self.llm_echoes = true;
        self
    }

    pub fn llm_fails(mut self) -> Self {
        self.llm_fails = true;
        self
    }

    /// Seed one embedding record through the same key scheme ingestion uses.
    pub async fn seed_record(self, file: &str, index: usize, content: &str) -> Self {
        let record = EmbeddingRecord {
            content: content.to_string(),
            vector: vec![0.0; 8],
            file: file.to_string(),
            chunk_index: index,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.store
            .put(
                &record_key(file, index),
                &serde_json::to_string(&record).unwrap(),
            )
            .await
            .unwrap();
        self
    }

    pub fn build_state(self) -> Arc<AppState> {
        let limiter = Arc::new(FixedWindowLimiter::new(
            self.config.rate_limit.points,
            Duration::from_secs(self.config.rate_limit.window_secs),
        ));
        let verifier: Arc<dyn ChallengeVerifier> = if self.verifier_fails {
            Arc::new(UnreachableVerifier)
        } else {
            Arc::new(StubVerifier {
                accept: self.verifier_accepts,
            })
        };
        let llm: Arc<dyn LlmClient> = if self.llm_fails {
            Arc::new(FailingLlm)
        } else {
            Arc::new(StubLlm {
                reply: self.llm_reply,
                echo_system_prompt: self.llm_echoes,
            })
        };
        Arc::new(AppState::new(
            self.config,
            limiter,
            self.store,
            verifier,
            llm,
        ))
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a router from the builder.
pub fn test_router(builder: TestAppBuilder) -> Router {
    crate::routes::create_router(builder.build_state())
}
