//! Application state shared across handlers
//!
//! Every component behind a trait object is injected here once at startup;
//! handlers never construct clients or read the environment themselves.

use crate::error::AppError;
use cv_core::{
    AppConfig, ChallengeVerifier, CoreError, FixedWindowLimiter, LlmClient, RateLimiter,
    TurnstileVerifier,
};
use cv_rag::{GroqClient, ProfileIdentity};
use cv_store::KvStore;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
pub struct AppState {
    /// Application configuration, assembled once at startup
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Rate limiter guarding all routes
    pub limiter: Arc<dyn RateLimiter>,
    /// Profile record store
    pub store: Arc<dyn KvStore>,
    /// Challenge verification service
    pub verifier: Arc<dyn ChallengeVerifier>,
    /// Hosted chat-completion client
    pub llm: Arc<dyn LlmClient>,
    /// Who the assistant speaks for
    pub identity: ProfileIdentity,
}

impl AppState {
    /// Assemble state from pre-built components.
    pub fn new(
        config: AppConfig,
        limiter: Arc<dyn RateLimiter>,
        store: Arc<dyn KvStore>,
        verifier: Arc<dyn ChallengeVerifier>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let identity = ProfileIdentity::from_config(&config.llm);
        Self {
            config,
            start_time: Instant::now(),
            limiter,
            store,
            verifier,
            llm,
            identity,
        }
    }

    /// Build production components from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
        let store = cv_store::create_store(&config);
        let verifier = Arc::new(TurnstileVerifier::from_config(&config.turnstile));
        let llm = Arc::new(GroqClient::from_config(&config.llm)?);
        Ok(Self::new(config, limiter, store, verifier, llm))
    }

    /// Uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Whether this deployment is production (gates error detail and cookies)
    pub fn production(&self) -> bool {
        self.config.server.production
    }

    /// Wrap a core error with this deployment's detail gating.
    pub fn app_error(&self, err: CoreError) -> AppError {
        AppError::from_core(err, self.production())
    }
}
