//! Configuration management
//!
//! All configuration is assembled once at process start from environment
//! variables and passed by reference into each component constructor.
//! Required secrets missing at startup fail fast with
//! [`ConfigError::MissingRequired`] instead of surfacing per request.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Turnstile challenge verification
    pub turnstile: TurnstileConfig,

    /// Record store backend
    pub store: StoreConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Context retrieval configuration
    pub retrieval: RetrievalConfig,

    /// Rate limiting policy
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails fast when a required secret is absent so that misconfiguration
    /// is an operator-visible startup error, not a per-request 500.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(env) = std::env::var("APP_ENV") {
            config.server.production = env.eq_ignore_ascii_case("production");
        }
        config.server.dev_endpoints = !config.server.production;
        if let Ok(flag) = std::env::var("DEV_ENDPOINTS") {
            config.server.dev_endpoints = flag == "1" || flag.eq_ignore_ascii_case("true");
        }

        // Turnstile
        config.turnstile.secret = std::env::var("TURNSTILE_SECRET")
            .map_err(|_| ConfigError::MissingRequired("TURNSTILE_SECRET".to_string()))?;
        if let Ok(url) = std::env::var("TURNSTILE_SITEVERIFY_URL") {
            config.turnstile.siteverify_url = url;
        }

        // Record store
        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            config.store.backend = backend.parse()?;
        }
        if config.store.backend == StoreBackend::Cloudflare {
            config.store.cf_account_id = std::env::var("CF_ACCOUNT_ID")
                .map_err(|_| ConfigError::MissingRequired("CF_ACCOUNT_ID".to_string()))?;
            config.store.cf_namespace_id = std::env::var("CF_KV_NAMESPACE_ID")
                .map_err(|_| ConfigError::MissingRequired("CF_KV_NAMESPACE_ID".to_string()))?;
            config.store.cf_api_token = std::env::var("CF_API_TOKEN")
                .map_err(|_| ConfigError::MissingRequired("CF_API_TOKEN".to_string()))?;
        }

        // LLM
        config.llm.api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| ConfigError::MissingRequired("GROQ_API_KEY".to_string()))?;
        if let Ok(url) = std::env::var("GROQ_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(owner) = std::env::var("PROFILE_OWNER") {
            config.llm.owner = owner;
        }
        if let Ok(title) = std::env::var("PROFILE_TITLE") {
            config.llm.owner_title = title;
        }

        // Rate limiting
        if let Ok(points) = std::env::var("RATE_LIMIT_POINTS") {
            config.rate_limit.points = points.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RATE_LIMIT_POINTS".to_string(),
                value: points,
            })?;
        }
        if let Ok(secs) = std::env::var("RATE_LIMIT_WINDOW_SECS") {
            config.rate_limit.window_secs = secs.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RATE_LIMIT_WINDOW_SECS".to_string(),
                value: secs,
            })?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Development configuration: in-memory store, placeholder secrets,
    /// dev endpoints enabled. Used by tests and local runs without secrets.
    pub fn for_dev() -> Self {
        let mut config = Self::default();
        config.turnstile.secret = "dev-turnstile-secret".to_string();
        config.llm.api_key = "dev-groq-key".to_string();
        config.server.dev_endpoints = true;
        config
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Production deployment flag (secure cookies, terse error bodies)
    pub production: bool,

    /// Enable the development-only KV passthrough routes
    pub dev_endpoints: bool,

    /// Route prefixes guarded by the challenge-session gate
    pub protected_routes: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            production: false,
            dev_endpoints: true,
            protected_routes: vec!["/api/chat".to_string()],
        }
    }
}

/// Turnstile challenge-verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Shared secret for the siteverify API
    pub secret: String,

    /// Verification endpoint URL
    pub siteverify_url: String,

    /// Lifetime of a minted verification session, in seconds
    pub session_ttl_secs: u64,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            siteverify_url: "https://challenges.cloudflare.com/turnstile/v0/siteverify"
                .to_string(),
            session_ttl_secs: 30 * 60,
        }
    }
}

/// Record store backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map, for development and tests
    #[default]
    Memory,
    /// Cloudflare Workers KV via the REST API
    Cloudflare,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "cloudflare" => Ok(Self::Cloudflare),
            _ => Err(ConfigError::InvalidValue {
                key: "STORE_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Which backend to use
    pub backend: StoreBackend,

    /// Cloudflare account ID
    pub cf_account_id: String,

    /// KV namespace holding the profile vectors
    pub cf_namespace_id: String,

    /// API token with KV read/write access
    pub cf_api_token: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Groq API key
    pub api_key: String,

    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Model name to use
    pub model: String,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Name of the person this profile represents
    pub owner: String,

    /// Professional title used in the prompt template
    pub owner_title: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 60,
            owner: "Mariano Elorga".to_string(),
            owner_title: "AWS Solutions Architect".to_string(),
        }
    }
}

/// Context retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Upper bound on stored records read per request
    pub max_records: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { max_records: 10 }
    }
}

/// Rate limiting policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window per client key
    pub points: u32,

    /// Window duration in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            points: 30,
            window_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rate_limit.points, 30);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.retrieval.max_records, 10);
        assert_eq!(config.turnstile.session_ttl_secs, 1800);
        assert!(config.server.protected_routes.contains(&"/api/chat".to_string()));
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(
            "cloudflare".parse::<StoreBackend>().unwrap(),
            StoreBackend::Cloudflare
        );
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_dev_config_has_placeholder_secrets() {
        let config = AppConfig::for_dev();
        assert!(!config.turnstile.secret.is_empty());
        assert!(!config.llm.api_key.is_empty());
        assert!(config.server.dev_endpoints);
        assert!(!config.server.production);
    }
}
