//! Client configuration loaded from environment variables.
//!
//! The client needs an API key and the model identifiers for the two
//! tiers it calls: a high-capability "smart" model for game-theoretic
//! reasoning and report synthesis, and a cheap "fast" model for DNA
//! lookups and batch work. A missing key fails here, before any network
//! attempt is made.

use std::time::Duration;

use crate::error::ClientError;

/// Default API base URL for the GLM open platform.
pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Default model for complex reasoning (turn decisions, final report).
pub const DEFAULT_SMART_MODEL: &str = "glm-4.6";

/// Default model for search-backed lookups and batch jobs.
pub const DEFAULT_FAST_MODEL: &str = "glm-4-flash";

/// Model capability tiers with distinct vendor concurrency quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// High-capability model; low vendor concurrency quota.
    Smart,
    /// Cheap, fast model; generous concurrency quota.
    Fast,
}

impl ModelTier {
    /// Client-side cap on simultaneous in-flight calls for this tier.
    ///
    /// These are conservative bounds under the vendor's published
    /// per-model quotas; exceeding them produces 429/1303 responses.
    pub const fn concurrency_limit(self) -> usize {
        match self {
            Self::Smart => 2,
            Self::Fast => 8,
        }
    }

    /// Human-readable name for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Fast => "fast",
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Bearer token for the API.
    pub api_key: String,
    /// API base URL (no trailing slash).
    pub base_url: String,
    /// Model identifier for the smart tier.
    pub smart_model: String,
    /// Model identifier for the fast tier.
    pub fast_model: String,
    /// Total attempts per retried call.
    pub retry_attempts: u32,
    /// Backoff before the first retry; doubles on each subsequent one.
    pub retry_initial_delay: Duration,
}

impl LlmConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `POLARIS_API_KEY` -- API credential
    ///
    /// Optional:
    /// - `POLARIS_API_BASE_URL` -- API base URL
    /// - `POLARIS_SMART_MODEL` -- smart-tier model identifier
    /// - `POLARIS_FAST_MODEL` -- fast-tier model identifier
    /// - `POLARIS_RETRY_ATTEMPTS` -- total attempts per call (default 3)
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = std::env::var("POLARIS_API_KEY").map_err(|_| {
            ClientError::Config(String::from(
                "POLARIS_API_KEY is not set; configure the API credential",
            ))
        })?;
        if api_key.trim().is_empty() {
            return Err(ClientError::Config(String::from(
                "POLARIS_API_KEY is empty; configure the API credential",
            )));
        }

        let retry_attempts: u32 = std::env::var("POLARIS_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| String::from("3"))
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid POLARIS_RETRY_ATTEMPTS: {e}")))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("POLARIS_API_BASE_URL")
                .unwrap_or_else(|_| String::from(DEFAULT_BASE_URL)),
            smart_model: std::env::var("POLARIS_SMART_MODEL")
                .unwrap_or_else(|_| String::from(DEFAULT_SMART_MODEL)),
            fast_model: std::env::var("POLARIS_FAST_MODEL")
                .unwrap_or_else(|_| String::from(DEFAULT_FAST_MODEL)),
            retry_attempts,
            retry_initial_delay: Duration::from_secs(1),
        })
    }

    /// The model identifier for a tier.
    pub fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Smart => &self.smart_model,
            ModelTier::Fast => &self.fast_model,
        }
    }

    /// A configuration with the given key and all defaults.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_BASE_URL),
            smart_model: String::from(DEFAULT_SMART_MODEL),
            fast_model: String::from(DEFAULT_FAST_MODEL),
            retry_attempts: 3,
            retry_initial_delay: Duration::from_secs(1),
        }
    }
}
