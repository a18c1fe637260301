//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use `__` as the separator, e.g. `LLM__API_KEY` or
//! `SESSION__IDLE_MINUTES`.

use concierge_ai::backend::{DEFAULT_MODEL, OPENAI_BASE_URL};
use concierge_ai::{FailurePolicy, LlmBackendConfig, LlmProvider};
use concierge_conversation::DEFAULT_REPLAY_TURNS;
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Completion service configuration.
    pub llm: LlmSettings,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Completion service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// Bearer credential for the completion service.
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP timeout per completion, in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Whether a failed completion degrades to the fallback text or fails
    /// the request.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Overrides the fallback text.
    #[serde(default)]
    pub fallback_message: Option<String>,
}

impl LlmSettings {
    /// Returns the backend configuration for these settings.
    #[must_use]
    pub fn backend_config(&self) -> LlmBackendConfig {
        let provider = if self.base_url.trim_end_matches('/') == OPENAI_BASE_URL {
            LlmProvider::OpenAi
        } else {
            LlmProvider::OpenAiCompatible
        };

        let mut config = LlmBackendConfig::openai_compatible(&self.base_url, &self.model)
            .with_api_key(&self.api_key);
        config.provider = provider;
        if let Some(secs) = self.timeout_seconds {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

/// Longest accepted idle timeout: one week.
pub const MAX_IDLE_MINUTES: u32 = 7 * 24 * 60;

/// Chat session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Minutes without a turn after which a conversation is dropped.
    /// Must be between 1 and [`MAX_IDLE_MINUTES`].
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: u32,

    /// Interval between idle-session sweeps, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// User turns replayed to the model per chat reply; 0 replays all.
    #[serde(default = "default_replay_turns")]
    pub replay_turns: usize,
}

impl SessionConfig {
    /// Returns the replay window, `None` meaning unbounded.
    #[must_use]
    pub fn replay_window(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.replay_turns)
    }

    /// Returns the idle timeout in minutes as an `i64`.
    #[must_use]
    pub fn idle_minutes_signed(&self) -> i64 {
        i64::from(self.idle_minutes)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=MAX_IDLE_MINUTES).contains(&self.idle_minutes) {
            return Err(config::ConfigError::Message(format!(
                "session.idle_minutes must be between 1 and {MAX_IDLE_MINUTES}, got {}",
                self.idle_minutes
            )));
        }
        Ok(())
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_base_url() -> String {
    OPENAI_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_idle_minutes() -> u32 {
    60
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_secure_cookies() -> bool {
    true
}

fn default_replay_turns() -> usize {
    DEFAULT_REPLAY_TURNS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            secure_cookies: default_secure_cookies(),
            replay_turns: default_replay_turns(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(
            config::Config::builder().add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.session.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConfigBuilder<DefaultState> {
        config::Config::builder()
            .set_override("llm.api_key", "sk-test")
            .expect("override")
    }

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_minutes, 60);
        assert_eq!(config.cleanup_interval_seconds, 300);
        assert!(config.secure_cookies);
        assert_eq!(config.replay_window(), NonZeroUsize::new(20));
    }

    #[test]
    fn only_the_api_key_is_required() {
        let config = ServerConfig::load(builder()).expect("config");

        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.model, "gpt-3.5-turbo-0125");
        assert_eq!(config.llm.failure_policy, FailurePolicy::Fallback);
        assert!(config.llm.timeout_seconds.is_none());

        let backend = config.llm.backend_config();
        assert_eq!(backend.provider, LlmProvider::OpenAi);
        assert_eq!(backend.api_key.as_deref(), Some("sk-test"));
        assert!(backend.timeout.is_none());
    }

    #[test]
    fn missing_api_key_is_an_error() {
        assert!(ServerConfig::load(config::Config::builder()).is_err());
    }

    #[test]
    fn overrides_are_applied() {
        let builder = builder()
            .set_override("llm.base_url", "http://localhost:11434/v1/")
            .and_then(|b| b.set_override("llm.timeout_seconds", 30))
            .and_then(|b| b.set_override("llm.failure_policy", "propagate"))
            .and_then(|b| b.set_override("session.replay_turns", 0))
            .and_then(|b| b.set_override("session.secure_cookies", false))
            .expect("override");

        let config = ServerConfig::load(builder).expect("config");
        let backend = config.llm.backend_config();

        assert_eq!(backend.provider, LlmProvider::OpenAiCompatible);
        assert_eq!(
            backend.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(backend.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.llm.failure_policy, FailurePolicy::Propagate);
        assert_eq!(config.session.replay_window(), None);
        assert!(!config.session.secure_cookies);
    }

    #[test]
    fn out_of_range_idle_minutes_are_rejected() {
        for bad in [0, i64::from(MAX_IDLE_MINUTES) + 1, -5, i64::MAX / 2] {
            let builder = builder()
                .set_override("session.idle_minutes", bad)
                .expect("override");

            assert!(ServerConfig::load(builder).is_err(), "idle_minutes = {bad}");
        }
    }

    #[test]
    fn longest_idle_timeout_is_accepted() {
        let builder = builder()
            .set_override("session.idle_minutes", i64::from(MAX_IDLE_MINUTES))
            .expect("override");

        let config = ServerConfig::load(builder).expect("config");
        assert_eq!(config.session.idle_minutes_signed(), 10_080);
    }

    #[test]
    fn one_replay_turn_is_a_bounded_window() {
        let config = SessionConfig {
            replay_turns: 1,
            ..SessionConfig::default()
        };
        assert_eq!(config.replay_window(), NonZeroUsize::new(1));
    }
}
