//! Environment configuration
//!
//! Read after `dotenv::dotenv()` in the binaries. Every value except the
//! API key has a default.

use crate::error::FinlitError;
use crate::Result;
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_PORT: u16 = 8080;
/// News responses are reused for 15 minutes
pub const DEFAULT_NEWS_TTL: Duration = Duration::from_secs(15 * 60);
/// Idle quiz, risk and chat sessions are dropped after an hour
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Quiz generation, risk, budget, content
    pub fast_model: String,
    /// Mixed-format quizzes, scoring, agent interpretation
    pub reasoning_model: String,
    /// Chat assistant
    pub lite_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            fast_model: "gemini-2.5-flash".to_string(),
            reasoning_model: "gemini-2.5-pro".to_string(),
            lite_model: "gemini-flash-lite-latest".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub port: u16,
    pub news_cache_ttl: Duration,
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            port: DEFAULT_PORT,
            news_cache_ttl: DEFAULT_NEWS_TTL,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GeminiConfig::default();
        let get = |key: &str, default: String| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
        };

        let gemini = GeminiConfig {
            api_key: lookup("GEMINI_API_KEY")
                .or_else(|| lookup("API_KEY"))
                .unwrap_or_default(),
            base_url: get("GEMINI_BASE_URL", defaults.base_url),
            fast_model: get("GEMINI_FAST_MODEL", defaults.fast_model),
            reasoning_model: get("GEMINI_REASONING_MODEL", defaults.reasoning_model),
            lite_model: get("GEMINI_LITE_MODEL", defaults.lite_model),
        };

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| FinlitError::ConfigError(format!("invalid port '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let news_cache_ttl = match lookup("NEWS_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                FinlitError::ConfigError(format!("invalid NEWS_CACHE_TTL_SECS '{}': {}", raw, e))
            })?),
            None => DEFAULT_NEWS_TTL,
        };

        let session_ttl = match lookup("SESSION_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                FinlitError::ConfigError(format!("invalid SESSION_TTL_SECS '{}': {}", raw, e))
            })?),
            None => DEFAULT_SESSION_TTL,
        };

        Ok(Self {
            gemini,
            port,
            news_cache_ttl,
            session_ttl,
        })
    }

    pub fn has_api_key(&self) -> bool {
        let key = self.gemini.api_key.trim();
        !key.is_empty() && key != "your_gemini_api_key_here"
    }
}
