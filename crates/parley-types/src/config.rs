//! Configuration types for Parley.
//!
//! `ParleyConfig` is the top-level `config.toml`. Every field has a default so
//! an empty file (or no file at all) yields a working local setup. API keys
//! are usually supplied through the environment; see
//! `parley_infra::config::load_config`.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database location. `None` means `{data_dir}/parley.db`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. A random one is generated per process when unset,
    /// which invalidates tokens on restart.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
}

fn default_access_ttl_minutes() -> i64 {
    60
}

fn default_refresh_ttl_days() -> i64 {
    7
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_days: default_refresh_ttl_days(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .finish()
    }
}

/// AI provider selection and provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Debug-log prompts sent to providers.
    #[serde(default = "default_true")]
    pub log_requests: bool,
    /// Debug-log generated text and transcripts.
    #[serde(default = "default_true")]
    pub log_responses: bool,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub whisper: WhisperConfig,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            log_requests: true,
            log_responses: true,
            gemini: GeminiConfig::default(),
            whisper: WhisperConfig::default(),
        }
    }
}

/// Google Gemini settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub timeout_secs: u64,
    /// Total attempts, including the first.
    pub max_retries: u32,
    pub retry_min_wait_secs: f64,
    pub retry_max_wait_secs: f64,
    /// When false, every harm category is sent with `BLOCK_NONE`.
    pub block_dangerous_content: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_output_tokens: 2048,
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            timeout_secs: 30,
            max_retries: 3,
            retry_min_wait_secs: 1.0,
            retry_max_wait_secs: 10.0,
            block_dangerous_content: true,
        }
    }
}

impl GeminiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// OpenAI Whisper settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub default_language: String,
    pub response_format: String,
    pub timeout_secs: u64,
    pub max_file_size_mb: u64,
    pub supported_formats: Vec<String>,
    pub max_retries: u32,
    pub retry_min_wait_secs: f64,
    pub retry_max_wait_secs: f64,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "whisper-1".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            default_language: "vi".to_string(),
            response_format: "json".to_string(),
            timeout_secs: 60,
            max_file_size_mb: 25,
            supported_formats: [
                "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_retries: 3,
            retry_min_wait_secs: 2.0,
            retry_max_wait_secs: 30.0,
        }
    }
}

impl WhisperConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl fmt::Debug for WhisperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhisperConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("default_language", &self.default_language)
            .field("max_file_size_mb", &self.max_file_size_mb)
            .finish_non_exhaustive()
    }
}
