//! Configuration loader for Parley.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` by default) and
//! deserializes it into [`ParleyConfig`]. A missing or malformed file falls
//! back to defaults. Environment variables are applied last, so API keys
//! normally never touch the file.

use std::path::{Path, PathBuf};

use parley_types::config::ParleyConfig;

/// Resolve the data directory.
///
/// Priority:
/// 1. `PARLEY_DATA_DIR` environment variable
/// 2. `~/.parley`
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLEY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }
    PathBuf::from(".parley")
}

/// Load `{data_dir}/config.toml`, then apply environment overrides.
pub async fn load_config(data_dir: &Path) -> ParleyConfig {
    let mut config = read_config_file(data_dir).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(data_dir: &Path) -> ParleyConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
    };

    match toml::from_str::<ParleyConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ParleyConfig::default()
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment overrides. `lookup` returns the variable's value, if set.
/// Empty values are ignored.
pub fn apply_env_overrides(config: &mut ParleyConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("GEMINI_API_KEY") {
        config.ai.gemini.api_key = Some(key);
    }
    if let Some(model) = get("GEMINI_MODEL") {
        config.ai.gemini.model = model;
    }
    if let Some(key) = get("OPENAI_API_KEY") {
        config.ai.whisper.api_key = Some(key);
    }
    if let Some(provider) = get("AI_PROVIDER") {
        config.ai.provider = provider.trim().to_lowercase();
    }
    for (var, target) in [
        ("AI_LOG_REQUESTS", &mut config.ai.log_requests),
        ("AI_LOG_RESPONSES", &mut config.ai.log_responses),
    ] {
        if let Some(raw) = get(var) {
            match parse_flag(&raw) {
                Some(flag) => *target = flag,
                None => tracing::warn!("Ignoring {var}={raw}: expected true or false"),
            }
        }
    }
    if let Some(secret) = get("PARLEY_JWT_SECRET") {
        config.auth.jwt_secret = Some(secret);
    }
    if let Some(url) = get("PARLEY_DATABASE_URL") {
        config.database.url = Some(url);
    }
}
