use std::env;

/// Environment variable naming the QA service base address.
pub const API_URL_ENV: &str = "COMPANY_CHAT_API_URL";

/// Used when the environment variable is unset or blank.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
}

impl Config {
    /// Resolve configuration once at startup. The base address is the only
    /// configurable value; nothing is persisted.
    pub fn from_env() -> Self {
        Self {
            api_url: resolve_api_url(env::var(API_URL_ENV).ok()),
        }
    }
}

fn resolve_api_url(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().trim_end_matches('/').to_string(),
        _ => DEFAULT_API_URL.to_string(),
    }
}
