use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Neighbors pulled per target skill during similarity expansion.
    pub similarity_top_k: usize,
    /// Result limit applied when a request omits `limit`.
    pub default_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            similarity_top_k: std::env::var("SIMILARITY_TOP_K")
                .unwrap_or_else(|_| "5".to_string())
                .parse::<usize>()
                .context("SIMILARITY_TOP_K must be a non-negative integer")?,
            default_limit: std::env::var("RESULT_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<usize>()
                .context("RESULT_LIMIT must be a non-negative integer")?,
        })
    }

    /// Default tracing filter directive when `RUST_LOG` is unset. Tracing
    /// targets use the crate path, so the package name's hyphen must become
    /// an underscore or the directive matches nothing.
    pub fn log_directive(&self) -> String {
        format!(
            "{}={}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            self.rust_log
        )
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
