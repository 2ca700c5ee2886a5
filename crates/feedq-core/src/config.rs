//! Feed configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Chunk width used when a query does not call `chunks(..)`.
pub const DEFAULT_CHUNK_SIZE: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Origin that relative feed paths resolve against (e.g. `https://www.example.com`).
    pub base_url: Option<String>,

    /// Default chunk width for paginated fetches.
    pub chunk_size: usize,

    /// Per-request timeout applied by the HTTP transport. The query engine
    /// itself never times out.
    pub timeout_ms: u64,

    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout_ms: 30_000,
            user_agent: concat!("feedq/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FeedConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `FEEDQ_BASE_URL`: origin for relative paths
    /// - `FEEDQ_CHUNK_SIZE`: default chunk width (ignored unless positive)
    /// - `FEEDQ_TIMEOUT_MS`: HTTP request timeout
    /// - `FEEDQ_USER_AGENT`: user agent header
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(s) = lookup("FEEDQ_BASE_URL") {
            let s = s.trim();
            if !s.is_empty() {
                cfg.base_url = Some(s.to_string());
            }
        }

        if let Some(s) = lookup("FEEDQ_CHUNK_SIZE") {
            if let Ok(v) = s.trim().parse::<usize>() {
                if v > 0 {
                    cfg.chunk_size = v;
                }
            }
        }

        if let Some(s) = lookup("FEEDQ_TIMEOUT_MS") {
            if let Ok(v) = s.trim().parse::<u64>() {
                cfg.timeout_ms = v;
            }
        }

        if let Some(s) = lookup("FEEDQ_USER_AGENT") {
            cfg.user_agent = s;
        }

        cfg
    }
}
