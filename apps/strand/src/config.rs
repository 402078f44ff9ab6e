//! # Server Configuration
//!
//! `ServerConfig` is read from an optional TOML file and then overridden by
//! environment variables:
//!
//! - `STRAND_CORS_ORIGINS`: comma-separated origins, or `*` for all
//! - `STRAND_RATE_LIMIT`: messages per second (0 disables limiting)
//! - `STRAND_API_KEY`: if set, clients must present this key
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8090
//! rate_limit = 200
//! cors_origins = ["http://localhost:3000"]
//! snapshot = "graph.strd"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use strand_core::StrandError;

/// Default messages per second accepted by the server.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default cap on a single WebSocket message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` allows localhost origins only.
    pub cors_origins: Option<Vec<String>>,
    /// Messages per second across all connections. 0 disables limiting.
    pub rate_limit: u32,
    pub api_key: Option<String>,
    /// Snapshot loaded at startup and written on shutdown.
    pub snapshot: Option<PathBuf>,
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            cors_origins: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
            snapshot: None,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load from `path` (or defaults) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, StrandError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    StrandError::IoError(format!("Cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, StrandError> {
        toml::from_str(text)
            .map_err(|e| StrandError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Apply `STRAND_*` overrides looked up through `lookup`.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origins) = lookup("STRAND_CORS_ORIGINS") {
            self.cors_origins = Some(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(limit) = lookup("STRAND_RATE_LIMIT") {
            match limit.trim().parse() {
                Ok(limit) => self.rate_limit = limit,
                Err(_) => tracing::warn!("Ignoring invalid STRAND_RATE_LIMIT '{}'", limit),
            }
        }
        if let Some(key) = lookup("STRAND_API_KEY") {
            self.api_key = Some(key);
        }
        self.api_key = self.api_key.filter(|k| !k.is_empty());
        self
    }

    /// Socket address to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
