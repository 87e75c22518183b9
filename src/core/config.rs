//! Application configuration management
//!
//! This module loads configuration from an optional TOML file. The gateway
//! credential is never stored in the file; only the name of the environment
//! variable holding it is configurable.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default server port
const DEFAULT_PORT: u16 = 8787;

/// Default upstream gateway
const DEFAULT_BASE_URL: &str = "https://ai.gateway.lovable.dev/v1";

/// Default completion model
const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";

/// Default credential variable
const DEFAULT_API_KEY_ENV: &str = "LOVABLE_API_KEY";

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 120;

/// Complete lines that may queue behind a stalled stream line before the session fails
const DEFAULT_MAX_STALLED_LINES: u32 = 16;

/// Upper bound on text buffered by the stream parser
const DEFAULT_MAX_PENDING_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Bounds on the client-side chunk parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_max_stalled_lines")]
    pub max_stalled_lines: u32,
    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_stalled_lines: default_max_stalled_lines(),
            max_pending_bytes: default_max_pending_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_max_stalled_lines() -> u32 {
    DEFAULT_MAX_STALLED_LINES
}

fn default_max_pending_bytes() -> usize {
    DEFAULT_MAX_PENDING_BYTES
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;
        Self::from_toml(&content)
    }

    /// Load configuration from `CONFIG_PATH` (default `config.toml`)
    ///
    /// A missing file yields the defaults.
    pub fn from_env() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Gateway credential from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.gateway.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            log_level = "debug"

            [gateway]
            base_url = "http://localhost:4000/v1"
            model = "test/model"
            api_key_env = "STUDY_AI_TEST_KEY_UNSET"
            request_timeout = 30

            [stream]
            max_stalled_lines = 4
        "#
        )
        .unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = create_test_config();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.gateway.model, "test/model");
        assert_eq!(config.gateway.request_timeout, 30);
        assert_eq!(config.stream.max_stalled_lines, 4);
        assert_eq!(config.stream.max_pending_bytes, DEFAULT_MAX_PENDING_BYTES);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.gateway.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.gateway.api_key_env, "LOVABLE_API_KEY");
        assert_eq!(config.stream, StreamConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml("[server\nport = ").is_err());
    }

    #[test]
    fn test_missing_api_key() {
        let file = create_test_config();
        let config = Config::from_file(file.path()).unwrap();
        assert!(config.api_key().is_none());
    }
}
