//! Configuration module for velomux
//!
//! Handles TOML-based configuration for the server binary.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Static file serving
    #[serde(default)]
    pub static_files: Option<StaticFilesConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Load configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.listen_addr()?;
        self.server.max_body_size_bytes()?;

        let workers_ok = self.server.workers == "auto"
            || self.server.workers.parse::<usize>().map_or(false, |n| n > 0);
        if !workers_ok {
            return Err(ConfigError::ValidationError(format!(
                "server.workers must be \"auto\" or a positive number, got {:?}",
                self.server.workers
            )));
        }

        if let Some(ref files) = self.static_files {
            if !files.prefix.starts_with('/') {
                return Err(ConfigError::ValidationError(
                    "static_files.prefix must start with '/'".to_string(),
                ));
            }
            if files.root.is_empty() {
                return Err(ConfigError::ValidationError(
                    "static_files.root must be specified".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Get the number of worker threads
    pub fn worker_threads(&self) -> usize {
        match self.server.workers.as_str() {
            "auto" => num_cpus::get(),
            n => n.parse().unwrap_or_else(|_| num_cpus::get()),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Number of worker threads ("auto" or a number)
    #[serde(default = "default_workers")]
    pub workers: String,

    /// TCP keep-alive period in seconds, 0 disables it
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive: u64,

    /// Maximum request body size
    #[serde(default = "default_max_body_size")]
    pub max_body_size: String,

    /// Debug logging
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: default_workers(),
            tcp_keepalive: default_tcp_keepalive(),
            max_body_size: default_max_body_size(),
            debug: false,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| {
            ConfigError::ValidationError(format!("invalid listen address {:?}", self.listen))
        })
    }

    /// `max_body_size` in bytes.
    pub fn max_body_size_bytes(&self) -> Result<usize, ConfigError> {
        parse_size(&self.max_body_size).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "invalid max_body_size {:?}",
                self.max_body_size
            ))
        })
    }

    pub fn tcp_keepalive(&self) -> Option<Duration> {
        (self.tcp_keepalive > 0).then(|| Duration::from_secs(self.tcp_keepalive))
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_workers() -> String {
    "auto".to_string()
}

fn default_tcp_keepalive() -> u64 {
    180
}

fn default_max_body_size() -> String {
    "10M".to_string()
}

/// Static file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    /// URL prefix the files are served under
    #[serde(default = "default_static_prefix")]
    pub prefix: String,

    /// Filesystem directory
    pub root: String,
}

fn default_static_prefix() -> String {
    "/static".to_string()
}

/// Parse sizes like `512`, `64K`, `10M` or `1G`.
fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    let (digits, multiplier) = match s.chars().last()?.to_ascii_uppercase() {
        'K' => (&s[..s.len() - 1], 1024),
        'M' => (&s[..s.len() - 1], 1024 * 1024),
        'G' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };
    digits.trim().parse::<usize>().ok()?.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.server.max_body_size_bytes().unwrap(), 10 * 1024 * 1024);
        assert_eq!(config.server.tcp_keepalive(), Some(Duration::from_secs(180)));
        assert!(config.static_files.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [server]
            listen = "127.0.0.1:9000"
            workers = "4"
            tcp_keepalive = 0
            max_body_size = "64K"
            debug = true

            [static_files]
            root = "./public"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.server.workers, "4");
        assert_eq!(config.server.tcp_keepalive(), None);
        assert_eq!(config.server.max_body_size_bytes().unwrap(), 64 * 1024);
        assert!(config.server.debug);

        let files = config.static_files.unwrap();
        assert_eq!(files.prefix, "/static");
        assert_eq!(files.root, "./public");
    }

    #[test]
    fn test_validation_errors() {
        let bad = [
            "[server]\nlisten = \"nowhere\"",
            "[server]\nmax_body_size = \"lots\"",
            "[server]\nworkers = \"0\"",
            "[static_files]\nprefix = \"assets\"\nroot = \"./public\"",
            "[static_files]\nroot = \"\"",
        ];
        for toml in bad {
            assert!(
                matches!(Config::from_str(toml), Err(ConfigError::ValidationError(_))),
                "accepted {:?}",
                toml
            );
        }
        assert!(matches!(
            Config::from_str("[server"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512"), Some(512));
        assert_eq!(parse_size("2k"), Some(2048));
        assert_eq!(parse_size("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("M"), None);
    }

    #[test]
    fn test_worker_threads() {
        let mut config = Config::default();
        config.server.workers = "4".to_string();
        assert_eq!(config.worker_threads(), 4);

        config.server.workers = "auto".to_string();
        assert!(config.worker_threads() > 0);
    }
}
