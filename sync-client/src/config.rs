//! Configuration for the sync client.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [server]
//! host = "192.168.1.20"
//! port = 4200
//! use_tls = false
//!
//! [timing]
//! heartbeat_ms = 30000
//! refresh_ms = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest periodic interval the timers will run with.
pub const MIN_INTERVAL_MS: u64 = 1;

/// Root configuration for the sync client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Controller address.
    pub server: ServerConfig,
    /// Timer intervals.
    #[serde(default)]
    pub timing: Timing,
}

/// Controller address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or IP address.
    pub host: String,
    /// HTTP and websocket port (default: 4200).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use `https`/`wss` instead of `http`/`ws` (default: false).
    #[serde(default)]
    pub use_tls: bool,
}

/// Timer intervals, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Liveness probe interval on an open stream (default: 30s).
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
    /// Delay after `connect()` before the polling fallback starts (default: 2s).
    #[serde(default = "default_polling_start_ms")]
    pub polling_start_ms: u64,
    /// Polling fallback interval (default: 5s).
    #[serde(default = "default_polling_ms")]
    pub polling_ms: u64,
    /// Periodic consistency refresh interval (default: 5s).
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    /// Reconnect delay after a stale-socket close (default: 1s).
    #[serde(default = "default_stale_reconnect_ms")]
    pub stale_reconnect_ms: u64,
    /// Reconnect delay after any other unexpected close (default: 5s).
    #[serde(default = "default_reconnect_ms")]
    pub reconnect_ms: u64,
}

/// A file holding only timer overrides; any other table is ignored.
#[derive(Debug, Default, Deserialize)]
struct TimingFile {
    #[serde(default)]
    timing: Timing,
}

// Default value functions
fn default_port() -> u16 {
    4200
}

fn default_heartbeat_ms() -> u64 {
    30_000
}

fn default_polling_start_ms() -> u64 {
    2_000
}

fn default_polling_ms() -> u64 {
    5_000
}

fn default_refresh_ms() -> u64 {
    5_000
}

fn default_stale_reconnect_ms() -> u64 {
    1_000
}

fn default_reconnect_ms() -> u64 {
    5_000
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            heartbeat_ms: default_heartbeat_ms(),
            polling_start_ms: default_polling_start_ms(),
            polling_ms: default_polling_ms(),
            refresh_ms: default_refresh_ms(),
            stale_reconnect_ms: default_stale_reconnect_ms(),
            reconnect_ms: default_reconnect_ms(),
        }
    }
}

impl Timing {
    /// Load just the `[timing]` table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// periodic interval is zero.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        let file: TimingFile = parse(path, &content)?;
        file.timing.validate()?;
        Ok(file.timing)
    }

    /// Check that every periodic interval is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroInterval`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periodic = [
            ("heartbeat_ms", self.heartbeat_ms),
            ("polling_ms", self.polling_ms),
            ("refresh_ms", self.refresh_ms),
        ];
        match periodic.into_iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::ZeroInterval { field }),
            None => Ok(()),
        }
    }

    /// Liveness probe interval.
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms.max(MIN_INTERVAL_MS))
    }

    /// Delay before the polling fallback starts.
    pub fn polling_start(&self) -> Duration {
        Duration::from_millis(self.polling_start_ms)
    }

    /// Polling fallback interval.
    pub fn polling(&self) -> Duration {
        Duration::from_millis(self.polling_ms.max(MIN_INTERVAL_MS))
    }

    /// Consistency refresh interval.
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(MIN_INTERVAL_MS))
    }

    /// Reconnect delay after a stale-socket close.
    pub fn stale_reconnect(&self) -> Duration {
        Duration::from_millis(self.stale_reconnect_ms)
    }

    /// Reconnect delay after any other unexpected close.
    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }
}

impl ClientConfig {
    /// Create a configuration with default timing.
    pub fn new(host: &str, port: u16, use_tls: bool) -> Self {
        Self {
            server: ServerConfig {
                host: host.to_string(),
                port,
                use_tls,
            },
            timing: Timing::default(),
        }
    }

    /// Replace the timing block.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Base URL for HTTP requests, e.g. `http://host:4200`.
    pub fn base_url(&self) -> String {
        let scheme = if self.server.use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.server.host, self.server.port)
    }

    /// Websocket URL for the streaming transport.
    pub fn socket_url(&self) -> String {
        let scheme = if self.server.use_tls { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}/socket.io/?EIO=4&transport=websocket",
            self.server.host, self.server.port
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// periodic interval is zero.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        let config: Self = parse(path, &content)?;
        config.timing.validate()?;
        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A periodic interval was set to zero.
    #[error("{field} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending setting.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing_matches_controller_cadence() {
        let timing = Timing::default();
        assert_eq!(timing.heartbeat(), Duration::from_secs(30));
        assert_eq!(timing.polling(), Duration::from_secs(5));
        assert_eq!(timing.refresh(), Duration::from_secs(5));
        assert_eq!(timing.stale_reconnect(), Duration::from_secs(1));
        assert_eq!(timing.reconnect(), Duration::from_secs(5));
    }

    #[test]
    fn urls_without_tls() {
        let config = ClientConfig::new("192.168.1.20", 4200, false);
        assert_eq!(config.base_url(), "http://192.168.1.20:4200");
        assert_eq!(
            config.socket_url(),
            "ws://192.168.1.20:4200/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn urls_with_tls() {
        let config = ClientConfig::new("pool.example.com", 443, true);
        assert_eq!(config.base_url(), "https://pool.example.com:443");
        assert!(config.socket_url().starts_with("wss://pool.example.com:443/"));
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
host = "10.0.0.5"
port = 8080
use_tls = true

[timing]
heartbeat_ms = 10000
refresh_ms = 2500
"#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "10.0.0.5");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.use_tls);
        assert_eq!(config.timing.heartbeat(), Duration::from_secs(10));
        assert_eq!(config.timing.refresh(), Duration::from_millis(2500));
        assert_eq!(config.timing.polling(), Duration::from_secs(5));
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let toml = r#"
[server]
host = "poolcontroller.local"
"#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 4200);
        assert!(!config.server.use_tls);
        assert_eq!(config.timing, Timing::default());
    }

    #[test]
    fn config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolsync.toml");
        std::fs::write(&path, "[server]\nhost = \"pool\"\nport = 4201\n").unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.base_url(), "http://pool:4201");
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = ClientConfig::from_file(Path::new("/nonexistent/poolsync.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nhost=").unwrap();

        let result = ClientConfig::from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    // ===========================================
    // Interval validation
    // ===========================================

    #[test]
    fn zero_interval_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolsync.toml");
        std::fs::write(&path, "[server]\nhost = \"pool\"\n\n[timing]\nrefresh_ms = 0\n").unwrap();

        let result = ClientConfig::from_file(&path);
        assert!(matches!(
            result,
            Err(ConfigError::ZeroInterval {
                field: "refresh_ms"
            })
        ));
    }

    #[test]
    fn validate_names_each_periodic_field() {
        let mut timing = Timing {
            heartbeat_ms: 0,
            ..Timing::default()
        };
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::ZeroInterval {
                field: "heartbeat_ms"
            })
        ));

        timing.heartbeat_ms = 30_000;
        timing.polling_ms = 0;
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::ZeroInterval {
                field: "polling_ms"
            })
        ));

        assert!(Timing::default().validate().is_ok());
    }

    #[test]
    fn zero_intervals_built_in_code_are_clamped() {
        let timing = Timing {
            heartbeat_ms: 0,
            polling_ms: 0,
            refresh_ms: 0,
            ..Timing::default()
        };
        assert_eq!(timing.heartbeat(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(timing.polling(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(timing.refresh(), Duration::from_millis(MIN_INTERVAL_MS));
    }

    #[test]
    fn timing_file_needs_no_server_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timing.toml");
        std::fs::write(&path, "[timing]\nrefresh_ms = 1000\n").unwrap();

        let timing = Timing::from_file(&path).unwrap();
        assert_eq!(timing.refresh(), Duration::from_millis(1000));
        assert_eq!(timing.heartbeat(), Duration::from_secs(30));
    }

    #[test]
    fn timing_file_ignores_server_table_and_rejects_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timing.toml");
        std::fs::write(&path, "[server]\nhost = \"pool\"\n").unwrap();
        assert_eq!(Timing::from_file(&path).unwrap(), Timing::default());

        std::fs::write(&path, "[timing]\npolling_ms = 0\n").unwrap();
        assert!(matches!(
            Timing::from_file(&path),
            Err(ConfigError::ZeroInterval {
                field: "polling_ms"
            })
        ));
    }
}
