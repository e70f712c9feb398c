//! Configuration loading for camera-relay.
//!
//! Configuration is loaded from an optional TOML file. Every field has a
//! default, so an empty file (or no file) yields a working relay. The `PORT`
//! environment variable overrides `server.port`.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the listening port.
pub const PORT_ENV: &str = "PORT";

/// Root configuration for camera-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// WebSocket session configuration.
    #[serde(default)]
    pub websocket: WebSocketConfig,
    /// Rate limiting configuration.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Cleanup task configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0).
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port for HTTP and WebSocket traffic (default: 8080).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path of the WebSocket endpoint (default: /camera-relay).
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

/// WebSocket session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Maximum inbound message (and frame) size in bytes (default: 1MB).
    /// Larger messages terminate the connection.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Interval between server pings in seconds (default: 15).
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// Connections silent for this long are reaped (default: 30).
    /// Pongs count as traffic.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Outbound frames queued per session before sends are refused (default: 64).
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum WebSocket upgrades per IP address per minute (default: 30).
    #[serde(default = "default_connections_per_ip")]
    pub connections_per_ip: u32,
    /// Maximum inbound frames per session per minute (default: 600).
    #[serde(default = "default_messages_per_minute")]
    pub messages_per_minute: u32,
    /// Maximum inbound frames per second across all sessions (default: 1000).
    #[serde(default = "default_global_requests_per_second")]
    pub global_requests_per_second: u32,
    /// Maximum simultaneously open WebSocket connections (default: 10000).
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
}

/// Cleanup task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Cleanup interval in seconds (default: 300).
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// Enable cleanup task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    "/camera-relay".to_string()
}

fn default_max_message_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_ping_interval() -> u64 {
    15
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_mailbox_capacity() -> usize {
    64
}

fn default_connections_per_ip() -> u32 {
    30
}

fn default_messages_per_minute() -> u32 {
    600
}

fn default_global_requests_per_second() -> u32 {
    1000
}

fn default_max_concurrent_sessions() -> usize {
    10_000
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_cleanup_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            ping_interval_secs: default_ping_interval(),
            idle_timeout_secs: default_idle_timeout(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            connections_per_ip: default_connections_per_ip(),
            messages_per_minute: default_messages_per_minute(),
            global_requests_per_second: default_global_requests_per_second(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            enabled: default_cleanup_enabled(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from `path` if given (defaults otherwise), apply the `PORT`
    /// environment override and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_port_override(std::env::var(PORT_ENV).ok().as_deref());
        config.validate()?;
        Ok(config)
    }

    /// Apply a `PORT` value. Unparseable values are ignored.
    pub fn with_port_override(mut self, port: Option<&str>) -> Self {
        if let Some(raw) = port {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(
                    "Ignoring invalid {}={:?}, keeping port {}",
                    PORT_ENV,
                    raw,
                    self.server.port
                ),
            }
        }
        self
    }

    /// Check values that would otherwise panic or misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("limits.connections_per_ip", self.limits.connections_per_ip as u64),
            ("limits.messages_per_minute", self.limits.messages_per_minute as u64),
            (
                "limits.global_requests_per_second",
                self.limits.global_requests_per_second as u64,
            ),
            ("websocket.ping_interval_secs", self.websocket.ping_interval_secs),
            ("websocket.idle_timeout_secs", self.websocket.idle_timeout_secs),
            ("websocket.mailbox_capacity", self.websocket.mailbox_capacity as u64),
            ("websocket.max_message_size", self.websocket.max_message_size as u64),
            ("cleanup.interval_secs", self.cleanup.interval_secs),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid {
                field,
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.websocket.ping_interval_secs >= self.websocket.idle_timeout_secs {
            return Err(ConfigError::Invalid {
                field: "websocket.ping_interval_secs",
                reason: format!(
                    "{}s must be below websocket.idle_timeout_secs ({}s)",
                    self.websocket.ping_interval_secs, self.websocket.idle_timeout_secs
                ),
            });
        }
        if !self.server.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "server.ws_path",
                reason: format!("{:?} must start with '/'", self.server.ws_path),
            });
        }
        Ok(())
    }

    /// Socket address to listen on.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            field: "server.host",
            reason: format!("{addr:?} is not a socket address"),
        })
    }
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
    /// A value is out of range.
    #[error("invalid config value {field}: {reason}")]
    Invalid {
        /// Dotted name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.ws_path, "/camera-relay");
        assert_eq!(config.websocket.max_message_size, 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[websocket]
ping_interval_secs = 5
idle_timeout_secs = 12

[limits]
connections_per_ip = 5

[cleanup]
interval_secs = 60
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.websocket.ping_interval_secs, 5);
        assert_eq!(config.websocket.idle_timeout_secs, 12);
        assert_eq!(config.limits.connections_per_ip, 5);
        assert_eq!(config.cleanup.interval_secs, 60);
        assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[server]\nport = 1234\n").unwrap();
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.websocket.mailbox_capacity, 64);
        assert_eq!(config.limits.max_concurrent_sessions, 10_000);
        assert!(config.cleanup.enabled);
    }

    #[test]
    fn port_override_applies_when_valid() {
        let config = Config::default().with_port_override(Some("3000"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn port_override_ignores_garbage() {
        let config = Config::default().with_port_override(Some("eighty"));
        assert_eq!(config.server.port, 8080);
        let config = Config::default().with_port_override(None);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut config = Config::default();
        config.limits.messages_per_minute = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("limits.messages_per_minute"));
    }

    #[test]
    fn ws_path_must_be_absolute() {
        let mut config = Config::default();
        config.server.ws_path = "camera-relay".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn ping_interval_must_be_below_idle_timeout() {
        let mut config = Config::default();
        config.websocket.ping_interval_secs = 30;
        config.websocket.idle_timeout_secs = 30;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "websocket.ping_interval_secs",
                ..
            })
        ));

        config.websocket.ping_interval_secs = 29;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[websocket]\nmax_message_size = 2048").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.websocket.max_message_size, 2048);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
