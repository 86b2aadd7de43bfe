//! Configuration for the intercom exporter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::mapping::is_valid_metric_prefix;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Metric naming settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Basic auth gating every route.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Device probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host or address to bind (default: "localhost").
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (default: 9100).
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` as handed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Metric naming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Prefix for the status and uptime gauges (default: "sys_intercom").
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Value of the `app` label attached to every registry.
    #[serde(default)]
    pub app_name: Option<String>,
}

fn default_prefix() -> String {
    "sys_intercom".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            app_name: None,
        }
    }
}

/// HTTP basic auth configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Require credentials on every route.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl AuthConfig {
    /// Credentials to enforce, if auth is enabled and complete.
    pub fn credentials(&self) -> Option<(String, String)> {
        if !self.enabled {
            return None;
        }
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

/// Device probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-request device timeout in milliseconds (default: 1000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    u64::try_from(intercom_devices::DEFAULT_TIMEOUT.as_millis()).unwrap_or(1000)
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be > 0".to_string()));
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation("host must not be empty".to_string()));
        }

        if !is_valid_metric_prefix(&self.metrics.prefix) {
            return Err(ConfigError::Validation(format!(
                "Invalid metric prefix: {}",
                self.metrics.prefix
            )));
        }

        if self.auth.enabled && self.auth.credentials().is_none() {
            return Err(ConfigError::Validation(
                "auth is enabled but username or password is missing".to_string(),
            ));
        }

        if self.probe.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.metrics.prefix, "sys_intercom");
        assert_eq!(config.metrics.app_name, None);
        assert!(!config.auth.enabled);
        assert_eq!(config.probe.timeout(), Duration::from_secs(1));
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            server: { host: "0.0.0.0", port: 9116 },
            metrics: { prefix: "intercom", app_name: "intercom-exporter" },
            auth: { enabled: true, username: "prom", password: "scrape" },
            probe: { timeout_ms: 2500 },
            logging: { level: "debug", format: "json" }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.server.listen_addr(), "0.0.0.0:9116");
        assert_eq!(config.metrics.prefix, "intercom");
        assert_eq!(
            config.metrics.app_name.as_deref(),
            Some("intercom-exporter")
        );
        assert_eq!(
            config.auth.credentials(),
            Some(("prom".to_string(), "scrape".to_string()))
        );
        assert_eq!(config.probe.timeout_ms, 2500);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_auth_disabled_has_no_credentials() {
        let auth = AuthConfig {
            enabled: false,
            username: Some("prom".to_string()),
            password: Some("scrape".to_string()),
        };
        assert_eq!(auth.credentials(), None);
    }

    #[test]
    fn test_validate_auth_without_password() {
        let json = r#"{ auth: { enabled: true, username: "prom" } }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("password"));
    }

    #[test]
    fn test_validate_invalid_prefix() {
        let json = r#"{ metrics: { prefix: "9-lives" } }"#;

        let result = ExporterConfig::parse(json);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid metric prefix")
        );
    }

    #[test]
    fn test_validate_empty_prefix_allowed() {
        let config = ExporterConfig::parse(r#"{ metrics: { prefix: "" } }"#).unwrap();
        assert_eq!(config.metrics.prefix, "");
    }

    #[test]
    fn test_validate_zero_port() {
        assert!(ExporterConfig::parse(r#"{ server: { port: 0 } }"#).is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        assert!(ExporterConfig::parse(r#"{ probe: { timeout_ms: 0 } }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ server: {{ port: 9200 }}, metrics: {{ prefix: \"door\" }} }}").unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9200);
        assert_eq!(config.metrics.prefix, "door");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/intercom.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
