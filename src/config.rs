//! Configuration for the xtwitter plugin
//!
//! The plugin takes one explicit configuration struct at construction.
//! Values are resolved from three sources, later ones winning:
//! 1. Compiled defaults
//! 2. User config file (~/.xtwitter/config.toml, or an explicit path)
//! 3. Environment variables (XTWITTER_*)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// How the client reaches the tool server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Spawn the server as a subprocess and talk over its stdio pipes
    Stdio,
    /// Connect to an already-running server over TCP
    #[default]
    Tcp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Tcp => "tcp",
        }
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "tcp" => Ok(TransportKind::Tcp),
            other => Err(ConfigError::UnsupportedTransport(other.to_string())),
        }
    }
}

/// Whether posts go through the tool server or the local formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PluginMode {
    /// Delegate create/publish to the remote tool server
    #[default]
    Remote,
    /// Format posts locally and simulate publishing; no server involved
    Direct,
}

impl FromStr for PluginMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(PluginMode::Remote),
            "direct" => Ok(PluginMode::Direct),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XTwitterConfig {
    /// Posting mode: remote (tool server) or direct (local formatting)
    pub mode: PluginMode,
    /// Transport used to reach the tool server
    pub transport: TransportKind,
    /// Tool server host (tcp transport)
    pub host: String,
    /// Tool server port (tcp transport)
    pub port: u16,
    /// Shell-style command line that launches the server (stdio transport)
    pub command: Option<String>,
    /// Overall per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for XTwitterConfig {
    fn default() -> Self {
        Self {
            mode: PluginMode::default(),
            transport: TransportKind::default(),
            host: "localhost".to_string(),
            port: 8002,
            command: None,
            timeout_secs: 30,
        }
    }
}

impl XTwitterConfig {
    /// Load configuration from the default location plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = XTwitterConfig::default();

        if let Some(path) = path {
            debug!("Loading config from {:?}", path);
            config = Self::from_file(path)?;
        } else if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".xtwitter/config.toml");
            if user_config.exists() {
                debug!("Loading user config from {:?}", user_config);
                config = Self::from_file(&user_config)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Apply XTWITTER_* environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(mode) = std::env::var("XTWITTER_MODE") {
            self.mode = mode.parse()?;
        }
        if let Ok(transport) = std::env::var("XTWITTER_TRANSPORT") {
            self.transport = transport.parse()?;
        }
        if let Ok(host) = std::env::var("XTWITTER_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("XTWITTER_PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("XTWITTER_PORT: {}", port)))?;
        }
        if let Ok(command) = std::env::var("XTWITTER_COMMAND") {
            self.command = Some(command);
        }
        if let Ok(timeout) = std::env::var("XTWITTER_TIMEOUT") {
            self.timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("XTWITTER_TIMEOUT: {}", timeout)))?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.mode == PluginMode::Remote {
            match self.transport {
                TransportKind::Stdio => {
                    let missing = self
                        .command
                        .as_deref()
                        .map(|c| c.trim().is_empty())
                        .unwrap_or(true);
                    if missing {
                        return Err(ConfigError::MissingField("command".to_string()));
                    }
                }
                TransportKind::Tcp => {
                    if self.host.is_empty() {
                        return Err(ConfigError::MissingField("host".to_string()));
                    }
                    if self.port == 0 {
                        return Err(ConfigError::Invalid(
                            "port must be non-zero for tcp transport".to_string(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = XTwitterConfig::default();
        assert_eq!(config.mode, PluginMode::Remote);
        assert_eq!(config.transport, TransportKind::Tcp);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8002);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.command.is_none());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(XTwitterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
            mode = "direct"
            transport = "stdio"
            command = "x-post-server --stdio"
            timeout_secs = 5
        "#;

        let config: XTwitterConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mode, PluginMode::Direct);
        assert_eq!(config.transport, TransportKind::Stdio);
        assert_eq!(config.command.as_deref(), Some("x-post-server --stdio"));
        assert_eq!(config.timeout_secs, 5);
        // Unspecified fields keep their defaults
        assert_eq!(config.port, 8002);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"tools.internal\"\nport = 9100").unwrap();

        let config = XTwitterConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "tools.internal");
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_load_missing_file() {
        let result = XTwitterConfig::from_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("stdio".parse::<TransportKind>().unwrap(), TransportKind::Stdio);
        assert_eq!("TCP".parse::<TransportKind>().unwrap(), TransportKind::Tcp);

        let err = "sse".parse::<TransportKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedTransport(ref t) if t == "sse"));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("remote".parse::<PluginMode>().unwrap(), PluginMode::Remote);
        assert_eq!("Direct".parse::<PluginMode>().unwrap(), PluginMode::Direct);
        assert!("hybrid".parse::<PluginMode>().is_err());
    }

    #[test]
    fn test_stdio_requires_command() {
        let mut config = XTwitterConfig {
            transport: TransportKind::Stdio,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField(ref f)) if f == "command"
        ));

        config.command = Some("   ".to_string());
        assert!(config.validate().is_err());

        config.command = Some("x-post-server --stdio".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tcp_requires_endpoint() {
        let config = XTwitterConfig {
            port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_direct_mode_skips_server_checks() {
        // Direct mode never dials out, so server fields are not required.
        let config = XTwitterConfig {
            mode: PluginMode::Direct,
            transport: TransportKind::Stdio,
            command: None,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = XTwitterConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_duration() {
        let config = XTwitterConfig {
            timeout_secs: 12,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(12));
    }
}
