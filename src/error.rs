//! Error types for the xtwitter plugin

use thiserror::Error;

/// Main error type for the plugin crate
#[derive(Error, Debug)]
pub enum XTwitterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool client error: {0}")]
    Client(#[from] ClientError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),

    #[error("Unknown plugin mode: {0}")]
    UnknownMode(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Tool server client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("stdio transport requires a non-empty server command")]
    MissingCommand,

    #[error("Invalid server command: {0}")]
    InvalidCommand(String),

    #[error("Tool '{tool}' timed out after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("Transport failure: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Malformed response from tool server: {0}")]
    Protocol(String),
}

/// Plugin-level errors
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Tool client not initialized; call on_agent_start first")]
    NotInitialized,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Result type alias using XTwitterError
pub type Result<T> = std::result::Result<T, XTwitterError>;
