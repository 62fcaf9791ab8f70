//! Wire protocol and tool descriptor definitions
//!
//! The tool server speaks newline-delimited JSON-RPC 2.0: an `initialize`
//! handshake followed by `tools/call` requests. This module also defines the
//! function-calling descriptors the plugin hands to LLM integrations and the
//! keyword-style parameter map used for name-based dispatch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// JSON-RPC protocol version sent on every frame
pub const JSONRPC_VERSION: &str = "2.0";

/// Version of the tool protocol negotiated during the handshake
pub const PROTOCOL_VERSION: &str = "1.0";

/// Handshake method name
pub const METHOD_INITIALIZE: &str = "initialize";

/// Tool invocation method name
pub const METHOD_CALL_TOOL: &str = "tools/call";

/// Writing style for a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStyle {
    #[default]
    Professional,
    Casual,
    Witty,
    Inspirational,
}

impl PostStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStyle::Professional => "professional",
            PostStyle::Casual => "casual",
            PostStyle::Witty => "witty",
            PostStyle::Inspirational => "inspirational",
        }
    }

    /// All accepted style names, in descriptor order
    pub fn variants() -> &'static [&'static str] {
        &["professional", "casual", "witty", "inspirational"]
    }
}

impl FromStr for PostStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(PostStyle::Professional),
            "casual" => Ok(PostStyle::Casual),
            "witty" => Ok(PostStyle::Witty),
            "inspirational" => Ok(PostStyle::Inspirational),
            other => Err(format!("unknown style: {}", other)),
        }
    }
}

/// Request sent to the tool server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    /// Request ID for correlation
    pub id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Request {
    /// Create a new request with a fresh correlation ID
    pub fn new(method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            method: method.to_string(),
            params,
        }
    }

    /// Build the handshake request
    pub fn initialize() -> Self {
        Self::new(
            METHOD_INITIALIZE,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "clientInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    /// Build a tool invocation request
    pub fn call_tool(name: &str, arguments: HashMap<String, serde_json::Value>) -> Self {
        Self::new(
            METHOD_CALL_TOOL,
            serde_json::json!({
                "name": name,
                "arguments": arguments,
            }),
        )
    }
}

/// Response from the tool server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub jsonrpc: String,
    /// Request ID this responds to
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Create a success response
    pub fn success(id: &str, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.to_string(),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: &str, code: i64, message: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.to_string(),
            }),
        }
    }
}

/// Error object carried in a failed response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Result payload of a `tools/call` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentFragment>,
}

impl CallToolResult {
    /// Concatenate all textual fragments, newline-separated.
    ///
    /// Returns an empty string when the response carried no text.
    pub fn joined_text(&self) -> String {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|fragment| fragment.text.as_deref())
            .collect();
        parts.join("\n")
    }
}

/// One content fragment of a tool response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFragment {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentFragment {
    /// Create a text fragment
    pub fn text(text: &str) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.to_string()),
        }
    }
}

/// Tool definition for LLM function-calling interfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (e.g., "create_post")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter definitions
    pub parameters: Vec<ParameterDef>,
    /// Names of required parameters; always empty here, every parameter
    /// carries a default
    #[serde(default)]
    pub required: Vec<String>,
}

/// Parameter definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name
    pub name: String,
    /// Parameter type (string, boolean, integer)
    #[serde(rename = "type")]
    pub param_type: String,
    /// Description
    pub description: String,
    /// Allowed values for enumerated string parameters
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// Keyword-style arguments passed to a dispatched tool
#[derive(Debug, Clone, Default)]
pub struct ToolParams(HashMap<String, serde_json::Value>);

impl ToolParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, builder-style
    pub fn with(mut self, name: &str, value: serde_json::Value) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn insert(&mut self, name: &str, value: serde_json::Value) {
        self.0.insert(name.to_string(), value);
    }

    /// Get a string parameter
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_str())
    }

    /// Get a boolean parameter with default
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.0
            .get(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Get an integer parameter
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.0.get(name).and_then(|v| v.as_u64())
    }
}

impl From<HashMap<String, serde_json::Value>> for ToolParams {
    fn from(params: HashMap<String, serde_json::Value>) -> Self {
        Self(params)
    }
}
