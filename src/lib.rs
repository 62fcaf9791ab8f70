//! xtwitter-plugin - X/Twitter posting for conversational agents
//!
//! This crate provides a plugin that lets a hosting agent draft and publish
//! short X/Twitter posts by delegating the work to a remote tool server.
//! It exposes three tools to the agent (`create_post`, `publish_post`,
//! `get_last_draft`) and enforces a draft → confirm → publish workflow: the
//! latest draft is cached in memory, and nothing is ever published without
//! an explicit confirmation flag on that specific call.
//!
//! The tool server is reached over a stdio subprocess or a TCP stream
//! (newline-delimited JSON-RPC). In direct mode the plugin formats posts
//! locally and simulates publishing, without any server at all.

pub mod backend;
pub mod client;
pub mod config;
pub mod draft;
pub mod error;
pub mod plugin;
pub mod protocol;

mod template;
mod transport;

pub use backend::{LocalTemplateBackend, PostBackend, RemoteToolBackend};
pub use client::ToolServerClient;
pub use config::{PluginMode, TransportKind, XTwitterConfig};
pub use error::{ClientError, ConfigError, PluginError, Result, XTwitterError};
pub use plugin::{AgentContext, AgentPlugin, CreatePostRequest, XTwitterPlugin, PLUGIN_NAME};
pub use protocol::{ParameterDef, PostStyle, ToolDescriptor, ToolParams};
