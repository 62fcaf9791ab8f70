//! The xtwitter posting plugin
//!
//! Agent-facing façade over the posting backends. Enforces the
//! draft → confirm → publish workflow: drafts are cached from create-post
//! output, publishing without text falls back to the cached draft, and
//! nothing reaches the remote side unless the caller sets the confirm flag
//! on that specific call.

use crate::backend::{LocalTemplateBackend, PostBackend, RemoteToolBackend};
use crate::client::ToolServerClient;
use crate::config::{PluginMode, XTwitterConfig};
use crate::draft::extract_post_text;
use crate::error::{PluginError, Result};
use crate::protocol::{ParameterDef, PostStyle, ToolDescriptor, ToolParams};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Plugin name the host registers under
pub const PLUGIN_NAME: &str = "xtwitter";

const PLUGIN_DESCRIPTION: &str = "Creates engaging X/Twitter posts and can publish them via a \
     remote tool server. Always preview posts before publishing and require explicit confirmation.";

const CREATE_GUIDANCE: &str =
    "No text provided. Pass either 'text' or 'post_text' with the content to draft.";

const PUBLISH_GUIDANCE: &str = "No post_text provided and no cached draft found. Please pass the \
     exact post text to publish (e.g., the latest draft you just created). The tool server is \
     stateless, so include the full post_text in this call.";

/// Opaque reference to the hosting agent, recorded at startup
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub agent_name: String,
    pub session_id: String,
}

impl AgentContext {
    pub fn new(agent_name: &str) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Arguments for a create-post call; every field has a default
#[derive(Debug, Clone)]
pub struct CreatePostRequest {
    /// Input text to transform into a post
    pub text: String,
    /// Alias for `text`, used by callers that only know the publish vocabulary
    pub post_text: String,
    pub style: PostStyle,
    pub include_hashtags: bool,
    pub max_length: usize,
}

impl Default for CreatePostRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            post_text: String::new(),
            style: PostStyle::default(),
            include_hashtags: true,
            max_length: 280,
        }
    }
}

impl CreatePostRequest {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// Contract between the hosting agent and a plugin
#[async_trait]
pub trait AgentPlugin: Send + Sync {
    /// Unique plugin name
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Semantic version
    fn version(&self) -> &str;

    /// Called once when the hosting agent starts
    async fn on_agent_start(&self, agent: AgentContext) -> Result<()>;

    /// Called at agent shutdown; must be idempotent
    async fn cleanup(&self);

    /// Tool descriptors for LLM function-calling integrations
    fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// Invoke a tool by name with keyword-style arguments
    async fn dispatch_tool(&self, tool: &str, params: ToolParams) -> Result<String>;
}

/// Lifecycle of the posting backend
enum BackendSlot {
    /// No backend yet; the first create call may initialize one lazily
    Idle,
    Ready(Arc<dyn PostBackend>),
    /// Cleaned up; remote operations fail until the start hook runs again
    Closed,
}

/// Plugin that creates and publishes X/Twitter posts
pub struct XTwitterPlugin {
    config: XTwitterConfig,
    backend: Mutex<BackendSlot>,
    agent: Mutex<Option<AgentContext>>,
    last_draft: Mutex<Option<String>>,
}

impl XTwitterPlugin {
    /// Create a plugin from configuration.
    ///
    /// Direct mode is usable immediately; remote mode connects in
    /// `on_agent_start` or lazily on the first create call.
    pub fn new(config: XTwitterConfig) -> Self {
        let slot = match config.mode {
            PluginMode::Direct => BackendSlot::Ready(Arc::new(LocalTemplateBackend)),
            PluginMode::Remote => BackendSlot::Idle,
        };

        Self {
            config,
            backend: Mutex::new(slot),
            agent: Mutex::new(None),
            last_draft: Mutex::new(None),
        }
    }

    /// Record the agent context and connect the tool client in remote mode
    pub async fn on_agent_start(&self, agent: AgentContext) -> Result<()> {
        debug!("Plugin starting for agent '{}'", agent.agent_name);
        *self.agent.lock().await = Some(agent);

        if self.config.mode == PluginMode::Remote {
            let mut slot = self.backend.lock().await;
            if !matches!(&*slot, BackendSlot::Ready(_)) {
                *slot = BackendSlot::Ready(self.connect_remote().await?);
            }
        }

        Ok(())
    }

    /// Close the tool client if one exists; safe to call repeatedly
    pub async fn cleanup(&self) {
        let mut slot = self.backend.lock().await;
        if let BackendSlot::Ready(backend) = &*slot {
            backend.close().await;
            if self.config.mode == PluginMode::Remote {
                *slot = BackendSlot::Closed;
                info!("Plugin cleaned up; tool client closed");
            }
        }
    }

    /// Draft a post and cache its extracted text for later publishing.
    ///
    /// Returns a guidance string when no input text was supplied.
    pub async fn create_post(&self, request: CreatePostRequest) -> Result<String> {
        let effective_text = if !request.text.is_empty() {
            request.text.clone()
        } else {
            request.post_text.clone()
        };
        if effective_text.is_empty() {
            return Ok(CREATE_GUIDANCE.to_string());
        }

        let backend = self.ensure_backend().await?;
        let result = backend
            .create(
                &effective_text,
                request.style,
                request.include_hashtags,
                request.max_length,
            )
            .await?;

        if let Some(draft) = extract_post_text(&result) {
            debug!("Cached draft ({} chars)", draft.chars().count());
            *self.last_draft.lock().await = Some(draft);
        }

        Ok(result)
    }

    /// Publish a post, falling back to the cached draft when no text is given.
    ///
    /// Without `confirm` this returns a dry-run preview and transmits
    /// nothing; confirmation applies to this call only.
    pub async fn publish_post(&self, post_text: &str, confirm: bool) -> Result<String> {
        info!(
            "publish_post called (text length: {}, confirm: {})",
            post_text.chars().count(),
            confirm
        );

        let effective_text = if !post_text.is_empty() {
            post_text.to_string()
        } else {
            self.last_draft.lock().await.clone().unwrap_or_default()
        };
        if effective_text.is_empty() {
            return Ok(PUBLISH_GUIDANCE.to_string());
        }

        let backend = self.current_backend().await?;

        if !confirm {
            debug!("No confirmation given; returning dry-run preview");
            return Ok(dry_run_preview(&effective_text));
        }

        let result = backend.publish(&effective_text).await?;
        Ok(result)
    }

    /// The most recent cached draft, or an empty string
    pub async fn get_last_draft(&self) -> String {
        self.last_draft.lock().await.clone().unwrap_or_default()
    }

    /// Describe the three tools for LLM function-calling interfaces
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor {
                name: "create_post".to_string(),
                description: "Create an attractive X/Twitter post from input text.".to_string(),
                parameters: vec![
                    ParameterDef {
                        name: "text".to_string(),
                        param_type: "string".to_string(),
                        description: "Input text to transform into a post".to_string(),
                        allowed: None,
                        default: Some(serde_json::json!("")),
                    },
                    ParameterDef {
                        name: "post_text".to_string(),
                        param_type: "string".to_string(),
                        description: "Alias for text; the content to transform into a post"
                            .to_string(),
                        allowed: None,
                        default: Some(serde_json::json!("")),
                    },
                    ParameterDef {
                        name: "style".to_string(),
                        param_type: "string".to_string(),
                        description: "Writing style".to_string(),
                        allowed: Some(
                            PostStyle::variants()
                                .iter()
                                .map(|s| s.to_string())
                                .collect(),
                        ),
                        default: Some(serde_json::json!("professional")),
                    },
                    ParameterDef {
                        name: "include_hashtags".to_string(),
                        param_type: "boolean".to_string(),
                        description: "Include relevant hashtags".to_string(),
                        allowed: None,
                        default: Some(serde_json::json!(true)),
                    },
                    ParameterDef {
                        name: "max_length".to_string(),
                        param_type: "integer".to_string(),
                        description: "Max characters (default 280)".to_string(),
                        allowed: None,
                        default: Some(serde_json::json!(280)),
                    },
                ],
                required: vec![],
            },
            ToolDescriptor {
                name: "publish_post".to_string(),
                description: "Publish a post to X/Twitter. Defaults to the latest cached draft \
                     if post_text is omitted. Always set confirm=true to actually publish."
                    .to_string(),
                parameters: vec![
                    ParameterDef {
                        name: "post_text".to_string(),
                        param_type: "string".to_string(),
                        description:
                            "The full post text to publish (optional if a draft was just created)"
                                .to_string(),
                        allowed: None,
                        default: Some(serde_json::json!("")),
                    },
                    ParameterDef {
                        name: "confirm".to_string(),
                        param_type: "boolean".to_string(),
                        description: "Must be true to publish (safety)".to_string(),
                        allowed: None,
                        default: Some(serde_json::json!(false)),
                    },
                ],
                required: vec![],
            },
            ToolDescriptor {
                name: "get_last_draft".to_string(),
                description: "Return the most recent created draft text (empty string if none)."
                    .to_string(),
                parameters: vec![],
                required: vec![],
            },
        ]
    }

    /// Route a tool invocation by name
    pub async fn dispatch_tool(&self, tool: &str, params: ToolParams) -> Result<String> {
        match tool {
            "create_post" => {
                let style = match params.get_str("style") {
                    Some(s) => s.parse().unwrap_or_else(|e| {
                        warn!("{}; falling back to the default style", e);
                        PostStyle::default()
                    }),
                    None => PostStyle::default(),
                };
                let request = CreatePostRequest {
                    text: params.get_str("text").unwrap_or_default().to_string(),
                    post_text: params.get_str("post_text").unwrap_or_default().to_string(),
                    style,
                    include_hashtags: params.get_bool("include_hashtags", true),
                    max_length: params.get_u64("max_length").unwrap_or(280) as usize,
                };
                self.create_post(request).await
            }
            "publish_post" => {
                self.publish_post(
                    params.get_str("post_text").unwrap_or_default(),
                    params.get_bool("confirm", false),
                )
                .await
            }
            "get_last_draft" => Ok(self.get_last_draft().await),
            other => Err(PluginError::UnknownTool(other.to_string()).into()),
        }
    }

    /// Backend for create calls: lazily initialized in remote mode when the
    /// start hook never ran, but never re-created after cleanup
    async fn ensure_backend(&self) -> std::result::Result<Arc<dyn PostBackend>, PluginError> {
        let mut slot = self.backend.lock().await;
        match &*slot {
            BackendSlot::Ready(backend) => Ok(backend.clone()),
            BackendSlot::Closed => Err(PluginError::NotInitialized),
            BackendSlot::Idle => {
                info!("No tool client yet; initializing lazily");
                let backend = self.connect_remote().await?;
                *slot = BackendSlot::Ready(backend.clone());
                Ok(backend)
            }
        }
    }

    /// Backend for publish calls: must already be established
    async fn current_backend(&self) -> std::result::Result<Arc<dyn PostBackend>, PluginError> {
        match &*self.backend.lock().await {
            BackendSlot::Ready(backend) => Ok(backend.clone()),
            _ => Err(PluginError::NotInitialized),
        }
    }

    async fn connect_remote(&self) -> std::result::Result<Arc<dyn PostBackend>, PluginError> {
        let mut client = ToolServerClient::new(&self.config);
        client.connect().await?;
        Ok(Arc::new(RemoteToolBackend::new(client)))
    }

    #[cfg(test)]
    pub(crate) async fn install_backend(&self, backend: Arc<dyn PostBackend>) {
        *self.backend.lock().await = BackendSlot::Ready(backend);
    }
}

#[async_trait]
impl AgentPlugin for XTwitterPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn description(&self) -> &str {
        PLUGIN_DESCRIPTION
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn on_agent_start(&self, agent: AgentContext) -> Result<()> {
        XTwitterPlugin::on_agent_start(self, agent).await
    }

    async fn cleanup(&self) {
        XTwitterPlugin::cleanup(self).await
    }

    fn list_tools(&self) -> Vec<ToolDescriptor> {
        XTwitterPlugin::list_tools(self)
    }

    async fn dispatch_tool(&self, tool: &str, params: ToolParams) -> Result<String> {
        XTwitterPlugin::dispatch_tool(self, tool, params).await
    }
}

/// Preview returned when publish is called without confirmation
fn dry_run_preview(post_text: &str) -> String {
    format!(
        "⚠️ Dry run - the post was NOT published.\n\n{}\n\nTo publish it, call publish_post again with confirm=true.",
        post_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XTwitterError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Test double that records publishes and serves a fixed create result
    struct CapturingBackend {
        create_result: String,
        published: StdMutex<Vec<String>>,
        closed: AtomicUsize,
    }

    impl CapturingBackend {
        fn new(create_result: &str) -> Arc<Self> {
            Arc::new(Self {
                create_result: create_result.to_string(),
                published: StdMutex::new(Vec::new()),
                closed: AtomicUsize::new(0),
            })
        }

        fn published(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PostBackend for CapturingBackend {
        async fn create(
            &self,
            _text: &str,
            _style: PostStyle,
            _include_hashtags: bool,
            _max_length: usize,
        ) -> std::result::Result<String, PluginError> {
            Ok(self.create_result.clone())
        }

        async fn publish(&self, post_text: &str) -> std::result::Result<String, PluginError> {
            self.published.lock().unwrap().push(post_text.to_string());
            Ok(format!("published: {}", post_text))
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn remote_plugin() -> XTwitterPlugin {
        XTwitterPlugin::new(XTwitterConfig::default())
    }

    fn direct_plugin() -> XTwitterPlugin {
        XTwitterPlugin::new(XTwitterConfig {
            mode: PluginMode::Direct,
            ..Default::default()
        })
    }

    fn draft_block(post: &str) -> String {
        format!("Draft ready\n\nPOST TEXT:\n{0}\n{1}\n{0}\n\nLength: 1", "-".repeat(40), post)
    }

    #[test]
    fn test_plugin_identity() {
        let plugin = remote_plugin();
        assert_eq!(AgentPlugin::name(&plugin), "xtwitter");
        assert_eq!(AgentPlugin::version(&plugin), env!("CARGO_PKG_VERSION"));
        assert!(AgentPlugin::description(&plugin).contains("explicit confirmation"));
    }

    #[tokio::test]
    async fn test_create_post_without_text_returns_guidance() {
        let plugin = remote_plugin();
        let result = plugin
            .create_post(CreatePostRequest::default())
            .await
            .unwrap();
        assert!(result.contains("No text provided"));

        // The guidance path must not have initialized anything.
        let err = plugin.publish_post("x", true).await.unwrap_err();
        assert!(matches!(
            err,
            XTwitterError::Plugin(PluginError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_create_post_accepts_post_text_alias() {
        let backend = CapturingBackend::new("plain response, no block");
        let plugin = remote_plugin();
        plugin.install_backend(backend).await;

        let request = CreatePostRequest {
            post_text: "aliased content".to_string(),
            ..Default::default()
        };
        let result = plugin.create_post(request).await.unwrap();
        assert_eq!(result, "plain response, no block");
        // No POST TEXT block in the response, so nothing was cached.
        assert_eq!(plugin.get_last_draft().await, "");
    }

    #[tokio::test]
    async fn test_direct_mode_create_and_cache() {
        let plugin = direct_plugin();
        let result = plugin
            .create_post(CreatePostRequest::with_text("Shipping the Launch today"))
            .await
            .unwrap();

        assert!(result.contains("POST TEXT:"));

        let draft = plugin.get_last_draft().await;
        assert_eq!(draft.as_str(), extract_post_text(&result).unwrap());
        assert!(draft.contains("Shipping the Launch today"));
    }

    #[tokio::test]
    async fn test_publish_without_text_or_cache_returns_guidance() {
        let backend = CapturingBackend::new("unused");
        let plugin = remote_plugin();
        plugin.install_backend(backend.clone()).await;

        let result = plugin.publish_post("", true).await.unwrap();
        assert!(result.contains("No post_text provided"));
        assert!(result.contains("cached draft"));
        assert!(backend.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_dry_run_never_transmits() {
        let backend = CapturingBackend::new("unused");
        let plugin = remote_plugin();
        plugin.install_backend(backend.clone()).await;

        let result = plugin.publish_post("my exact words", false).await.unwrap();
        assert!(result.contains("my exact words"));
        assert!(result.contains("confirm=true"));
        assert!(backend.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_before_start_fails() {
        let plugin = remote_plugin();
        let err = plugin.publish_post("text", true).await.unwrap_err();
        assert!(matches!(
            err,
            XTwitterError::Plugin(PluginError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_publish_uses_cached_draft() {
        let backend = CapturingBackend::new(&draft_block("🚀 cached draft #Test"));
        let plugin = remote_plugin();
        plugin.install_backend(backend.clone()).await;

        plugin
            .create_post(CreatePostRequest::with_text("anything"))
            .await
            .unwrap();
        assert_eq!(plugin.get_last_draft().await, "🚀 cached draft #Test");

        // Publishing with no explicit text transmits exactly the cached draft.
        let result = plugin.publish_post("", true).await.unwrap();
        assert_eq!(result, "published: 🚀 cached draft #Test");
        assert_eq!(backend.published(), vec!["🚀 cached draft #Test"]);

        // Identical to passing the draft explicitly.
        plugin
            .publish_post("🚀 cached draft #Test", true)
            .await
            .unwrap();
        let published = backend.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0], published[1]);
    }

    #[tokio::test]
    async fn test_explicit_text_overrides_cache() {
        let backend = CapturingBackend::new(&draft_block("cached one"));
        let plugin = remote_plugin();
        plugin.install_backend(backend.clone()).await;

        plugin
            .create_post(CreatePostRequest::with_text("anything"))
            .await
            .unwrap();
        plugin.publish_post("explicit override", true).await.unwrap();
        assert_eq!(backend.published(), vec!["explicit override"]);
    }

    #[tokio::test]
    async fn test_confirmation_is_not_sticky() {
        let backend = CapturingBackend::new("unused");
        let plugin = remote_plugin();
        plugin.install_backend(backend.clone()).await;

        plugin.publish_post("first", true).await.unwrap();
        let preview = plugin.publish_post("second", false).await.unwrap();

        assert!(preview.contains("second"));
        assert_eq!(backend.published(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_new_draft_overwrites_cache() {
        let plugin = direct_plugin();
        plugin
            .create_post(CreatePostRequest::with_text("first post"))
            .await
            .unwrap();
        let first = plugin.get_last_draft().await;

        plugin
            .create_post(CreatePostRequest::with_text("second post"))
            .await
            .unwrap();
        let second = plugin.get_last_draft().await;

        assert_ne!(first, second);
        assert!(second.contains("second post"));
    }

    #[tokio::test]
    async fn test_cleanup_closes_remote_backend_once() {
        let backend = CapturingBackend::new("unused");
        let plugin = remote_plugin();
        plugin.install_backend(backend.clone()).await;

        plugin.cleanup().await;
        plugin.cleanup().await;
        assert_eq!(backend.closed.load(Ordering::SeqCst), 1);

        // Remote operations fail after cleanup instead of reconnecting.
        let err = plugin
            .create_post(CreatePostRequest::with_text("late"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            XTwitterError::Plugin(PluginError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_direct_mode_survives_cleanup() {
        let plugin = direct_plugin();
        plugin.cleanup().await;

        let result = plugin
            .create_post(CreatePostRequest::with_text("still works"))
            .await
            .unwrap();
        assert!(result.contains("POST TEXT:"));
    }

    #[tokio::test]
    async fn test_on_agent_start_records_context_in_direct_mode() {
        let plugin = direct_plugin();
        plugin
            .on_agent_start(AgentContext::new("social-manager"))
            .await
            .unwrap();

        let agent = plugin.agent.lock().await;
        assert_eq!(agent.as_ref().unwrap().agent_name, "social-manager");
    }

    #[test]
    fn test_list_tools() {
        let plugin = remote_plugin();
        let tools = plugin.list_tools();

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["create_post", "publish_post", "get_last_draft"]);

        let create = &tools[0];
        assert!(create.required.is_empty());
        let style = create
            .parameters
            .iter()
            .find(|p| p.name == "style")
            .unwrap();
        assert_eq!(style.allowed.as_ref().unwrap().len(), 4);
        assert_eq!(style.default, Some(serde_json::json!("professional")));

        let publish = &tools[1];
        let confirm = publish
            .parameters
            .iter()
            .find(|p| p.name == "confirm")
            .unwrap();
        assert_eq!(confirm.default, Some(serde_json::json!(false)));
    }

    #[tokio::test]
    async fn test_dispatch_create_and_get_last_draft() {
        let plugin = direct_plugin();
        let params = ToolParams::new()
            .with("text", serde_json::json!("Dispatch Driven posting"))
            .with("style", serde_json::json!("witty"));

        let result = plugin.dispatch_tool("create_post", params).await.unwrap();
        assert!(result.contains("😄 Dispatch Driven posting"));

        let draft = plugin
            .dispatch_tool("get_last_draft", ToolParams::new())
            .await
            .unwrap();
        assert!(draft.contains("Dispatch Driven posting"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_style_falls_back() {
        let plugin = direct_plugin();
        let params = ToolParams::new()
            .with("text", serde_json::json!("hello"))
            .with("style", serde_json::json!("sarcastic"));

        let result = plugin.dispatch_tool("create_post", params).await.unwrap();
        assert!(result.contains("📢 hello"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let plugin = direct_plugin();
        let err = plugin
            .dispatch_tool("delete_account", ToolParams::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            XTwitterError::Plugin(PluginError::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_publish_dry_run() {
        let plugin = direct_plugin();
        let params = ToolParams::new().with("post_text", serde_json::json!("via dispatch"));

        let result = plugin.dispatch_tool("publish_post", params).await.unwrap();
        assert!(result.contains("via dispatch"));
        assert!(result.contains("NOT published"));
    }
}
