//! Posting backends
//!
//! The plugin selects one backend at construction: remote (delegate to the
//! tool server) or local (format posts in-process and simulate publishing).

use crate::client::ToolServerClient;
use crate::error::PluginError;
use crate::protocol::PostStyle;
use crate::template;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Strategy interface for drafting and publishing posts
#[async_trait]
pub trait PostBackend: Send + Sync {
    /// Draft a post from input text
    async fn create(
        &self,
        text: &str,
        style: PostStyle,
        include_hashtags: bool,
        max_length: usize,
    ) -> Result<String, PluginError>;

    /// Publish the given post text
    async fn publish(&self, post_text: &str) -> Result<String, PluginError>;

    /// Release held resources
    async fn close(&self) {}
}

/// Backend that delegates both operations to the remote tool server
pub struct RemoteToolBackend {
    client: Mutex<ToolServerClient>,
}

impl RemoteToolBackend {
    pub fn new(client: ToolServerClient) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }
}

#[async_trait]
impl PostBackend for RemoteToolBackend {
    async fn create(
        &self,
        text: &str,
        style: PostStyle,
        include_hashtags: bool,
        max_length: usize,
    ) -> Result<String, PluginError> {
        let mut client = self.client.lock().await;
        let result = client
            .create_post(text, style, include_hashtags, max_length)
            .await?;
        Ok(result)
    }

    async fn publish(&self, post_text: &str) -> Result<String, PluginError> {
        // The plugin has already enforced the confirmation gate.
        let mut client = self.client.lock().await;
        let result = client.publish_post(post_text, true).await?;
        Ok(result)
    }

    async fn close(&self) {
        self.client.lock().await.close().await;
    }
}

/// Backend that formats posts locally, without any remote call
pub struct LocalTemplateBackend;

#[async_trait]
impl PostBackend for LocalTemplateBackend {
    async fn create(
        &self,
        text: &str,
        style: PostStyle,
        include_hashtags: bool,
        max_length: usize,
    ) -> Result<String, PluginError> {
        Ok(template::render_draft(text, style, include_hashtags, max_length))
    }

    async fn publish(&self, post_text: &str) -> Result<String, PluginError> {
        Ok(template::render_publish(post_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_backend_create() {
        let backend = LocalTemplateBackend;
        let result = backend
            .create("Shipping the Update", PostStyle::Professional, true, 280)
            .await
            .unwrap();

        assert!(result.contains("POST TEXT:"));
        assert!(result.contains("📢 Shipping the Update"));
    }

    #[tokio::test]
    async fn test_local_backend_publish() {
        let backend = LocalTemplateBackend;
        let result = backend.publish("ready to go").await.unwrap();

        assert!(result.contains("simulated"));
        assert!(result.contains("ready to go"));
    }
}
