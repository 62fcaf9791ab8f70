//! Client for the remote tool server
//!
//! Owns at most one connection (stdio subprocess or TCP) and provides the
//! generic timeout-bounded `call_tool` primitive plus typed wrappers for the
//! two posting tools. Connecting performs the `initialize` handshake before
//! the connection handle is stored.

use crate::config::{TransportKind, XTwitterConfig};
use crate::error::ClientError;
use crate::protocol::{CallToolResult, PostStyle, Request};
use crate::transport::{split_command, Connection};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Client for invoking tools on the remote server
pub struct ToolServerClient {
    transport: TransportKind,
    host: String,
    port: u16,
    command: Option<String>,
    call_timeout: Duration,
    connection: Option<Connection>,
}

impl ToolServerClient {
    /// Create a disconnected client from configuration
    pub fn new(config: &XTwitterConfig) -> Self {
        Self {
            transport: config.transport,
            host: config.host.clone(),
            port: config.port,
            command: config.command.clone(),
            call_timeout: config.timeout(),
            connection: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(connection: Connection, call_timeout: Duration) -> Self {
        Self {
            transport: TransportKind::Tcp,
            host: "localhost".to_string(),
            port: 0,
            command: None,
            call_timeout,
            connection: Some(connection),
        }
    }

    /// Whether a live connection handle is held
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Establish the connection and run the handshake.
    ///
    /// Returns immediately when already connected.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Ok(());
        }

        let mut connection = match self.transport {
            TransportKind::Stdio => {
                let command = self.command.as_deref().unwrap_or("");
                if command.trim().is_empty() {
                    return Err(ClientError::MissingCommand);
                }
                let argv = split_command(command)?;
                Connection::spawn(&argv).await?
            }
            TransportKind::Tcp => Connection::dial(&self.host, self.port).await?,
        };

        // A handshake failure drops the connection here, which also reaps
        // any spawned server process.
        self.handshake(&mut connection).await?;

        info!(
            "Tool server client connected via {}",
            self.transport.as_str()
        );
        self.connection = Some(connection);
        Ok(())
    }

    /// Release the connection; safe to call when not connected
    pub async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.shutdown().await;
            info!("Tool server connection closed");
        }
    }

    /// Invoke a named tool and return its concatenated text output.
    ///
    /// Connects lazily when no connection is held. The wait is bounded by
    /// the configured timeout; a timed-out call abandons the response but
    /// the server may still process the request.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: HashMap<String, serde_json::Value>,
    ) -> Result<String, ClientError> {
        if self.connection.is_none() {
            debug!("No connection, connecting lazily");
            self.connect().await?;
        }
        let call_timeout = self.call_timeout;
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| ClientError::Protocol("connection missing after connect".to_string()))?;

        let request = Request::call_tool(name, arguments);
        debug!("Calling tool '{}'", name);

        let response = match timeout(call_timeout, round_trip(connection, &request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Tool '{}' timed out after {:?}", name, call_timeout);
                return Err(ClientError::Timeout {
                    tool: name.to_string(),
                    timeout_secs: call_timeout.as_secs(),
                });
            }
        };

        if let Some(error) = response.error {
            return Err(ClientError::ToolFailed {
                tool: name.to_string(),
                message: error.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| ClientError::Protocol("response carried no result".to_string()))?;
        let payload: CallToolResult = serde_json::from_value(result)
            .map_err(|e| ClientError::Protocol(format!("invalid tool result: {}", e)))?;

        Ok(payload.joined_text())
    }

    /// Ask the server to draft a post from the given text
    pub async fn create_post(
        &mut self,
        text: &str,
        style: PostStyle,
        include_hashtags: bool,
        max_length: usize,
    ) -> Result<String, ClientError> {
        let mut arguments = HashMap::new();
        arguments.insert("text".to_string(), serde_json::json!(text));
        arguments.insert("style".to_string(), serde_json::json!(style.as_str()));
        arguments.insert(
            "include_hashtags".to_string(),
            serde_json::json!(include_hashtags),
        );
        arguments.insert("max_length".to_string(), serde_json::json!(max_length));

        self.call_tool("create_post", arguments).await
    }

    /// Ask the server to publish a post
    pub async fn publish_post(
        &mut self,
        post_text: &str,
        confirm: bool,
    ) -> Result<String, ClientError> {
        let mut arguments = HashMap::new();
        arguments.insert("post_text".to_string(), serde_json::json!(post_text));
        arguments.insert("confirm".to_string(), serde_json::json!(confirm));

        self.call_tool("publish_post", arguments).await
    }

    /// Run the handshake on a fresh connection
    async fn handshake(&self, connection: &mut Connection) -> Result<(), ClientError> {
        let request = Request::initialize();

        let response = match timeout(self.call_timeout, round_trip(connection, &request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ClientError::Timeout {
                    tool: "initialize".to_string(),
                    timeout_secs: self.call_timeout.as_secs(),
                })
            }
        };

        if let Some(error) = response.error {
            return Err(ClientError::Protocol(format!(
                "initialize rejected: {}",
                error.message
            )));
        }

        debug!("Tool server handshake complete");
        Ok(())
    }
}

/// Send a request and wait for the response with a matching ID
async fn round_trip(
    connection: &mut Connection,
    request: &Request,
) -> Result<crate::protocol::Response, ClientError> {
    connection.send(request).await?;

    loop {
        let response = connection.recv().await?;
        if response.id == request.id {
            return Ok(response);
        }
        debug!("Ignoring response for stale request {}", response.id);
    }
}
