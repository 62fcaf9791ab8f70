//! Transport layer for the tool server connection
//!
//! A [`Connection`] owns one stream to the server: either the stdio pipes of
//! a spawned subprocess or a TCP stream. Frames are newline-delimited JSON;
//! non-protocol output lines from the server are skipped.

use crate::error::ClientError;
use crate::protocol::{Request, Response};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// One live connection to the tool server
pub(crate) struct Connection {
    reader: BufReader<Box<dyn AsyncRead + Send + Sync + Unpin>>,
    writer: Box<dyn AsyncWrite + Send + Sync + Unpin>,
    child: Option<Child>,
}

impl Connection {
    /// Spawn the server as a subprocess and connect to its stdio pipes.
    ///
    /// The child is killed when the connection is dropped, so a failed
    /// handshake cannot leak the process.
    pub(crate) async fn spawn(argv: &[String]) -> Result<Self, ClientError> {
        let (program, args) = argv
            .split_first()
            .ok_or(ClientError::MissingCommand)?;

        debug!("Spawning tool server: {} {:?}", program, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ClientError::Transport(std::io::Error::new(
                std::io::ErrorKind::Other,
                "failed to capture server stdin",
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ClientError::Transport(std::io::Error::new(
                std::io::ErrorKind::Other,
                "failed to capture server stdout",
            ))
        })?;

        Ok(Self {
            reader: BufReader::new(Box::new(stdout)),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }

    /// Open a TCP stream to an already-running server
    pub(crate) async fn dial(host: &str, port: u16) -> Result<Self, ClientError> {
        debug!("Connecting to tool server at {}:{}", host, port);

        let stream = TcpStream::connect((host, port)).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(Box::new(read_half)),
            writer: Box::new(write_half),
            child: None,
        })
    }

    /// Build a connection from arbitrary stream halves
    pub(crate) fn from_parts(
        reader: impl AsyncRead + Send + Sync + Unpin + 'static,
        writer: impl AsyncWrite + Send + Sync + Unpin + 'static,
    ) -> Self {
        Self {
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
            child: None,
        }
    }

    /// Write one request frame
    pub(crate) async fn send(&mut self, request: &Request) -> Result<(), ClientError> {
        let frame = serde_json::to_string(request)
            .map_err(|e| ClientError::Protocol(format!("failed to encode request: {}", e)))?;

        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Read the next response frame, skipping non-protocol lines
    pub(crate) async fn recv(&mut self) -> Result<Response, ClientError> {
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(ClientError::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "tool server closed the connection",
                )));
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Response>(line) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!("Skipping non-protocol line from server: {}", e);
                }
            }
        }
    }

    /// Release the connection and any owned subprocess
    pub(crate) async fn shutdown(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            debug!("Error shutting down writer: {}", e);
        }
        drop(self.writer);

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill tool server process: {}", e);
            }
            let _ = child.wait().await;
        }
    }
}

/// Split a shell-style command line into program and arguments.
///
/// Supports single quotes, double quotes and backslash escapes; a command
/// that splits to nothing is reported as missing.
pub(crate) fn split_command(input: &str) -> Result<Vec<String>, ClientError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            Some(_) => {
                // Inside double quotes
                if c == '"' {
                    quote = None;
                } else if c == '\\' {
                    match chars.next() {
                        Some(escaped) => current.push(escaped),
                        None => {
                            return Err(ClientError::InvalidCommand(
                                "trailing backslash".to_string(),
                            ))
                        }
                    }
                } else {
                    current.push(c);
                }
            }
            None => {
                if c.is_whitespace() {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                } else if c == '\'' || c == '"' {
                    quote = Some(c);
                    in_word = true;
                } else if c == '\\' {
                    match chars.next() {
                        Some(escaped) => {
                            current.push(escaped);
                            in_word = true;
                        }
                        None => {
                            return Err(ClientError::InvalidCommand(
                                "trailing backslash".to_string(),
                            ))
                        }
                    }
                } else {
                    current.push(c);
                    in_word = true;
                }
            }
        }
    }

    if quote.is_some() {
        return Err(ClientError::InvalidCommand("unterminated quote".to_string()));
    }
    if in_word {
        words.push(current);
    }
    if words.is_empty() {
        return Err(ClientError::MissingCommand);
    }

    Ok(words)
}
