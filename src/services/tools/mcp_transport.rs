//! Provider Transports
//!
//! A transport moves serialized envelopes to a provider and feeds everything
//! it hears back into the shared pending-request table. Two variants exist:
//! a spawned child process speaking newline-delimited JSON on stdio, and a
//! server-push event stream (see `mcp_sse`).

use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use agent_runtime_core::{CoreError, CoreResult};

use super::mcp_correlation::PendingRequests;
use super::mcp_protocol::LineBuffer;
use super::mcp_sse::SseTransport;
use crate::models::mcp::{ConnectionState, McpServerConfig, McpTransportConfig};

/// Connection state shared between a client and its reader task.
#[derive(Debug)]
pub struct ConnectionStatus(AtomicU8);

impl ConnectionStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(Self::encode(state)))
    }

    fn encode(state: ConnectionState) -> u8 {
        match state {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Ready => 2,
            ConnectionState::Failed => 3,
        }
    }

    fn decode(raw: u8) -> ConnectionState {
        match raw {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Ready,
            3 => ConnectionState::Failed,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn get(&self) -> ConnectionState {
        Self::decode(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: ConnectionState) {
        self.0.store(Self::encode(state), Ordering::SeqCst);
    }

    /// Mark the connection failed unless it was deliberately disconnected.
    pub fn mark_lost(&self) {
        let failed = Self::encode(ConnectionState::Failed);
        let _ = self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            if current == Self::encode(ConnectionState::Disconnected) {
                None
            } else {
                Some(failed)
            }
        });
    }
}

/// Active transport connection
pub enum Transport {
    Stdio(StdioTransport),
    Sse(SseTransport),
}

impl Transport {
    /// Open the transport described by `config`.
    pub async fn open(
        config: &McpServerConfig,
        pending: Arc<PendingRequests>,
        status: Arc<ConnectionStatus>,
    ) -> CoreResult<Self> {
        match &config.transport {
            McpTransportConfig::Stdio { command, args, env } => {
                let transport =
                    StdioTransport::spawn(&config.name, command, args, env, pending, status).await?;
                Ok(Self::Stdio(transport))
            }
            McpTransportConfig::Sse {
                url,
                session_url,
                headers,
            } => {
                let transport = SseTransport::connect(
                    &config.name,
                    url,
                    session_url.as_deref(),
                    headers,
                    pending,
                    status,
                )
                .await?;
                Ok(Self::Sse(transport))
            }
        }
    }

    /// Send one envelope.
    pub async fn send(&self, message: &Value) -> CoreResult<()> {
        match self {
            Self::Stdio(t) => t.send(message).await,
            Self::Sse(t) => t.send(message).await,
        }
    }

    /// Tear the connection down.
    pub async fn close(&self) {
        match self {
            Self::Stdio(t) => t.close().await,
            Self::Sse(t) => t.close().await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stdio(_) => "stdio",
            Self::Sse(_) => "sse",
        }
    }
}

/// Child-process transport: one JSON envelope per line on stdin/stdout.
pub struct StdioTransport {
    name: String,
    stdin: Mutex<Option<ChildStdin>>,
    child: Mutex<Option<Child>>,
    tasks: Vec<JoinHandle<()>>,
}

impl StdioTransport {
    pub async fn spawn(
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        pending: Arc<PendingRequests>,
        status: Arc<ConnectionStatus>,
    ) -> CoreResult<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            CoreError::connection(format!(
                "Failed to spawn provider '{}' (command: {}): {}",
                name, command, e
            ))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            CoreError::connection(format!("Failed to capture stdin for provider '{}'", name))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CoreError::connection(format!("Failed to capture stdout for provider '{}'", name))
        })?;
        let stderr = child.stderr.take();

        let mut tasks = Vec::new();

        let reader_name = name.to_string();
        tasks.push(tokio::spawn(async move {
            let mut stdout = stdout;
            let mut lines = LineBuffer::new();
            let mut chunk = vec![0u8; 8192];
            loop {
                match stdout.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        for line in lines.push(&chunk[..n]) {
                            pending.dispatch_text(&line);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(provider = %reader_name, error = %e, "Provider stdout read failed");
                        break;
                    }
                }
            }
            if let Some(rest) = lines.finish() {
                pending.dispatch_text(&rest);
            }
            if status.get() != ConnectionState::Disconnected {
                tracing::warn!(provider = %reader_name, "Provider closed its output stream");
            }
            status.mark_lost();
            pending.close_all();
        }));

        if let Some(stderr) = stderr {
            let stderr_name = name.to_string();
            tasks.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(provider = %stderr_name, "stderr: {}", line);
                }
            }));
        }

        tracing::info!(provider = %name, command = %command, "Spawned provider process");

        Ok(Self {
            name: name.to_string(),
            stdin: Mutex::new(Some(stdin)),
            child: Mutex::new(Some(child)),
            tasks,
        })
    }

    pub async fn send(&self, message: &Value) -> CoreResult<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(CoreError::closed)?;
        stdin.write_all(line.as_bytes()).await.map_err(|e| {
            CoreError::connection(format!("Failed to write to provider '{}': {}", self.name, e))
        })?;
        stdin.flush().await.map_err(|e| {
            CoreError::connection(format!("Failed to flush provider '{}' stdin: {}", self.name, e))
        })?;
        Ok(())
    }

    pub async fn close(&self) {
        // Dropping stdin lets well-behaved providers exit on EOF
        self.stdin.lock().await.take();
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(provider = %self.name, error = %e, "Provider process already exited");
            }
        }
        for task in &self.tasks {
            task.abort();
        }
    }
}
