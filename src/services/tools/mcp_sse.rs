//! Server-Push Transport
//!
//! Inbound envelopes arrive as `data:` payloads on a long-lived event
//! stream; each outbound envelope is its own HTTP POST. Providers may
//! announce the POST target with an `endpoint` event, and may require a
//! session token negotiated before the stream is opened.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use tokio::task::JoinHandle;

use agent_runtime_core::{CoreError, CoreResult};

use super::mcp_correlation::PendingRequests;
use super::mcp_transport::ConnectionStatus;

/// Header carrying the negotiated session token
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// One dispatched server-push event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field; `None` means the default "message"
    pub event: Option<String>,
    /// `data:` lines joined with '\n'
    pub data: String,
}

#[derive(Default)]
struct EventBuilder {
    event: Option<String>,
    data: Vec<String>,
}

impl EventBuilder {
    /// Apply one line; returns a finished event on a blank line.
    fn feed(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return self.take();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn take(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

struct SseParserState<E> {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    buffer: Vec<u8>,
    builder: EventBuilder,
    pending_events: VecDeque<SseEvent>,
    finished: bool,
}

/// Turn a byte stream into server-push events.
///
/// A stream error ends the event stream after being logged.
pub fn parse_sse_events<S, E>(byte_stream: S) -> impl Stream<Item = SseEvent> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseParserState {
        inner: Box::pin(byte_stream),
        buffer: Vec::new(),
        builder: EventBuilder::default(),
        pending_events: VecDeque::new(),
        finished: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        if let Some(event) = state.pending_events.pop_front() {
            return Some((event, state));
        }
        if state.finished {
            return None;
        }

        loop {
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    while let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                        let raw: Vec<u8> = state.buffer.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).to_string();
                        if let Some(event) = state.builder.feed(&line) {
                            state.pending_events.push_back(event);
                        }
                    }
                    if let Some(event) = state.pending_events.pop_front() {
                        return Some((event, state));
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Event stream read failed");
                    return None;
                }
                None => {
                    state.finished = true;
                    if !state.buffer.is_empty() {
                        let rest = std::mem::take(&mut state.buffer);
                        let line = String::from_utf8_lossy(&rest).to_string();
                        if let Some(event) = state.builder.feed(&line) {
                            state.pending_events.push_back(event);
                        }
                    }
                    if let Some(event) = state.builder.take() {
                        state.pending_events.push_back(event);
                    }
                    return state.pending_events.pop_front().map(|event| (event, state));
                }
            }
        }
    })
}

/// Resolve the target announced by an `endpoint` event against the stream URL.
pub fn resolve_endpoint(stream_url: &str, announced: &str) -> Option<String> {
    let announced = announced.trim();
    if announced.is_empty() {
        return None;
    }
    let base = url::Url::parse(stream_url).ok()?;
    base.join(announced).ok().map(|u| u.to_string())
}

/// Pull a session token out of a negotiation response body.
pub fn extract_session_token(body: &Value) -> Option<String> {
    ["sessionId", "session_id", "token"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

/// Event-stream transport
pub struct SseTransport {
    name: String,
    http: reqwest::Client,
    post_url: Arc<RwLock<String>>,
    headers: HashMap<String, String>,
    session_token: Option<String>,
    pending: Arc<PendingRequests>,
    reader: JoinHandle<()>,
}

impl SseTransport {
    pub async fn connect(
        name: &str,
        url: &str,
        session_url: Option<&str>,
        headers: &HashMap<String, String>,
        pending: Arc<PendingRequests>,
        status: Arc<ConnectionStatus>,
    ) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CoreError::connection(format!("Failed to create HTTP client: {}", e)))?;

        let session_token = match session_url {
            Some(session_url) => negotiate_session(&http, name, session_url, headers).await,
            None => None,
        };

        let mut request = http.get(url).header("Accept", "text/event-stream");
        for (key, value) in headers {
            request = request.header(key, value);
        }
        if let Some(token) = &session_token {
            request = request.header(SESSION_HEADER, token);
        }

        let response = request.send().await.map_err(|e| {
            CoreError::connection(format!("Failed to open event stream for '{}': {}", name, e))
        })?;
        if !response.status().is_success() {
            return Err(CoreError::connection(format!(
                "Provider '{}' event stream returned HTTP {}",
                name,
                response.status()
            )));
        }

        let post_url = Arc::new(RwLock::new(url.to_string()));
        let reader = {
            let name = name.to_string();
            let stream_url = url.to_string();
            let post_url = Arc::clone(&post_url);
            let pending = Arc::clone(&pending);
            let events = parse_sse_events(response.bytes_stream());
            tokio::spawn(async move {
                futures_util::pin_mut!(events);
                while let Some(event) = events.next().await {
                    if event.event.as_deref() == Some("endpoint") {
                        match resolve_endpoint(&stream_url, &event.data) {
                            Some(target) => {
                                tracing::debug!(provider = %name, endpoint = %target, "Provider announced endpoint");
                                *post_url.write().unwrap_or_else(|e| e.into_inner()) = target;
                            }
                            None => {
                                tracing::warn!(provider = %name, "Ignoring unusable endpoint: {}", event.data);
                            }
                        }
                        continue;
                    }
                    pending.dispatch_text(&event.data);
                }
                if status.get() != crate::models::mcp::ConnectionState::Disconnected {
                    tracing::warn!(provider = %name, "Provider event stream ended");
                }
                status.mark_lost();
                pending.close_all();
            })
        };

        tracing::info!(provider = %name, url = %url, "Opened provider event stream");

        Ok(Self {
            name: name.to_string(),
            http,
            post_url,
            headers: headers.clone(),
            session_token,
            pending,
            reader,
        })
    }

    /// POST one envelope. Providers that answer inline get their body
    /// dispatched like a pushed event.
    pub async fn send(&self, message: &Value) -> CoreResult<()> {
        let target = self
            .post_url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut request = self.http.post(&target).json(message);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(token) = &self.session_token {
            request = request.header(SESSION_HEADER, token);
        }

        let response = request.send().await.map_err(|e| {
            CoreError::connection(format!("Request to provider '{}' failed: {}", self.name, e))
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::connection(format!(
                "Provider '{}' returned HTTP {}",
                self.name, status
            )));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(provider = %self.name, error = %e, "Failed to read POST body");
                String::new()
            }
        };
        if !body.trim().is_empty() {
            match serde_json::from_str::<Value>(&body) {
                Ok(value) => self.pending.dispatch(value),
                Err(_) => tracing::debug!(provider = %self.name, "Ignoring non-JSON POST body"),
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.reader.abort();
    }
}

/// Obtain a session token. Failure is logged and the connection proceeds
/// without one.
async fn negotiate_session(
    http: &reqwest::Client,
    name: &str,
    session_url: &str,
    headers: &HashMap<String, String>,
) -> Option<String> {
    let mut request = http.post(session_url);
    for (key, value) in headers {
        request = request.header(key, value);
    }

    let response = match request.send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            tracing::warn!(provider = %name, status = %r.status(), "Session negotiation rejected");
            return None;
        }
        Err(e) => {
            tracing::warn!(provider = %name, error = %e, "Session negotiation failed");
            return None;
        }
    };

    if let Some(token) = response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(token.to_string());
    }

    match response.json::<Value>().await {
        Ok(body) => {
            let token = extract_session_token(&body);
            if token.is_none() {
                tracing::warn!(provider = %name, "Session response carried no token");
            }
            token
        }
        Err(e) => {
            tracing::warn!(provider = %name, error = %e, "Session response was not JSON");
            None
        }
    }
}
