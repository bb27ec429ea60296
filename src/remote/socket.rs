//! Realtime channel to the content service.
//!
//! One background task owns the connection: it sends a `ping` on every
//! heartbeat, fans inbound messages out to subscribers and reconnects after
//! unexpected drops, up to the configured attempt limit. Messages sent while
//! disconnected wait in the outbound queue for the next session, and a
//! message whose send fails is retried first when the next session opens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::SocketConfig;
use crate::content::Id;

#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Invalid socket URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid socket config: {0}")]
    InvalidConfig(String),
    #[error("Socket is closed")]
    Closed,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Messages exchanged over the socket, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SocketMessage {
    #[serde(rename_all = "camelCase")]
    Autosave {
        work_id: Id,
        chapter_id: Id,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    AutosaveAck {
        #[serde(default)]
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chapter_id: Option<Id>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        saved_at: Option<DateTime<Utc>>,
        #[serde(default)]
        words: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    AiProgress {
        task_id: Id,
        #[serde(default)]
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Ping,
    Pong,
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Connecting,
    Connected,
    /// Waiting to retry; `attempt` counts consecutive failures
    Reconnecting { attempt: u32 },
    /// Closed on request
    Closed,
    /// Reconnect attempts exhausted
    GaveUp,
}

#[derive(Debug, Clone)]
struct SessionSettings {
    heartbeat_interval: Duration,
    reconnect_interval: Duration,
    max_reconnect_attempts: u32,
}

enum SessionEnd {
    /// Closed by us; never reconnect
    Closed,
    /// Dropped by the server or the network
    Dropped,
}

/// Handle to the background connection task
pub struct SocketClient {
    outbound: mpsc::Sender<SocketMessage>,
    inbound: broadcast::Sender<SocketMessage>,
    state: watch::Receiver<SocketState>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

const OUTBOUND_QUEUE: usize = 64;
const INBOUND_BUFFER: usize = 256;

/// Append the auth token as a query parameter
fn socket_url(base: &str, token: Option<&str>) -> Result<String, SocketError> {
    let mut url = reqwest::Url::parse(base).map_err(|e| SocketError::InvalidUrl(e.to_string()))?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(SocketError::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())));
    }
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url.to_string())
}

impl SocketClient {
    /// Start the connection task. Returns immediately; watch
    /// [`SocketClient::state`] to see when the socket is up.
    pub fn connect(config: &SocketConfig, token: Option<&str>) -> Result<Self, SocketError> {
        let url = socket_url(&config.url, token)?;
        if config.heartbeat_interval_ms == 0 {
            return Err(SocketError::InvalidConfig(
                "heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }
        let settings = SessionSettings {
            heartbeat_interval: config.heartbeat_interval(),
            reconnect_interval: config.reconnect_interval(),
            max_reconnect_attempts: config.max_reconnect_attempts,
        };

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (inbound_tx, _) = broadcast::channel(INBOUND_BUFFER);
        let (state_tx, state_rx) = watch::channel(SocketState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(connection_loop(
            url,
            settings,
            outbound_rx,
            inbound_tx.clone(),
            state_tx,
            shutdown_rx,
        ));

        Ok(Self {
            outbound: outbound_tx,
            inbound: inbound_tx,
            state: state_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        })
    }

    /// Queue a message for sending
    pub async fn send(&self, message: SocketMessage) -> Result<(), SocketError> {
        self.outbound.send(message).await.map_err(|_| SocketError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SocketMessage> {
        self.inbound.subscribe()
    }

    pub fn state(&self) -> SocketState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SocketState> {
        self.state.clone()
    }

    /// Close the connection and wait for the task to finish
    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn connection_loop(
    url: String,
    settings: SessionSettings,
    mut outbound_rx: mpsc::Receiver<SocketMessage>,
    inbound_tx: broadcast::Sender<SocketMessage>,
    state_tx: watch::Sender<SocketState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut failures: u32 = 0;
    // Taken off the queue but not yet sent
    let mut pending: Option<SocketMessage> = None;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let connected = tokio::select! {
            result = connect_async(url.as_str()) => Some(result),
            _ = shutdown_rx.changed() => None,
        };

        let end = match connected {
            None => SessionEnd::Closed,
            Some(Ok((stream, _))) => {
                failures = 0;
                state_tx.send_replace(SocketState::Connected);
                log::info!("Socket: connected");
                run_session(
                    stream,
                    &settings,
                    &mut outbound_rx,
                    &mut pending,
                    &inbound_tx,
                    &mut shutdown_rx,
                )
                .await
            }
            Some(Err(e)) => {
                log::warn!("Socket: connect failed: {}", e);
                SessionEnd::Dropped
            }
        };

        if let SessionEnd::Closed = end {
            break;
        }

        failures += 1;
        if failures > settings.max_reconnect_attempts {
            log::error!(
                "Socket: giving up after {} reconnect attempts",
                settings.max_reconnect_attempts
            );
            state_tx.send_replace(SocketState::GaveUp);
            return;
        }

        state_tx.send_replace(SocketState::Reconnecting { attempt: failures });
        log::info!(
            "Socket: reconnecting ({}/{})",
            failures,
            settings.max_reconnect_attempts
        );

        tokio::select! {
            _ = tokio::time::sleep(settings.reconnect_interval) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    state_tx.send_replace(SocketState::Closed);
    log::info!("Socket: closed");
}

async fn run_session(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    settings: &SessionSettings,
    outbound_rx: &mut mpsc::Receiver<SocketMessage>,
    pending: &mut Option<SocketMessage>,
    inbound_tx: &broadcast::Sender<SocketMessage>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut sink, mut source) = stream.split();
    if let Some(message) = pending.take() {
        log::info!("Socket: resending message from the previous session");
        if !deliver(&mut sink, message, pending).await {
            return SessionEnd::Dropped;
        }
    }
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + settings.heartbeat_interval,
        settings.heartbeat_interval,
    );

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if let Err(e) = send_message(&mut sink, &SocketMessage::Ping).await {
                    log::warn!("Socket: heartbeat failed: {}", e);
                    return SessionEnd::Dropped;
                }
            }
            outgoing = outbound_rx.recv() => match outgoing {
                Some(message) => {
                    if !deliver(&mut sink, message, pending).await {
                        return SessionEnd::Dropped;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Closed;
                }
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<SocketMessage>(&text) {
                    Ok(message) => {
                        // No subscribers is fine
                        let _ = inbound_tx.send(message);
                    }
                    Err(e) => log::warn!("Socket: ignoring unparseable message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    log::info!("Socket: server closed the connection");
                    return SessionEnd::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::warn!("Socket: read failed: {}", e);
                    return SessionEnd::Dropped;
                }
            },
            _ = shutdown_rx.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return SessionEnd::Closed;
            }
        }
    }
}

async fn send_message<S>(sink: &mut S, message: &SocketMessage) -> Result<(), SocketError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(message)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

/// Send `message`, parking it in `pending` when the connection fails.
/// Returns false when the session should end.
async fn deliver<S>(sink: &mut S, message: SocketMessage, pending: &mut Option<SocketMessage>) -> bool
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match send_message(sink, &message).await {
        Ok(()) => true,
        Err(SocketError::Json(e)) => {
            log::warn!("Socket: dropping unencodable message: {}", e);
            true
        }
        Err(e) => {
            log::warn!("Socket: send failed, keeping message for the next session: {}", e);
            *pending = Some(message);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_failed_send_keeps_message() {
        let broken = futures_util::sink::unfold((), |(), _: Message| async {
            Err::<(), _>(tungstenite::Error::ConnectionClosed)
        });
        let mut broken = pin!(broken);
        let mut pending = None;
        assert!(!deliver(&mut broken, SocketMessage::Ping, &mut pending).await);
        assert_eq!(pending, Some(SocketMessage::Ping));

        let sent = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&sent);
        let working = futures_util::sink::unfold((), move |(), _: Message| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, tungstenite::Error>(())
            }
        });
        let mut working = pin!(working);
        let message = pending.take().unwrap();
        assert!(deliver(&mut working, message, &mut pending).await);
        assert!(pending.is_none());
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_heartbeat_is_rejected() {
        let config = SocketConfig {
            url: "ws://localhost:8080/ws".to_string(),
            heartbeat_interval_ms: 0,
            reconnect_interval_ms: 20,
            max_reconnect_attempts: 1,
        };
        let err = SocketClient::connect(&config, None).err().unwrap();
        assert!(matches!(err, SocketError::InvalidConfig(_)), "got {:?}", err);
    }

    #[test]
    fn test_socket_url_appends_token() {
        let url = socket_url("ws://localhost:8080/ws", Some("a b")).unwrap();
        assert_eq!(url, "ws://localhost:8080/ws?token=a+b");
        assert_eq!(socket_url("ws://localhost:8080/ws", None).unwrap(), "ws://localhost:8080/ws");
        assert!(socket_url("http://localhost:8080/ws", None).is_err());
    }

    #[test]
    fn test_message_wire_format() {
        let ping = serde_json::to_value(SocketMessage::Ping).unwrap();
        assert_eq!(ping, serde_json::json!({ "type": "ping" }));

        let save = SocketMessage::Autosave {
            work_id: Id::from(1),
            chapter_id: Id::from(2),
            content: "<p>hi</p>".to_string(),
            timestamp: None,
        };
        assert_eq!(
            serde_json::to_value(&save).unwrap(),
            serde_json::json!({ "type": "autosave", "workId": 1, "chapterId": 2, "content": "<p>hi</p>" })
        );

        let ack: SocketMessage = serde_json::from_str(
            r#"{"type":"autosave_ack","success":true,"savedAt":"2026-01-01T00:00:00Z","words":2}"#,
        )
        .unwrap();
        match ack {
            SocketMessage::AutosaveAck { success, words, saved_at, .. } => {
                assert!(success);
                assert_eq!(words, 2);
                assert!(saved_at.is_some());
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let err: SocketMessage = serde_json::from_str(r#"{"type":"error","error":"denied"}"#).unwrap();
        assert_eq!(
            err,
            SocketMessage::Error { message: None, error: Some("denied".to_string()) }
        );
    }
}
