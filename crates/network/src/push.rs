// crates/network/src/push.rs
//! WebSocket push channel
//!
//! Opens a WebSocket to the server, authenticates with the session token and
//! forwards every decoded [`PushMessage`] into an mpsc channel consumed by the
//! sync session.

use crate::error::{NetworkError, NetworkResult};
use carlot_core::PushMessage;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// First frame sent after the socket opens
#[derive(Debug, Serialize)]
struct AuthorizationFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: AuthorizationPayload<'a>,
}

#[derive(Debug, Serialize)]
struct AuthorizationPayload<'a> {
    token: &'a str,
}

impl<'a> AuthorizationFrame<'a> {
    fn new(token: &'a str) -> Self {
        Self {
            kind: "authorization",
            payload: AuthorizationPayload { token },
        }
    }
}

/// An open push channel
///
/// Dropping the channel closes the socket.
pub struct PushChannel {
    closing: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    /// Connects to `url` and authenticates with `token`
    ///
    /// Returns the channel and the receiver of decoded messages. The receiver
    /// yields `None` once the socket closes.
    pub async fn connect(
        url: &str,
        token: &str,
    ) -> NetworkResult<(Self, mpsc::UnboundedReceiver<PushMessage>)> {
        let (socket, _) = connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        let handshake = serde_json::to_string(&AuthorizationFrame::new(token))?;
        sink.send(Message::Text(handshake.into())).await?;
        log::info!("Push channel connected to {}", url);

        let (messages, receiver) = mpsc::unbounded_channel();
        let (closing, mut close_requested) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut close_requested => {
                        if let Err(e) = sink.send(Message::Close(None)).await {
                            log::debug!("Failed to close push channel cleanly: {}", e);
                        }
                        break;
                    }
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => match PushMessage::from_json(&text) {
                            Ok(message) => {
                                if messages.send(message).is_err() {
                                    log::debug!("Push receiver dropped");
                                    break;
                                }
                            }
                            Err(e) => log::warn!("Dropping undecodable push frame: {}", e),
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("Push channel closed by server");
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            log::warn!("Push channel failed: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        Ok((
            Self {
                closing: Some(closing),
                task: Some(task),
            },
            receiver,
        ))
    }

    /// Returns true once the socket reader has stopped
    pub fn is_closed(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Closes the socket and waits for the reader to stop
    pub async fn close(mut self) -> NetworkResult<()> {
        if let Some(closing) = self.closing.take() {
            let _ = closing.send(());
        }
        match self.task.take() {
            Some(task) => task.await.map_err(|_| NetworkError::ChannelClosed),
            None => Ok(()),
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(closing) = self.closing.take() {
            let _ = closing.send(());
        }
    }
}
