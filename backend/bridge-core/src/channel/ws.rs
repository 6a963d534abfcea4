//! WebSocket transport to a frontend bridge.
//!
//! Frames are JSON text envelopes `{"target_name": ..., "data": ...}`. Inbound
//! envelopes addressed to another target are ignored; the `data` payload of
//! matching ones is handed to the registered [`MessageHandler`].
//!
//! Each connection runs on its own task. When that task ends (peer closed,
//! read or write error) the outbound queue closes, which is how `open` and
//! `send` notice the connection is gone.

use crate::channel::{KernelChannel, MessageHandler};
use crate::config::ChannelSettings;
use crate::error::channel::ChannelError;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::spawn as TokioSpawn;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type SharedHandler = Arc<dyn Fn(Value) + Send + Sync>;
type HandlerSlot = Arc<RwLock<Option<SharedHandler>>>;
type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize, Deserialize)]
struct CommEnvelope {
    target_name: String,
    data: Value,
}

/// WebSocket client channel.
pub struct WsChannel {
    url: Url,
    target_name: String,
    connect_timeout: Duration,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    handler: HandlerSlot,
}

impl WsChannel {
    /// Parse `url`, connect, and return an open channel.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Connect`] if the URL is not `ws://`/`wss://` or no
    ///   connection could be made within `settings.connect_timeout`
    pub async fn connect(url: &str, settings: &ChannelSettings) -> Result<Self, ChannelError> {
        let url = Url::parse(url).map_err(|e| ChannelError::Connect {
            message: format!("Invalid frontend URL '{url}': {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChannelError::Connect {
                message: format!("Frontend URL must use ws:// or wss://, got {}", url.scheme()),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let channel = Self {
            url,
            target_name: settings.target_name.clone(),
            connect_timeout: settings.connect_timeout,
            outbound: Mutex::new(None),
            handler: Arc::new(RwLock::new(None)),
        };

        channel.open().await?;
        Ok(channel)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn establish(&self) -> Result<mpsc::UnboundedSender<Message>, ChannelError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.connect_timeout),
            ..Default::default()
        };

        loop {
            let error = match TokioTimeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
            {
                Ok(Ok((ws_stream, _))) => {
                    info!("Connected to frontend at {}", self.url);
                    let (tx, rx) = mpsc::unbounded_channel();
                    TokioSpawn(run_connection(
                        ws_stream,
                        rx,
                        Arc::clone(&self.handler),
                        self.target_name.clone(),
                    ));
                    return Ok(tx);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("connect attempt timed out after {:?}", self.connect_timeout),
            };

            match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Frontend not reachable ({error}), retrying after {duration:?}");
                    TokioSleep(duration).await;
                }
                None => {
                    return Err(ChannelError::Connect {
                        message: format!(
                            "Could not connect to {} within {:?}: {error}",
                            self.url, self.connect_timeout
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }
    }
}

impl KernelChannel for WsChannel {
    fn is_attached(&self) -> bool {
        true
    }

    async fn open(&self) -> Result<(), ChannelError> {
        let mut outbound = self.outbound.lock().await;
        if let Some(tx) = outbound.as_ref() {
            if !tx.is_closed() {
                return Ok(());
            }
            debug!("Frontend connection lost, reconnecting to {}", self.url);
        }

        *outbound = Some(self.establish().await?);
        Ok(())
    }

    async fn send(&self, message: Value) -> Result<(), ChannelError> {
        let envelope = CommEnvelope {
            target_name: self.target_name.clone(),
            data: message,
        };
        let text = serde_json::to_string(&envelope)?;

        let outbound = self.outbound.lock().await;
        match outbound.as_ref() {
            Some(tx) if !tx.is_closed() => {
                tx.send(Message::Text(text.into())).map_err(|e| ChannelError::Send {
                    message: format!("Failed to queue message: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            _ => Err(ChannelError::closed(format!(
                "No open connection to {}",
                self.url
            ))),
        }
    }

    fn on_message(&self, handler: MessageHandler) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::from(handler));
    }
}

async fn run_connection(
    ws_stream: ClientStream,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    handler: HandlerSlot,
    target_name: String,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = outbound_rx.recv() => match outgoing {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        warn!("Failed to write to frontend: {e}");
                        break;
                    }
                }
                None => {
                    let _ = write.close().await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => dispatch(text.as_str(), &handler, &target_name),
                Some(Ok(Message::Close(_))) | None => {
                    info!("Frontend closed the connection");
                    break;
                }
                Some(Ok(_)) => trace!("Ignoring non-text frame"),
                Some(Err(e)) => {
                    warn!("Error reading from frontend: {e}");
                    break;
                }
            },
        }
    }
}

fn dispatch(text: &str, handler: &HandlerSlot, target_name: &str) {
    let envelope: CommEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Dropping undecodable frame from frontend: {e}");
            return;
        }
    };

    if envelope.target_name != target_name {
        debug!("Ignoring message for target '{}'", envelope.target_name);
        return;
    }

    let handler = handler
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match handler {
        Some(handler) => handler(envelope.data),
        None => debug!("No handler registered, dropping message"),
    }
}
