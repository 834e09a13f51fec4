use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::channel::{Connector, FrameSource};
use crate::error::{ClientError, Result};

const CLOSE_ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// [`Connector`] over WebSocket (`ws://` and `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn FrameSource>> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Channel(e.to_string()))?;
        debug!(url = %url, status = response.status().as_u16(), "WebSocket handshake complete");
        Ok(Box::new(WsFrameSource {
            stream,
            closed: false,
        }))
    }
}

struct WsFrameSource {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        if self.closed {
            return None;
        }
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => {
                        return Some(Err(ClientError::MalformedMessage(format!(
                            "binary frame is not UTF-8: {e}"
                        ))));
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!(frame = ?frame, "Server closed WebSocket");
                    self.closed = true;
                    return None;
                }
                // Pings are answered by tungstenite on the next read/write.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => return Some(Err(ClientError::Channel(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "WebSocket close handshake failed");
        }
        // Drain until the peer acknowledges so the TCP stream shuts down cleanly.
        let drain = async {
            while let Some(message) = self.stream.next().await {
                if let Err(e) = message {
                    debug!(error = %e, "Error while draining closed WebSocket");
                    break;
                }
            }
        };
        if tokio::time::timeout(CLOSE_ACK_TIMEOUT, drain).await.is_err() {
            warn!("Server did not acknowledge WebSocket close");
        }
    }
}
