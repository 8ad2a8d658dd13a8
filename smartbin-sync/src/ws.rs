//! WebSocket transport using tokio-tungstenite.

use crate::error::{SyncError, SyncResult};
use crate::transport::{Connector, FrameStream};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Opens `ws://` and `wss://` connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> SyncResult<Box<dyn FrameStream>> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        debug!("WebSocket open ({})", response.status());
        Ok(Box::new(WsStream { inner: stream }))
    }
}

/// An open WebSocket.
pub struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameStream for WsStream {
    async fn send(&mut self, frame: String) -> SyncResult<()> {
        self.inner
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<SyncResult<String>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => {
                    return Some(
                        String::from_utf8(bytes.to_vec())
                            .map_err(|_| SyncError::Protocol("binary frame is not UTF-8".into())),
                    );
                }
                Ok(Message::Close(frame)) => {
                    debug!("Peer sent close: {:?}", frame);
                    return None;
                }
                // Transport-level ping/pong is answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => return Some(Err(SyncError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close(None).await {
            debug!("Error closing WebSocket: {}", e);
        }
    }
}
