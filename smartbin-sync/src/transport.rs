//! Transport layer abstraction.
//!
//! The session task only needs to open a connection and exchange text frames
//! over it. [`Connector`] and [`FrameStream`] capture exactly that, so the
//! session can run over a WebSocket in production and over in-memory
//! channels in tests.

use crate::error::SyncResult;
use async_trait::async_trait;

/// Opens connections to the bus.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection.
    async fn connect(&self, url: &str) -> SyncResult<Box<dyn FrameStream>>;
}

/// One open connection carrying text frames.
#[async_trait]
pub trait FrameStream: Send {
    /// Sends a text frame.
    async fn send(&mut self, frame: String) -> SyncResult<()>;

    /// Receives the next text frame. `None` means the peer closed the
    /// connection; `Some(Err(_))` is a transport failure.
    async fn recv(&mut self) -> Option<SyncResult<String>>;

    /// Closes the connection.
    async fn close(&mut self);
}

/// In-memory transport for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{mpsc, Mutex};

    /// Test-side end of one mock connection.
    #[derive(Debug)]
    pub struct MockPeer {
        /// URL the session connected to.
        pub url: String,
        to_client: Option<mpsc::UnboundedSender<SyncResult<String>>>,
        from_client: mpsc::UnboundedReceiver<String>,
    }

    impl MockPeer {
        /// Queues a frame for the client.
        pub fn send(&self, frame: impl Into<String>) {
            if let Some(tx) = &self.to_client {
                let _ = tx.send(Ok(frame.into()));
            }
        }

        /// Queues a JSON frame for the client.
        pub fn send_json(&self, frame: serde_json::Value) {
            self.send(frame.to_string());
        }

        /// Injects a transport failure.
        pub fn fail(&self, reason: impl Into<String>) {
            if let Some(tx) = &self.to_client {
                let _ = tx.send(Err(SyncError::Transport(reason.into())));
            }
        }

        /// Closes the connection from the peer's side.
        pub fn close(&mut self) {
            self.to_client = None;
        }

        /// Waits for the next frame from the client. `None` once the client
        /// has dropped the connection.
        pub async fn recv(&mut self) -> Option<String> {
            self.from_client.recv().await
        }

        /// Waits for the next frame and parses it as JSON.
        pub async fn recv_json(&mut self) -> Option<serde_json::Value> {
            let text = self.recv().await?;
            serde_json::from_str(&text).ok()
        }

        /// Returns a frame already sent by the client, without waiting.
        pub fn try_recv(&mut self) -> Option<String> {
            self.from_client.try_recv().ok()
        }
    }

    /// Connector handing each new connection's peer end to the test.
    #[derive(Debug, Clone)]
    pub struct MockConnector {
        peers: mpsc::UnboundedSender<MockPeer>,
        refuse: Arc<AtomicUsize>,
        attempts: Arc<AtomicUsize>,
    }

    /// Receives the peer end of every connection the session opens.
    #[derive(Debug)]
    pub struct MockAcceptor {
        peers: Mutex<mpsc::UnboundedReceiver<MockPeer>>,
    }

    impl MockAcceptor {
        /// Waits for the session's next connection.
        pub async fn accept(&self) -> Option<MockPeer> {
            self.peers.lock().await.recv().await
        }
    }

    impl MockConnector {
        pub fn new() -> (Self, MockAcceptor) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Self {
                    peers: tx,
                    refuse: Arc::new(AtomicUsize::new(0)),
                    attempts: Arc::new(AtomicUsize::new(0)),
                },
                MockAcceptor {
                    peers: Mutex::new(rx),
                },
            )
        }

        /// Makes the next `n` connection attempts fail.
        pub fn refuse_next(&self, n: usize) {
            self.refuse.store(n, Ordering::SeqCst);
        }

        /// Connection attempts so far, refused ones included.
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, url: &str) -> SyncResult<Box<dyn FrameStream>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let refused = self
                .refuse
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(SyncError::Transport("connection refused".into()));
            }

            let (to_client, from_peer) = mpsc::unbounded_channel();
            let (to_peer, from_client) = mpsc::unbounded_channel();
            let peer = MockPeer {
                url: url.to_string(),
                to_client: Some(to_client),
                from_client,
            };
            self.peers
                .send(peer)
                .map_err(|_| SyncError::Transport("no acceptor".into()))?;
            Ok(Box::new(MockStream {
                incoming: from_peer,
                outgoing: Some(to_peer),
            }))
        }
    }

    /// Client end of a mock connection.
    #[derive(Debug)]
    pub struct MockStream {
        incoming: mpsc::UnboundedReceiver<SyncResult<String>>,
        outgoing: Option<mpsc::UnboundedSender<String>>,
    }

    #[async_trait]
    impl FrameStream for MockStream {
        async fn send(&mut self, frame: String) -> SyncResult<()> {
            let tx = self.outgoing.as_ref().ok_or(SyncError::ChannelClosed)?;
            tx.send(frame).map_err(|_| SyncError::ChannelClosed)
        }

        async fn recv(&mut self) -> Option<SyncResult<String>> {
            self.incoming.recv().await
        }

        async fn close(&mut self) {
            self.outgoing = None;
            self.incoming.close();
        }
    }
}
