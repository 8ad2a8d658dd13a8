//! User-visible connection status notices.

use std::fmt;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A connection status change worth showing to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A connection attempt started.
    Connecting { attempt: u64 },
    /// Authenticated and subscribed.
    Connected,
    /// An authenticated connection dropped.
    ConnectionLost,
    /// The peer rejected the credential; will retry.
    AuthRejected { message: String },
    /// No credential at startup; the panel cannot connect.
    MissingCredential,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Connecting { attempt: 1 } => f.write_str("Connecting..."),
            Notice::Connecting { attempt } => write!(f, "Reconnecting (attempt {attempt})..."),
            Notice::Connected => f.write_str("Connected"),
            Notice::ConnectionLost => f.write_str("Connection lost. Reconnecting..."),
            Notice::AuthRejected { message } if message.is_empty() => {
                f.write_str("Authentication failed. Retrying...")
            }
            Notice::AuthRejected { message } => {
                write!(f, "Authentication failed: {message}. Retrying...")
            }
            Notice::MissingCredential => {
                f.write_str("No access token configured. The live panel is disabled.")
            }
        }
    }
}

/// Receives status notices from the connection manager.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::ConnectionLost | Notice::AuthRejected { .. } | Notice::MissingCredential => {
                warn!("{}", notice)
            }
            _ => info!("{}", notice),
        }
    }
}

/// Forwards notices to a channel. A closed receiver drops them.
impl NotificationSink for mpsc::UnboundedSender<Notice> {
    fn notify(&self, notice: Notice) {
        let _ = self.send(notice);
    }
}
