//! Real-time state synchronization engine for the SmartBin live panel.
//!
//! Mirrors a set of entities published on an external event bus into a local
//! cache and drives a render loop that keeps the operator's input focus.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Filter**: decides whether an update is relevant and actually new
//! - **State**: latest snapshot per entity, plus digests of accepted content
//! - **Connection**: the connection lifecycle as a pure state machine
//! - **Session**: owns the above and performs the I/O on one task
//! - **Scheduler**: coalesces render requests into one pass per frame
//! - **Reconciler**: full-replacement rendering that restores focus
//!
//! ## Data flow
//!
//! 1. **Connect**: open the transport, wait for `auth_required`
//! 2. **Authenticate**: send the token, wait for `auth_ok`
//! 3. **Subscribe**: request the full state and subscribe to `state_changed`
//! 4. **Apply**: filter, digest and cache every snapshot that arrives
//! 5. **Render**: on the next frame, render the cache and restore focus
//!
//! # Example
//!
//! ```
//! use smartbin_sync::{LogSink, RenderScheduler, StaticToken, SyncConfig, SyncSession};
//! use std::sync::Arc;
//!
//! let scheduler = RenderScheduler::default();
//! let session = SyncSession::websocket(
//!     SyncConfig::default(),
//!     Arc::new(StaticToken::new("long-lived-token")),
//!     Arc::new(LogSink),
//!     scheduler.handle(),
//! );
//! assert!(!session.is_running());
//! ```

pub mod applicator;
pub mod codec;
mod config;
pub mod connection;
pub mod credentials;
mod error;
pub mod filter;
pub mod notify;
pub mod protocol;
pub mod reconciler;
pub mod scheduler;
mod session;
pub mod state;
pub mod transport;
pub mod view;
pub mod ws;

pub use applicator::{ApplyOutcome, ApplyReport, SnapshotApplicator};
pub use codec::{FrameCodec, MAX_FRAME_SIZE};
pub use config::{SyncConfig, DEFAULT_URL};
pub use connection::{
    Action, AuthStatus, ConnectionEvent, ConnectionMachine, ConnectionSession, ConnectionState,
    SessionId,
};
pub use credentials::{AccessToken, CredentialSource, EnvToken, StaticToken};
pub use error::{SyncError, SyncResult};
pub use filter::{EntityFilter, FilterConfig, IdentifierRule};
pub use notify::{LogSink, Notice, NotificationSink};
pub use protocol::{
    BusEvent, ErrorMessage, EventMessage, InboundFrame, OutboundFrame, ResultMessage, StateChange,
    GET_STATES_ID, STATE_CHANGED, SUBSCRIBE_ID,
};
pub use reconciler::{FocusPreservingReconciler, FocusSnapshot, Reconciliation, SharedSurface};
pub use scheduler::{RenderHandle, RenderScheduler, RenderTarget, DEFAULT_FRAME_INTERVAL};
pub use session::SyncSession;
pub use state::{CacheView, DigestTable, SharedStateCache, StateCache};
pub use transport::{Connector, FrameStream};
pub use view::{
    NodeKind, RetainedSurface, Selection, StableKey, ViewNode, ViewRenderer, ViewSurface, ViewTree,
};
pub use ws::WsConnector;
