//! Connection manager - the connection lifecycle as a pure state machine.
//!
//! The machine consumes [`ConnectionEvent`]s and produces [`Action`]s. It
//! never touches a socket; the session task performs the I/O and feeds the
//! results back in. This keeps every state and transition testable without a
//! live peer.
//!
//! ```text
//! Disconnected ──begin_attempt──▶ Connecting ──TransportOpened──▶ AwaitingAuth
//!      ▲                                                              │
//!      │                                                    auth_required → auth
//!      │                                                    auth_ok → get_states,
//!      │                                                              subscribe_events
//!      │                                                              ▼
//!      └──── TransportClosed / auth_invalid / timeout ────────── Authenticated
//! ```

use crate::credentials::AccessToken;
use crate::notify::Notice;
use crate::protocol::{
    EventMessage, InboundFrame, OutboundFrame, ResultMessage, GET_STATES_ID, SUBSCRIBE_ID,
};
use smartbin_types::EntitySnapshot;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Identity of one connection attempt. Events tagged with an older id are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingAuth,
    Authenticated,
}

/// Authentication progress within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unauthenticated,
    HandshakeSent,
    Authenticated,
}

/// Transient per-connection bookkeeping. Created on connect, dropped on
/// disconnect.
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    id: SessionId,
    auth: AuthStatus,
    pending: BTreeSet<u64>,
    attempt: u64,
}

impl ConnectionSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn auth(&self) -> AuthStatus {
        self.auth
    }

    /// Request ids sent and not yet answered.
    pub fn pending_requests(&self) -> impl Iterator<Item = u64> + '_ {
        self.pending.iter().copied()
    }

    /// Consecutive attempt number this session belongs to (1-based).
    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

/// Something that happened to the current connection.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The transport is open.
    TransportOpened,
    /// A decoded frame arrived.
    Frame(InboundFrame),
    /// The transport closed or failed.
    TransportClosed { reason: Option<String> },
    /// Authentication did not complete in time.
    HandshakeTimedOut,
}

/// Something the session task must do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send a frame now.
    Send(OutboundFrame),
    /// Run snapshots through the filter into the cache.
    Apply(Vec<EntitySnapshot>),
    /// Surface a status notice.
    Notify(Notice),
    /// Drop the transport.
    Close,
    /// Start a new attempt after the delay.
    ScheduleReconnect(Duration),
}

/// The connection state machine.
#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    session: Option<ConnectionSession>,
    token: AccessToken,
    reconnect_delay: Duration,
    last_session: u64,
    /// Attempts since the last successful authentication.
    attempts: u64,
}

impl ConnectionMachine {
    pub fn new(token: AccessToken, reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            session: None,
            token,
            reconnect_delay,
            last_session: 0,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> Option<&ConnectionSession> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    /// Attempts since the last successful authentication.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Starts a new connection attempt, discarding any previous session.
    pub fn begin_attempt(&mut self) -> (SessionId, Vec<Action>) {
        self.last_session += 1;
        self.attempts += 1;
        let id = SessionId(self.last_session);
        self.session = Some(ConnectionSession {
            id,
            auth: AuthStatus::Unauthenticated,
            pending: BTreeSet::new(),
            attempt: self.attempts,
        });
        self.state = ConnectionState::Connecting;
        debug!("Connection attempt {} (session {})", self.attempts, id);
        (
            id,
            vec![Action::Notify(Notice::Connecting {
                attempt: self.attempts,
            })],
        )
    }

    /// Feeds an event for `session` into the machine.
    pub fn handle(&mut self, session: SessionId, event: ConnectionEvent) -> Vec<Action> {
        if self.session.as_ref().map(ConnectionSession::id) != Some(session) {
            debug!("Ignoring event from stale session {}", session);
            return Vec::new();
        }

        match event {
            ConnectionEvent::TransportOpened => {
                if self.state == ConnectionState::Connecting {
                    self.state = ConnectionState::AwaitingAuth;
                    debug!("Transport open, waiting for auth_required");
                }
                Vec::new()
            }
            ConnectionEvent::Frame(frame) => self.handle_frame(frame),
            ConnectionEvent::TransportClosed { reason } => {
                match &reason {
                    Some(reason) => info!("Connection closed: {}", reason),
                    None => info!("Connection closed"),
                }
                self.disconnect(None)
            }
            ConnectionEvent::HandshakeTimedOut => {
                if self.is_authenticated() {
                    return Vec::new();
                }
                warn!("Handshake timed out");
                self.disconnect(None)
            }
        }
    }

    fn handle_frame(&mut self, frame: InboundFrame) -> Vec<Action> {
        match frame {
            // Pings are answered in every state.
            InboundFrame::Ping { id } => vec![Action::Send(OutboundFrame::Pong { id })],
            InboundFrame::AuthRequired { ha_version } => self.handle_auth_required(ha_version),
            InboundFrame::AuthOk { ha_version } => self.handle_auth_ok(ha_version),
            InboundFrame::AuthInvalid { message } => {
                warn!("Authentication rejected: {}", message);
                self.disconnect(Some(Notice::AuthRejected { message }))
            }
            InboundFrame::Result(result) if self.is_authenticated() => self.handle_result(result),
            InboundFrame::Event(event) if self.is_authenticated() => self.handle_event(event),
            InboundFrame::Result(ResultMessage { id, .. }) => {
                debug!("Ignoring result {} before authentication", id);
                Vec::new()
            }
            InboundFrame::Event(EventMessage { id, .. }) => {
                debug!("Ignoring event on {} before authentication", id);
                Vec::new()
            }
            InboundFrame::Pong { .. } | InboundFrame::Unknown => Vec::new(),
        }
    }

    fn handle_auth_required(&mut self, ha_version: Option<String>) -> Vec<Action> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if self.state != ConnectionState::AwaitingAuth || session.auth != AuthStatus::Unauthenticated {
            debug!("Ignoring auth_required in state {:?}", self.state);
            return Vec::new();
        }
        debug!("Peer requires auth (version {:?})", ha_version);
        session.auth = AuthStatus::HandshakeSent;
        vec![Action::Send(OutboundFrame::Auth {
            access_token: self.token.clone(),
        })]
    }

    fn handle_auth_ok(&mut self, ha_version: Option<String>) -> Vec<Action> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if self.state != ConnectionState::AwaitingAuth || session.auth != AuthStatus::HandshakeSent {
            warn!("Unexpected auth_ok in state {:?}", self.state);
            return self.disconnect(None);
        }

        session.auth = AuthStatus::Authenticated;
        session.pending.insert(GET_STATES_ID);
        session.pending.insert(SUBSCRIBE_ID);
        self.state = ConnectionState::Authenticated;
        self.attempts = 0;
        info!("Authenticated (peer version {:?})", ha_version);

        vec![
            Action::Send(OutboundFrame::get_states()),
            Action::Send(OutboundFrame::subscribe_state_changes()),
            Action::Notify(Notice::Connected),
        ]
    }

    fn handle_result(&mut self, result: ResultMessage) -> Vec<Action> {
        if let Some(session) = self.session.as_mut() {
            session.pending.remove(&result.id);
        }

        if !result.success {
            let error = result.error.as_ref().map(|e| format!("{}: {}", e.code, e.message));
            warn!("Request {} failed: {}", result.id, error.unwrap_or_default());
            return Vec::new();
        }

        match result.id {
            GET_STATES_ID => match result.snapshots() {
                Ok((snapshots, malformed)) => {
                    if malformed > 0 {
                        warn!("Dropped {} malformed states from full-state response", malformed);
                    }
                    debug!("Full-state response with {} states", snapshots.len());
                    vec![Action::Apply(snapshots)]
                }
                Err(e) => {
                    warn!("Dropping full-state response: {}", e);
                    Vec::new()
                }
            },
            SUBSCRIBE_ID => {
                debug!("Subscribed to state changes");
                Vec::new()
            }
            other => {
                debug!("Ignoring result for unknown request {}", other);
                Vec::new()
            }
        }
    }

    fn handle_event(&mut self, event: EventMessage) -> Vec<Action> {
        match event.state_change() {
            Ok(Some(change)) => match change.new_state {
                Some(snapshot) => vec![Action::Apply(vec![snapshot])],
                None => {
                    debug!("Ignoring removal of {}", change.entity_id);
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("Ignoring {} event", event.event.event_type);
                Vec::new()
            }
            Err(e) => {
                warn!("Dropping malformed state_changed event: {}", e);
                Vec::new()
            }
        }
    }

    fn disconnect(&mut self, notice: Option<Notice>) -> Vec<Action> {
        let was_authenticated = self.is_authenticated();
        self.state = ConnectionState::Disconnected;
        self.session = None;

        let mut actions = Vec::with_capacity(3);
        match notice {
            Some(notice) => actions.push(Action::Notify(notice)),
            // A drop before authentication is a startup race, not a failure.
            None if was_authenticated => actions.push(Action::Notify(Notice::ConnectionLost)),
            None => {}
        }
        actions.push(Action::Close);
        actions.push(Action::ScheduleReconnect(self.reconnect_delay));
        actions
    }
}
