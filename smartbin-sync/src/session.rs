//! Synchronization session - owns the engine's state and drives the I/O.
//!
//! A [`SyncSession`] owns the cache, the filter/digest pipeline and the
//! connection machine. `start()` spawns one task that connects, feeds every
//! inbound frame through the [`ConnectionMachine`] strictly in arrival order
//! and performs the resulting actions; `stop()` shuts it down. The task is
//! the cache's only writer.

use crate::applicator::SnapshotApplicator;
use crate::codec::FrameCodec;
use crate::config::SyncConfig;
use crate::connection::{Action, ConnectionEvent, ConnectionMachine, SessionId};
use crate::credentials::CredentialSource;
use crate::error::{SyncError, SyncResult};
use crate::filter::EntityFilter;
use crate::notify::{Notice, NotificationSink};
use crate::scheduler::RenderHandle;
use crate::state::{SharedStateCache, StateCache};
use crate::transport::{Connector, FrameStream};
use crate::ws::WsConnector;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The live synchronization session.
pub struct SyncSession {
    config: SyncConfig,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialSource>,
    notifier: Arc<dyn NotificationSink>,
    render: RenderHandle,
    cache: SharedStateCache,
    /// Parked while stopped; moved into the task while running.
    applicator: Option<SnapshotApplicator>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<SnapshotApplicator>>,
}

impl SyncSession {
    /// Creates a stopped session.
    pub fn new(
        config: SyncConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialSource>,
        notifier: Arc<dyn NotificationSink>,
        render: RenderHandle,
    ) -> Self {
        let cache = StateCache::shared();
        let filter = EntityFilter::new(config.filter.clone());
        let applicator = SnapshotApplicator::new(filter, Arc::clone(&cache));
        Self {
            config,
            connector,
            credentials,
            notifier,
            render,
            cache,
            applicator: Some(applicator),
            shutdown: None,
            task: None,
        }
    }

    /// Creates a stopped session over WebSocket.
    pub fn websocket(
        config: SyncConfig,
        credentials: Arc<dyn CredentialSource>,
        notifier: Arc<dyn NotificationSink>,
        render: RenderHandle,
    ) -> Self {
        Self::new(config, Arc::new(WsConnector), credentials, notifier, render)
    }

    /// The synchronized state. Read-only for everyone but the session.
    pub fn cache(&self) -> SharedStateCache {
        Arc::clone(&self.cache)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts synchronizing.
    ///
    /// Fails without connecting if the credential source has no token; that
    /// is the one error retrying cannot fix.
    pub fn start(&mut self) -> SyncResult<()> {
        if self.task.is_some() {
            return Err(SyncError::AlreadyStarted);
        }
        self.config.validate()?;

        let Some(token) = self.credentials.access_token() else {
            warn!("No access token available; not connecting");
            self.notifier.notify(Notice::MissingCredential);
            return Err(SyncError::MissingCredential);
        };
        let applicator = self.applicator.take().ok_or(SyncError::AlreadyStarted)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = SessionRunner {
            machine: ConnectionMachine::new(token, self.config.reconnect_delay),
            codec: FrameCodec::new(self.config.max_frame_size),
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            notifier: Arc::clone(&self.notifier),
            render: self.render.clone(),
            applicator,
        };

        info!("Starting sync session against {}", self.config.url);
        self.task = Some(tokio::spawn(runner.run(shutdown_rx)));
        self.shutdown = Some(shutdown_tx);
        Ok(())
    }

    /// Stops synchronizing and waits for the session task to finish. The
    /// cache keeps its contents.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        let Some(task) = self.task.take() else {
            return;
        };
        match task.await {
            Ok(applicator) => self.applicator = Some(applicator),
            Err(e) => {
                warn!("Session task failed: {}", e);
                let filter = EntityFilter::new(self.config.filter.clone());
                let mut cache = self.cache.write().await;
                // Digests died with the task; start from a clean slate so the
                // next run re-admits everything.
                *cache = StateCache::new();
                drop(cache);
                self.applicator = Some(SnapshotApplicator::new(filter, Arc::clone(&self.cache)));
            }
        }
        info!("Sync session stopped");
    }
}

/// Why a connection ended.
enum Exit {
    Shutdown,
    Reconnect(Duration),
}

/// State moved into the session task.
struct SessionRunner {
    config: SyncConfig,
    codec: FrameCodec,
    connector: Arc<dyn Connector>,
    notifier: Arc<dyn NotificationSink>,
    render: RenderHandle,
    applicator: SnapshotApplicator,
    machine: ConnectionMachine,
}

impl SessionRunner {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SnapshotApplicator {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let (session, actions) = self.machine.begin_attempt();
            self.perform_offline(actions);

            let connect = self.connect();
            let opened = tokio::select! {
                opened = connect => opened,
                _ = shutdown.changed() => break,
            };

            let delay = match opened {
                Ok(stream) => match self.drive(session, stream, &mut shutdown).await {
                    Exit::Shutdown => break,
                    Exit::Reconnect(delay) => delay,
                },
                Err(e) => {
                    warn!("Connection to {} failed: {}", self.config.url, e);
                    let actions = self.machine.handle(
                        session,
                        ConnectionEvent::TransportClosed {
                            reason: Some(e.to_string()),
                        },
                    );
                    self.perform_offline(actions)
                        .unwrap_or(self.config.reconnect_delay)
                }
            };

            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        self.applicator
    }

    /// Opens the transport, bounded by the handshake timeout.
    async fn connect(&self) -> SyncResult<Box<dyn FrameStream>> {
        let connect = self.connector.connect(&self.config.url);
        match self.config.handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| SyncError::Timeout)?,
            None => connect.await,
        }
    }

    /// Runs one open connection until it drops or the session stops.
    async fn drive(
        &mut self,
        session: SessionId,
        mut stream: Box<dyn FrameStream>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Exit {
        let actions = self.machine.handle(session, ConnectionEvent::TransportOpened);
        if let Some(delay) = self.perform(session, stream.as_mut(), actions).await {
            return Exit::Reconnect(delay);
        }
        let deadline = self.config.handshake_timeout.map(|limit| Instant::now() + limit);

        loop {
            let awaiting_auth = !self.machine.is_authenticated();
            let handshake_expiry = async move {
                match deadline {
                    Some(deadline) if awaiting_auth => tokio::time::sleep_until(deadline).await,
                    _ => std::future::pending::<()>().await,
                }
            };

            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    stream.close().await;
                    return Exit::Shutdown;
                }
                inbound = stream.recv() => match inbound {
                    Some(Ok(text)) => match self.codec.decode(&text) {
                        Ok(frame) => ConnectionEvent::Frame(frame),
                        Err(e) => {
                            warn!("Dropping malformed frame: {}", e);
                            continue;
                        }
                    },
                    Some(Err(SyncError::Protocol(reason))) => {
                        warn!("Dropping undecodable frame: {}", reason);
                        continue;
                    }
                    Some(Err(e)) => ConnectionEvent::TransportClosed {
                        reason: Some(e.to_string()),
                    },
                    None => ConnectionEvent::TransportClosed { reason: None },
                },
                _ = handshake_expiry => ConnectionEvent::HandshakeTimedOut,
            };

            let actions = self.machine.handle(session, event);
            if let Some(delay) = self.perform(session, stream.as_mut(), actions).await {
                return Exit::Reconnect(delay);
            }
        }
    }

    /// Performs actions against an open stream. Returns the reconnect delay
    /// once the machine has given up on this connection.
    async fn perform(
        &mut self,
        session: SessionId,
        stream: &mut dyn FrameStream,
        actions: Vec<Action>,
    ) -> Option<Duration> {
        let mut queue: VecDeque<Action> = actions.into();
        let mut reconnect = None;

        while let Some(action) = queue.pop_front() {
            match action {
                Action::Send(frame) => {
                    let text = match self.codec.encode(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Cannot encode outbound frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = stream.send(text).await {
                        warn!("Send failed: {}", e);
                        queue.clear();
                        queue.extend(self.machine.handle(
                            session,
                            ConnectionEvent::TransportClosed {
                                reason: Some(e.to_string()),
                            },
                        ));
                    }
                }
                Action::Apply(snapshots) => {
                    let report = self.applicator.apply_batch(snapshots).await;
                    if report.changed() {
                        self.render.request_render();
                    }
                }
                Action::Notify(notice) => self.notifier.notify(notice),
                Action::Close => stream.close().await,
                Action::ScheduleReconnect(delay) => reconnect = Some(delay),
            }
        }
        reconnect
    }

    /// Performs actions when no stream is open.
    fn perform_offline(&mut self, actions: Vec<Action>) -> Option<Duration> {
        let mut reconnect = None;
        for action in actions {
            match action {
                Action::Notify(notice) => self.notifier.notify(notice),
                Action::ScheduleReconnect(delay) => reconnect = Some(delay),
                other => debug!("Dropping {:?} with no open connection", other),
            }
        }
        reconnect
    }
}
