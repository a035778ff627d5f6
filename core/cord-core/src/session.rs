//! Presence session: connection state machine plus its background worker.
//!
//! ## State Machine
//!
//! ```text
//! Disconnected → Connecting → Handshaking → Ready
//! Ready        → Ready         (clear; connection kept)
//! Ready        → Disconnected  (connection lost; no reconnect)
//! any          → ShuttingDown → Disconnected   (disconnect)
//! ```
//!
//! Each session owns one worker thread that drains a FIFO job queue. The
//! worker is the only code that touches the transport, so updates are
//! serialized per session: the last requested update is the one displayed.
//! Foreground calls only check state and enqueue; they never block on I/O.
//!
//! Transport failures stop at the worker. They are logged and dropped; the
//! host never sees them.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::composer::{compose, ActivityEvent, Composition};
use crate::context::SessionContext;
use crate::error::{CordError, Result, TransportError};
use crate::profile::ClientProfile;
use crate::transport::{CancelFlag, Connector, Transport};

const WORKER_THREAD_NAME: &str = "cord-presence";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    ShuttingDown,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            SessionState::Disconnected => 0,
            SessionState::Connecting => 1,
            SessionState::Handshaking => 2,
            SessionState::Ready => 3,
            SessionState::ShuttingDown => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Connecting,
            2 => SessionState::Handshaking,
            3 => SessionState::Ready,
            4 => SessionState::ShuttingDown,
            _ => SessionState::Disconnected,
        }
    }
}

/// Atomic state shared between the session handle and its worker.
///
/// Transitions are compare-and-swap so a connect that completes late can
/// never overwrite `ShuttingDown`.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: SessionState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Drops back to `Disconnected` unless a shutdown is already underway.
    fn fail(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                match SessionState::from_u8(current) {
                    SessionState::ShuttingDown => None,
                    _ => Some(SessionState::Disconnected.as_u8()),
                }
            });
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
}

enum Job {
    Connect,
    Update(ActivityEvent),
    Clear,
    Shutdown,
}

/// Handle to a live presence session. Dropping it shuts the session down.
pub struct PresenceSession {
    profile: ClientProfile,
    state: Arc<StateCell>,
    cancel: CancelFlag,
    jobs: Sender<Job>,
    closed: bool,
}

impl PresenceSession {
    /// Starts the worker and queues the bounded connect attempt.
    ///
    /// Returns once the job is queued; the connect itself runs in the
    /// background.
    pub fn start(
        profile: ClientProfile,
        context: Arc<SessionContext>,
        connector: Arc<dyn Connector>,
        config: SessionConfig,
    ) -> Result<Self> {
        let state = Arc::new(StateCell::new(SessionState::Connecting));
        let cancel = CancelFlag::new();
        let (jobs, queue) = mpsc::channel();

        let worker = Worker {
            client_id: profile.client_id,
            connector,
            context,
            state: Arc::clone(&state),
            cancel: cancel.clone(),
            config,
            transport: None,
        };

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run(queue))
            .map_err(|source| CordError::WorkerSpawn { source })?;

        // The receiver is alive until the worker exits, and it only exits on
        // Shutdown or when this sender is dropped.
        let _ = jobs.send(Job::Connect);

        debug!(
            profile = %profile.name,
            client_id = profile.client_id,
            "Presence session started"
        );

        Ok(Self {
            profile,
            state,
            cancel,
            jobs,
            closed: false,
        })
    }

    pub fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Queues a compose-and-send. Returns `false` without queuing anything
    /// unless the session is `Ready`.
    pub fn request_update(&self, event: ActivityEvent) -> bool {
        if self.state.get() != SessionState::Ready {
            return false;
        }
        self.jobs.send(Job::Update(event)).is_ok()
    }

    pub fn clear_activity(&self) {
        if self.closed {
            return;
        }
        let _ = self.jobs.send(Job::Clear);
    }

    /// Cancels any in-flight connect and queues the shutdown. Safe to call
    /// in any state and more than once.
    pub fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();
        self.state.set(SessionState::ShuttingDown);
        if self.jobs.send(Job::Shutdown).is_err() {
            // Worker already gone; nothing left to release.
            self.state.set(SessionState::Disconnected);
        }
        debug!(client_id = self.profile.client_id, "Presence session disconnect requested");
    }
}

impl Drop for PresenceSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

struct Worker {
    client_id: u64,
    connector: Arc<dyn Connector>,
    context: Arc<SessionContext>,
    state: Arc<StateCell>,
    cancel: CancelFlag,
    config: SessionConfig,
    transport: Option<Box<dyn Transport>>,
}

impl Worker {
    fn run(mut self, queue: Receiver<Job>) {
        for job in queue.iter() {
            match job {
                Job::Connect => self.connect(),
                Job::Update(event) => self.update(event),
                Job::Clear => self.clear(),
                Job::Shutdown => break,
            }
        }
        self.shutdown();
    }

    fn connect(&mut self) {
        let deadline = Instant::now() + self.config.connect_timeout;
        match self.open_and_handshake(deadline) {
            Ok(mut transport) => {
                if self.state.transition(SessionState::Handshaking, SessionState::Ready) {
                    info!(client_id = self.client_id, "Presence session ready");
                    self.transport = Some(transport);
                } else {
                    // Disconnect won the race; release the fresh socket.
                    let _ = transport.close();
                }
            }
            Err(err) => {
                match err {
                    TransportError::Cancelled => {
                        debug!(client_id = self.client_id, "Presence connect cancelled")
                    }
                    err => warn!(
                        error = %err,
                        client_id = self.client_id,
                        "Presence connect failed"
                    ),
                }
                self.state.fail();
            }
        }
    }

    fn open_and_handshake(
        &self,
        deadline: Instant,
    ) -> std::result::Result<Box<dyn Transport>, TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let mut transport = self.connector.open()?;
        if !self
            .state
            .transition(SessionState::Connecting, SessionState::Handshaking)
        {
            let _ = transport.close();
            return Err(TransportError::Cancelled);
        }

        if let Err(err) = transport.handshake(self.client_id, deadline, &self.cancel) {
            let _ = transport.close();
            return Err(err);
        }
        Ok(transport)
    }

    fn update(&mut self, event: ActivityEvent) {
        if self.transport.is_none() {
            return;
        }

        let snapshot = self.context.snapshot();
        let activity = match compose(&snapshot, &event) {
            Composition::Activity(activity) => activity,
            Composition::Suppressed(reason) => {
                debug!(
                    reason = ?reason,
                    filetype = %event.filetype,
                    "Presence update suppressed"
                );
                return;
            }
        };

        if let Err(info) = activity.validate() {
            warn!(code = %info.code, message = %info.message, "Dropping invalid activity");
            return;
        }

        let result = match self.transport.as_mut() {
            Some(transport) => transport.set_activity(std::process::id(), Some(&activity)),
            None => return,
        };
        self.discard_error(result, "update");
    }

    fn clear(&mut self) {
        let result = match self.transport.as_mut() {
            Some(transport) => transport.set_activity(std::process::id(), None),
            None => return,
        };
        self.discard_error(result, "clear");
    }

    fn shutdown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close() {
                debug!(error = %err, "Presence socket close failed");
            }
        }
        self.state.set(SessionState::Disconnected);
        info!(client_id = self.client_id, "Presence session closed");
    }

    fn discard_error(&mut self, result: std::result::Result<(), TransportError>, operation: &str) {
        let Err(err) = result else {
            return;
        };
        warn!(error = %err, operation, "Presence transport operation failed");

        if err.is_connection_lost() {
            if let Some(mut transport) = self.transport.take() {
                let _ = transport.close();
            }
            if self
                .state
                .transition(SessionState::Ready, SessionState::Disconnected)
            {
                info!(client_id = self.client_id, "Presence connection lost");
            }
        }
    }
}
