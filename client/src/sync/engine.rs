//! ActiveSync Handshake Engine
//!
//! Drives the startup sequence against an ActiveSync server:
//! - OPTIONS, when the known server capabilities are missing or stale
//! - Provision, when no policy key is held
//! - FolderSync, always
//!
//! Each step reports a [`StepResult`]; the first non-success halts the run
//! and returns the session to [`SessionState::Stopped`]. The engine is the
//! only writer of the session state, observers read it through
//! [`SessionStateReader`] or the event channel.

use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{HttpErrorHandler, Transport};
use crate::sync::state::{SessionState, SessionStateCell, SessionStateReader};
use crate::types::error::{EngineError, Result};
use crate::types::{StatusCode, StepResult};

/// Handshake step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakePhase {
    Discovery,
    Authorization,
    FolderSync,
}

/// A step that reported non-success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub phase: HandshakePhase,
    pub result: StepResult,
}

/// How a handshake run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeOutcome {
    /// All steps succeeded, the session is in [`SessionState::QueuedSync`]
    Completed,
    /// A step failed, the session is stopped
    Failed(StepFailure),
    /// `stop()` was called while the handshake was in flight
    Stopped { reason: Option<String> },
}

/// Event emitted by the handshake engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HandshakeEvent {
    StateChanged(SessionState),
    StepFailed(StepFailure),
    Stopped { reason: Option<String> },
    Completed,
}

struct EngineInner {
    transport: Arc<dyn Transport>,
    state: SessionStateCell,
    running: AtomicBool,
    last_failure: RwLock<Option<StepFailure>>,
    stop_reason: RwLock<Option<String>>,
    events_tx: Sender<HandshakeEvent>,
}

/// The handshake engine, one per account
#[derive(Clone)]
pub struct HandshakeEngine {
    inner: Arc<EngineInner>,
}

impl HandshakeEngine {
    /// Create a new engine in the `Stopped` state
    pub fn new(transport: Arc<dyn Transport>) -> (Self, Receiver<HandshakeEvent>) {
        let (tx, rx) = flume::unbounded();

        let engine = Self {
            inner: Arc::new(EngineInner {
                transport,
                state: SessionStateCell::new(),
                running: AtomicBool::new(false),
                last_failure: RwLock::new(None),
                stop_reason: RwLock::new(None),
                events_tx: tx,
            }),
        };

        (engine, rx)
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.inner.state.load()
    }

    /// Read-only handle on the session state, for status polling
    pub fn state_reader(&self) -> SessionStateReader {
        self.inner.state.reader()
    }

    /// Whether a handshake is in flight
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The step that halted the last run, if any
    pub fn last_failure(&self) -> Option<StepFailure> {
        read_lock(&self.inner.last_failure).clone()
    }

    /// The reason given to the last `stop()`, if any
    pub fn stop_reason(&self) -> Option<String> {
        read_lock(&self.inner.stop_reason).clone()
    }

    /// Start the handshake in a background task
    ///
    /// Sets [`SessionState::Started`] before returning. Must be called from
    /// within a tokio runtime. A second call while a handshake is in flight
    /// is rejected with [`EngineError::AlreadyRunning`].
    pub fn start(&self) -> Result<JoinHandle<HandshakeOutcome>> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Handshake already in progress, ignoring start");
            return Err(EngineError::AlreadyRunning);
        }

        *write_lock(&self.inner.last_failure) = None;
        *write_lock(&self.inner.stop_reason) = None;

        info!("Beginning sync");
        self.inner.state.swap(SessionState::Started);
        self.inner.emit(HandshakeEvent::StateChanged(SessionState::Started));

        let inner = self.inner.clone();
        Ok(tokio::spawn(async move {
            let _guard = RunGuard { engine: inner.as_ref() };
            inner.run_handshake().await
        }))
    }

    /// Stop the session
    ///
    /// Safe to call from any state. An in-flight network call is not
    /// interrupted; the running handshake halts before its next step.
    pub fn stop(&self, reason: Option<&str>) {
        self.inner.stop(reason);
    }
}

impl EngineInner {
    async fn run_handshake(&self) -> HandshakeOutcome {
        let mut current = SessionState::Started;

        // Do I know my server with certainty?
        if self.transport.is_discovery_stale() {
            debug!("NEED to send OPTIONS");
            if !self.advance(&mut current, SessionState::NegotiatingOptions) {
                return self.stopped_outcome();
            }

            let handler = SessionResetHandler { engine: self };
            let result = self.transport.perform_discovery(&handler).await;
            if !result.is_success() {
                error!("Fatal error with options ({})", result);
                return self.fail(HandshakePhase::Discovery, result);
            }
        } else {
            debug!("DO NOT NEED to send OPTIONS");
        }

        // Do I have a policy key?
        if !self.transport.is_authorization_valid() {
            debug!("NEED to send PROVISIONING");
            if !self.advance(&mut current, SessionState::Provisioning) {
                return self.stopped_outcome();
            }

            let result = self.transport.perform_authorization().await;
            if !result.is_success() {
                error!("Provisioning failed ({})", result);
                return self.fail(HandshakePhase::Authorization, result);
            }
        } else {
            debug!("DO NOT NEED to send PROVISIONING");
        }

        // Startup always includes a FolderSync
        if !self.advance(&mut current, SessionState::SyncingFolders) {
            return self.stopped_outcome();
        }
        let result = self.transport.perform_initial_sync().await;
        if !result.is_success() {
            error!("Folder sync failed ({})", result);
            return self.fail(HandshakePhase::FolderSync, result);
        }

        if !self.advance(&mut current, SessionState::QueuedSync) {
            return self.stopped_outcome();
        }
        info!("Handshake complete, sync queued");
        self.emit(HandshakeEvent::Completed);
        HandshakeOutcome::Completed
    }

    /// Move from `current` to `next` unless someone stopped the session
    fn advance(&self, current: &mut SessionState, next: SessionState) -> bool {
        if !self.state.transition(*current, next) {
            debug!("Session left {} while handshaking, halting", current);
            return false;
        }
        debug!("State: {} -> {}", current, next);
        *current = next;
        self.emit(HandshakeEvent::StateChanged(next));
        true
    }

    fn fail(&self, phase: HandshakePhase, result: StepResult) -> HandshakeOutcome {
        let failure = StepFailure { phase, result };
        *write_lock(&self.last_failure) = Some(failure.clone());
        self.emit(HandshakeEvent::StepFailed(failure.clone()));

        // A stop that landed while the step was in flight keeps its reason
        if self.state.load() == SessionState::Stopped {
            return self.stopped_outcome();
        }

        self.stop(failure.result.detail.as_deref());
        HandshakeOutcome::Failed(failure)
    }

    fn stopped_outcome(&self) -> HandshakeOutcome {
        HandshakeOutcome::Stopped {
            reason: read_lock(&self.stop_reason).clone(),
        }
    }

    fn stop(&self, reason: Option<&str>) {
        info!("Sync stopped: {}", reason.unwrap_or("no reason given"));
        if let Some(reason) = reason {
            *write_lock(&self.stop_reason) = Some(reason.to_string());
        }

        let previous = self.state.swap(SessionState::Stopped);
        if previous != SessionState::Stopped {
            self.transport.invalidate_policy_key();
            self.emit(HandshakeEvent::StateChanged(SessionState::Stopped));
            self.emit(HandshakeEvent::Stopped {
                reason: reason.map(|r| r.to_string()),
            });
        }
    }

    fn emit(&self, event: HandshakeEvent) {
        // Nobody listening is fine
        let _ = self.events_tx.send(event);
    }
}

/// Treats every non-2xx discovery response as fatal to the current run
struct SessionResetHandler<'a> {
    engine: &'a EngineInner,
}

impl HttpErrorHandler for SessionResetHandler<'_> {
    fn handle_http_error(&self, status: u16, message: &str) -> StepResult {
        if self
            .engine
            .state
            .transition(SessionState::NegotiatingOptions, SessionState::HttpError)
        {
            self.engine
                .emit(HandshakeEvent::StateChanged(SessionState::HttpError));
        }

        self.engine.transport.invalidate_session();
        self.engine.transport.invalidate_policy_key();
        error!("Fatal error, {} is not a good code! ({})", status, message);

        StepResult::failure(
            StatusCode::from_http_status(status),
            format!("fatal: HTTP {} {}", status, message),
        )
    }
}

/// Clears the running flag when the handshake task ends, panics included
struct RunGuard<'a> {
    engine: &'a EngineInner,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("Handshake task panicked");
            self.engine.state.swap(SessionState::Stopped);
        }
        self.engine.running.store(false, Ordering::SeqCst);
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
