//! Session state shared between the handshake task and observers
//!
//! The engine is the only writer. Everyone else gets a [`SessionStateReader`]
//! that can load the current value but never store one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Coarse-grained session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionState {
    Stopped = 0,
    Started,
    NegotiatingOptions,
    SyncingFolders,
    Provisioning,
    QueuedSync,
    ResettingSync,
    RunningLoop,
    QueuedPing,
    HttpError,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Started,
            2 => Self::NegotiatingOptions,
            3 => Self::SyncingFolders,
            4 => Self::Provisioning,
            5 => Self::QueuedSync,
            6 => Self::ResettingSync,
            7 => Self::RunningLoop,
            8 => Self::QueuedPing,
            9 => Self::HttpError,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::NegotiatingOptions => "negotiating options",
            Self::SyncingFolders => "syncing folders",
            Self::Provisioning => "provisioning",
            Self::QueuedSync => "queued sync",
            Self::ResettingSync => "resetting sync",
            Self::RunningLoop => "running loop",
            Self::QueuedPing => "queued ping",
            Self::HttpError => "http error",
        };
        f.write_str(s)
    }
}

/// Writable state cell, owned by the engine
#[derive(Debug)]
pub(crate) struct SessionStateCell {
    inner: Arc<AtomicU8>,
}

impl SessionStateCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(SessionState::Stopped as u8)),
        }
    }

    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// Store a new state, returning the previous one
    pub(crate) fn swap(&self, state: SessionState) -> SessionState {
        SessionState::from_u8(self.inner.swap(state as u8, Ordering::AcqRel))
    }

    /// Store `to` only if the current state is still `from`
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.inner
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn reader(&self) -> SessionStateReader {
        SessionStateReader {
            inner: self.inner.clone(),
        }
    }
}

/// Read-only view of the session state
#[derive(Debug, Clone)]
pub struct SessionStateReader {
    inner: Arc<AtomicU8>,
}

impl SessionStateReader {
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.inner.load(Ordering::Acquire))
    }
}
