//! Exchange ActiveSync client - handshake engine
//!
//! Brings an ActiveSync session from nothing to "ready to sync": discovers
//! the server, negotiates a protocol version, provisions a policy key and
//! runs the initial FolderSync.
//!
//! ## Module Organization
//!
//! - `sync/`: Handshake engine, session state, capability negotiation
//! - `backend/`: Transport contract and the HTTP implementation
//! - `config/`: Configuration loading
//! - `types/`: Step results and error types

pub mod backend;
pub mod config;
pub mod sync;
pub mod types;

pub use backend::{HttpErrorHandler, HttpTransport, Transport};
pub use config::EngineConfig;
pub use sync::capability::{negotiate, ServerCapabilities, PROTOCOL_PREFERENCE_ORDER};
pub use sync::engine::{HandshakeEngine, HandshakeEvent, HandshakeOutcome, HandshakePhase};
pub use sync::state::{SessionState, SessionStateReader};
pub use types::error::{EngineError, Result};
pub use types::{StatusCode, StepResult};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How often the session state is logged
const STATE_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Load the account, run one handshake and wait for it to end
pub async fn run(config_path: Option<&Path>) -> Result<HandshakeOutcome> {
    let config = match config_path {
        Some(path) => config::load_config_from_path(path)?,
        None => config::load_config()?,
    };

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    info!(
        "Starting eas-client for {} (device {})",
        transport.server_url(),
        transport.device_id()
    );

    let (engine, events) = HandshakeEngine::new(transport);
    let state = engine.state_reader();
    let mut handle = engine.start()?;
    let mut ticker = tokio::time::interval(STATE_LOG_INTERVAL);

    loop {
        tokio::select! {
            outcome = &mut handle => {
                return outcome.map_err(|e| EngineError::Other(format!("Handshake task failed: {}", e)));
            }
            Ok(event) = events.recv_async() => {
                debug!("Event: {:?}", event);
            }
            _ = ticker.tick() => {
                debug!("State: {}", state.get());
            }
        }
    }
}
