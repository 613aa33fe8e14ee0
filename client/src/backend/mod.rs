//! ActiveSync transport
//!
//! The handshake engine talks to the server only through the [`Transport`]
//! trait. [`HttpTransport`] is the production implementation; tests plug in
//! scripted transports.

mod credentials;
mod http;

pub use credentials::*;
pub use http::*;

use async_trait::async_trait;

use crate::types::StepResult;

/// Path segment every ActiveSync server answers on
pub const ACTIVESYNC_PATH: &str = "Microsoft-Server-ActiveSync";

/// Build the server url, `{protocol}://{host}/Microsoft-Server-ActiveSync`
pub fn build_server_url(protocol: &str, host: &str) -> String {
    format!("{}://{}/{}", protocol, host, ACTIVESYNC_PATH)
}

/// Receives non-2xx responses seen while discovering the server
pub trait HttpErrorHandler: Send + Sync {
    fn handle_http_error(&self, status: u16, message: &str) -> StepResult;
}

/// Session collaborator driven by the handshake engine
///
/// Every `perform_*` method returns exactly one [`StepResult`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// True when capabilities were never discovered or are too old
    fn is_discovery_stale(&self) -> bool;

    /// True when a policy key is held
    fn is_authorization_valid(&self) -> bool;

    /// OPTIONS round-trip plus protocol negotiation
    async fn perform_discovery(&self, on_http_error: &dyn HttpErrorHandler) -> StepResult;

    /// Provision round-trip, obtains the policy key
    async fn perform_authorization(&self) -> StepResult;

    /// Initial FolderSync
    async fn perform_initial_sync(&self) -> StepResult;

    /// Drop the HTTP session, forcing a new one on next use
    fn invalidate_session(&self);

    fn invalidate_policy_key(&self);
}
