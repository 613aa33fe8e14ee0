//! ActiveSync Server Capability Negotiation
//!
//! Picks the protocol version client and server can both speak:
//! - The client carries a fixed preference order, newest first
//! - The server advertises its versions in the OPTIONS response headers
//! - The first client-preferred version the server supports wins

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::types::StepResult;

/// Header carrying the comma-separated list of supported protocol versions
pub const HEADER_PROTOCOL_VERSIONS: &str = "ms-asprotocolversions";
/// Header carrying the comma-separated list of supported commands
pub const HEADER_PROTOCOL_COMMANDS: &str = "ms-asprotocolcommands";
/// Header carrying the server protocol revision, e.g. `14.3`
pub const HEADER_SERVER_ACTIVESYNC: &str = "ms-server-activesync";
/// Header carrying the server software, e.g. `Microsoft-IIS/7.5`
pub const HEADER_SERVER: &str = "server";

/// Protocol versions the client accepts, most preferred first
pub const PROTOCOL_PREFERENCE_ORDER: [&str; 5] = ["14.1", "14.0", "12.1", "12.0", "2.5"];

/// Server generation behind a protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerGeneration {
    ExchangeServer2010Sp1,
    ExchangeServer2010,
    ExchangeServer2007Sp1,
    ExchangeServer2007,
    ExchangeServer2003Sp2,
}

impl ServerGeneration {
    /// Map a protocol version token to the Exchange release that introduced it
    pub fn from_version(version: &str) -> Option<Self> {
        match version {
            "14.1" => Some(Self::ExchangeServer2010Sp1),
            "14.0" => Some(Self::ExchangeServer2010),
            "12.1" => Some(Self::ExchangeServer2007Sp1),
            "12.0" => Some(Self::ExchangeServer2007),
            "2.5" => Some(Self::ExchangeServer2003Sp2),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ExchangeServer2010Sp1 => "Exchange Server 2010 SP1",
            Self::ExchangeServer2010 => "Exchange Server 2010",
            Self::ExchangeServer2007Sp1 => "Exchange Server 2007 SP1",
            Self::ExchangeServer2007 => "Exchange Server 2007",
            Self::ExchangeServer2003Sp2 => "Exchange Server 2003 SP2",
        }
    }
}

/// Facts learned from the last successful OPTIONS request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Protocol versions the server supports, e.g. `2.5,12.0,12.1,14.0,14.1`
    pub supported_versions: Vec<String>,

    /// Commands the server supports, e.g. `Sync,SendMail,SmartForward,...`
    pub supported_commands: Vec<String>,

    /// Server protocol revision
    pub server_protocol: Option<String>,

    /// Server software identifier
    pub server_software: Option<String>,

    /// When the discovery succeeded
    pub discovered_at: DateTime<Utc>,
}

impl ServerCapabilities {
    /// Build capabilities from OPTIONS response headers
    ///
    /// Header names are matched case-insensitively by `HeaderMap`; missing
    /// list headers yield empty lists, which later fails negotiation.
    pub fn from_headers(headers: &HeaderMap, discovered_at: DateTime<Utc>) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
        };

        Self {
            supported_versions: text(HEADER_PROTOCOL_VERSIONS)
                .map(|s| split_token_list(&s))
                .unwrap_or_default(),
            supported_commands: text(HEADER_PROTOCOL_COMMANDS)
                .map(|s| split_token_list(&s))
                .unwrap_or_default(),
            server_protocol: text(HEADER_SERVER_ACTIVESYNC),
            server_software: text(HEADER_SERVER),
            discovered_at,
        }
    }

    /// Whether the server advertises a command, e.g. `Provision`
    pub fn supports_command(&self, command: &str) -> bool {
        self.supported_commands.iter().any(|c| c == command)
    }
}

/// Split a comma-separated header value into trimmed, non-empty tokens
pub fn split_token_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Choose the most preferred protocol version the server supports
///
/// Server order is irrelevant; client preference strictly dominates. On no
/// match the error carries `AdminFixRequired`.
pub fn negotiate<S: AsRef<str>>(server_versions: &[S]) -> Result<&'static str, StepResult> {
    let chosen = PROTOCOL_PREFERENCE_ORDER.iter().copied().find(|preferred| {
        server_versions
            .iter()
            .any(|v| v.as_ref().trim() == *preferred)
    });

    match chosen {
        Some(version) => {
            debug!("Negotiated protocol version {}", version);
            Ok(version)
        }
        None => {
            let advertised: Vec<&str> = server_versions.iter().map(|v| v.as_ref()).collect();
            error!(
                "Could not find a match in the server protocols: {}",
                advertised.join(",")
            );
            Err(StepResult::admin_fix("no compatible protocol version"))
        }
    }
}
