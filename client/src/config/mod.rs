use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::error::{EngineError, Result};

/// Default max age of discovered capabilities, in seconds
pub const DEFAULT_DISCOVERY_STALENESS_SECS: u64 = 4 * 60;
/// Largest accepted staleness threshold (one day)
pub const MAX_DISCOVERY_STALENESS_SECS: u64 = 24 * 60 * 60;

/// Account configuration for one ActiveSync server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `https` or `http`
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Server hostname, optionally with a port
    pub host: String,

    pub username: String,

    pub password: String,

    /// ActiveSync (or Active Directory) domain
    #[serde(default)]
    pub domain: Option<String>,

    /// Device identifier sent with every command (generated when missing)
    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default = "default_device_type")]
    pub device_type: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Capabilities older than this are rediscovered
    #[serde(default = "default_discovery_staleness_secs")]
    pub discovery_staleness_secs: u64,

    /// Honor HTTP(S)_PROXY from the environment
    #[serde(default = "default_true")]
    pub system_proxy: bool,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_device_type() -> String {
    "EasClient".to_string()
}

fn default_user_agent() -> String {
    format!("eas-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_discovery_staleness_secs() -> u64 {
    DEFAULT_DISCOVERY_STALENESS_SECS
}

fn default_true() -> bool {
    true
}

/// Sample printed when no configuration can be found
pub const SAMPLE_CONFIG: &str = r#"{
   "protocol" : "https",
   "host" : "server_hostname_here",
   "username" : "username_here",
   "password" : "password_here",
   "domain": "domain_name_here"
}"#;

/// Get default config paths
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config.json")];

    // XDG config path
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("eas-client").join("config.json"));
        paths.push(config_dir.join("eas-client").join("config.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(
            home_dir
                .join(".config")
                .join("eas-client")
                .join("config.toml"),
        );
    }

    paths
}

/// Load configuration from the first default path that exists
pub fn load_config() -> Result<EngineConfig> {
    for path in default_config_paths() {
        if path.exists() {
            info!("Found config at: {:?}", path);
            return load_config_from_path(&path);
        }
    }

    Err(EngineError::ConfigNotFound)
}

/// Load configuration from a specific path
///
/// `.toml` files are parsed as TOML, anything else as JSON.
pub fn load_config_from_path(path: &Path) -> Result<EngineConfig> {
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("Failed to read config: {}", e)))?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let config: EngineConfig = if is_toml {
        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?
    } else {
        serde_json::from_str(&content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?
    };

    config.validate()?;
    Ok(config)
}

impl EngineConfig {
    /// Reject configs the transport cannot be built from
    ///
    /// Empty credentials are not rejected here: they surface as a
    /// `UserFixRequired` step result during the handshake.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(EngineError::Config("host must not be empty".to_string()));
        }
        if self.protocol != "https" && self.protocol != "http" {
            return Err(EngineError::Config(format!(
                "unsupported protocol: {}",
                self.protocol
            )));
        }
        if self.discovery_staleness_secs > MAX_DISCOVERY_STALENESS_SECS {
            return Err(EngineError::Config(format!(
                "discovery_staleness_secs must be at most {}",
                MAX_DISCOVERY_STALENESS_SECS
            )));
        }
        Ok(())
    }
}
