//! Configuration for Tether
//!
//! Loaded from an optional TOML file; the server binary layers command line
//! flags and environment variables on top.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::{DEFAULT_MAX_PARTICIPANTS, DEFAULT_PORT};

/// Default base URL for the jitsi hand-off
pub const DEFAULT_JITSI_BASE: &str = "https://meet.jit.si";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP/WebSocket server settings
    pub server: ServerConfig,
    /// Meeting access settings
    pub access: AccessConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind: IpAddr,
    /// Listen port
    pub port: u16,
    /// Base URL prefixed to invite links (empty gives relative links)
    pub public_url: String,
    /// Directory of static files served for unmatched paths
    pub public_dir: Option<PathBuf>,
    /// Where `/r/{token}` sends an admitted visitor
    pub handoff: Handoff,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            public_url: String::new(),
            public_dir: None,
            handoff: Handoff::default(),
        }
    }
}

/// Hand-off after a successful join
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Handoff {
    /// Redirect to the bundled call page, which opens the relay socket
    #[default]
    Signaling,
    /// Send the browser to an external Jitsi room named after the meeting room
    Jitsi {
        #[serde(default = "default_jitsi_base")]
        base_url: String,
    },
}

fn default_jitsi_base() -> String {
    DEFAULT_JITSI_BASE.to_string()
}

/// Access control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Participant capacity given to new meetings
    pub max_participants: u32,
    /// Bearer secret for the admin API; unset disables it
    pub admin_secret: Option<String>,
    /// Period of the expiry sweep; unset leaves eviction purely lazy
    pub sweep_interval_secs: Option<u64>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            admin_secret: None,
            sweep_interval_secs: None,
        }
    }
}

impl AccessConfig {
    /// The admin secret, treating an empty string as unset
    pub fn admin_secret(&self) -> Option<&str> {
        self.admin_secret.as_deref().filter(|s| !s.is_empty())
    }
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Render as a TOML file that `load_from` accepts
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
