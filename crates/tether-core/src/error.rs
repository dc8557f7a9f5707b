//! Error types for meeting access

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a meeting or token could not be used
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("link expired or invalid")]
    TokenNotFound,

    #[error("meeting not found")]
    MeetingNotFound,

    #[error("meeting expired")]
    MeetingExpired,

    #[error("personal link expired")]
    WindowExpired,

    #[error("room is full")]
    CapacityExceeded,

    #[error("entropy source unavailable: {0}")]
    Entropy(getrandom::Error),
}

impl From<getrandom::Error> for AccessError {
    fn from(e: getrandom::Error) -> Self {
        AccessError::Entropy(e)
    }
}

/// WebSocket close codes sent before a peer is admitted
///
/// Clients branch on these: `TokenInvalid` and `WindowExpired` can be retried
/// with a fresh link, `MeetingExpired` cannot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    TokenInvalid = 4401,
    MeetingExpired = 4402,
    WindowExpired = 4403,
}

impl CloseCode {
    /// Close frame reason text
    pub fn reason(self) -> &'static str {
        match self {
            CloseCode::TokenInvalid => "token invalid",
            CloseCode::MeetingExpired => "meeting expired",
            CloseCode::WindowExpired => "token window expired",
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<&AccessError> for Option<CloseCode> {
    fn from(e: &AccessError) -> Self {
        match e {
            AccessError::TokenNotFound => Some(CloseCode::TokenInvalid),
            AccessError::MeetingNotFound | AccessError::MeetingExpired => {
                Some(CloseCode::MeetingExpired)
            }
            AccessError::WindowExpired => Some(CloseCode::WindowExpired),
            // The relay never checks capacity and entropy is not consulted
            // before admission.
            AccessError::CapacityExceeded | AccessError::Entropy(_) => None,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
