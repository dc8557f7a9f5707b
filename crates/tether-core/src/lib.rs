//! Tether Core - meeting and invite token lifecycle
//!
//! An operator creates a meeting with a fixed TTL and capacity, then issues
//! invite tokens bound to it. A token's short activation window starts at
//! its first use. Everything is held in memory and expires lazily when an
//! access notices the deadline has passed.
//!
//! This crate has no networking code; `tether-signal` serves it over HTTP and
//! WebSocket.

pub mod admission;
pub mod clock;
pub mod config;
pub mod error;
pub mod ids;
pub mod meeting;
pub mod token;

use std::time::Duration;

pub use admission::{Admission, AdmissionGate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AccessConfig, Config, Handoff, ServerConfig};
pub use error::*;
pub use meeting::{Meeting, MeetingRegistry};
pub use token::{Token, TokenRegistry, Validation};

/// How long a token stays usable after its first use (5 minutes)
pub const TOKEN_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Lifetime of a meeting from creation (2 hours)
pub const MEETING_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Participant capacity when none is configured
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 3;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;
