//! Shared server state

use std::sync::Arc;

use tether_core::{AdmissionGate, Clock, Config, SystemClock, TOKEN_WINDOW};

use crate::room::Rooms;

/// Everything the handlers share, built once at startup
pub struct AppState {
    pub gate: AdmissionGate,
    pub rooms: Rooms,
    pub config: Config,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            gate: AdmissionGate::new(TOKEN_WINDOW),
            rooms: Rooms::new(),
            config,
            clock,
        })
    }

    /// State backed by the wall clock
    pub fn with_system_clock(config: Config) -> Arc<Self> {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn admin_secret(&self) -> Option<&str> {
        self.config.access.admin_secret()
    }
}
