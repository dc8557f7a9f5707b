//! Meeting registry
//!
//! Meetings live in memory until an access notices their TTL has elapsed.
//! There is no background timer here; [`MeetingRegistry::purge_expired`]
//! exists for callers that want a periodic sweep.

use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::millis;
use crate::error::AccessError;
use crate::ids;

/// A scheduled call with a fixed TTL and participant capacity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    /// Meeting identifier used by the admin API
    pub meeting_id: String,

    /// Room identifier, independent of the meeting id
    pub room: String,

    pub created_at: u64,

    /// Fixed at creation
    pub expires_at: u64,

    pub max_participants: u32,

    /// Successful HTTP admissions so far
    #[serde(skip)]
    pub joins: u32,
}

impl Meeting {
    /// A meeting is dead once `now` is strictly past its expiry
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }

    pub fn is_full(&self) -> bool {
        self.joins >= self.max_participants
    }
}

/// All live meetings by id
#[derive(Default)]
pub struct MeetingRegistry {
    meetings: DashMap<String, Meeting>,
}

impl MeetingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a meeting that expires `ttl` after `now`
    pub fn create(
        &self,
        now: u64,
        ttl: Duration,
        max_participants: u32,
    ) -> Result<Meeting, AccessError> {
        let meeting = Meeting {
            meeting_id: ids::meeting_id()?,
            room: ids::room_id()?,
            created_at: now,
            expires_at: now.saturating_add(millis(ttl)),
            max_participants,
            joins: 0,
        };

        self.meetings
            .insert(meeting.meeting_id.clone(), meeting.clone());

        info!(
            "Meeting created: {} (room {}, max {})",
            meeting.meeting_id, meeting.room, max_participants
        );
        Ok(meeting)
    }

    /// Look up a meeting, evicting it if its TTL has elapsed
    pub fn get(&self, id: &str, now: u64) -> Option<Meeting> {
        self.lookup(id, now).ok()
    }

    /// Like [`get`](Self::get) but tells absent and expired apart
    pub fn lookup(&self, id: &str, now: u64) -> Result<Meeting, AccessError> {
        let expired = match self.meetings.get(id) {
            Some(m) if !m.is_expired(now) => return Ok(m.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.evict(id, now);
            Err(AccessError::MeetingExpired)
        } else {
            Err(AccessError::MeetingNotFound)
        }
    }

    /// Consume one unit of capacity
    ///
    /// The capacity check and the increment happen under the entry's write
    /// lock, so concurrent joins for one meeting can never overshoot.
    pub fn record_join(&self, id: &str, now: u64) -> Result<Meeting, AccessError> {
        let mut entry = self
            .meetings
            .get_mut(id)
            .ok_or(AccessError::MeetingNotFound)?;

        if entry.is_expired(now) {
            drop(entry);
            self.evict(id, now);
            return Err(AccessError::MeetingExpired);
        }

        if entry.is_full() {
            debug!("Meeting {} is full ({} joins)", id, entry.joins);
            return Err(AccessError::CapacityExceeded);
        }

        entry.joins += 1;
        Ok(entry.clone())
    }

    /// Remove a meeting outright
    pub fn remove(&self, id: &str) -> Option<Meeting> {
        self.meetings.remove(id).map(|(_, m)| m)
    }

    /// Drop every meeting whose TTL has elapsed, returning how many went
    pub fn purge_expired(&self, now: u64) -> usize {
        let before = self.meetings.len();
        self.meetings.retain(|_, m| !m.is_expired(now));
        let purged = before.saturating_sub(self.meetings.len());
        if purged > 0 {
            info!("Purged {} expired meetings", purged);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    // Re-checks under the write lock so a meeting can't be evicted on a stale
    // read.
    fn evict(&self, id: &str, now: u64) {
        if self
            .meetings
            .remove_if(id, |_, m| m.is_expired(now))
            .is_some()
        {
            debug!("Meeting {} evicted (expired)", id);
        }
    }
}
