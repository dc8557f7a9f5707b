//! Admission gate
//!
//! Runs the full join check for an invite link: token lookup, meeting lookup,
//! meeting TTL, token window, then capacity. Each step short-circuits with its
//! own [`AccessError`].

use std::time::Duration;

use tracing::info;

use crate::error::AccessError;
use crate::meeting::{Meeting, MeetingRegistry};
use crate::token::{Token, TokenRegistry};

/// Proof that a token passed the gate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admission {
    pub token: String,
    pub meeting_id: String,
    pub room: String,
    /// Join count after this admission (unchanged by [`AdmissionGate::check`])
    pub joins: u32,
    /// End of the token's activation window
    pub token_expires_at: u64,
}

impl Admission {
    fn new(token: &Token, meeting: &Meeting) -> Self {
        Self {
            token: token.value.clone(),
            meeting_id: meeting.meeting_id.clone(),
            room: meeting.room.clone(),
            joins: meeting.joins,
            token_expires_at: token.expires_at.unwrap_or(meeting.expires_at),
        }
    }
}

/// Owns the meeting and token registries
pub struct AdmissionGate {
    meetings: MeetingRegistry,
    tokens: TokenRegistry,
}

impl AdmissionGate {
    pub fn new(token_window: Duration) -> Self {
        Self {
            meetings: MeetingRegistry::new(),
            tokens: TokenRegistry::new(token_window),
        }
    }

    pub fn meetings(&self) -> &MeetingRegistry {
        &self.meetings
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Issue an invite token for a live meeting
    pub fn invite(&self, meeting_id: &str, now: u64) -> Result<(Token, Meeting), AccessError> {
        self.tokens.issue(&self.meetings, meeting_id, now)
    }

    /// Validate the token and consume one unit of meeting capacity
    pub fn admit(&self, token: &str, now: u64) -> Result<Admission, AccessError> {
        let (token, _) = self.tokens.validate(&self.meetings, token, now).into_result()?;
        let meeting = self.join_validated(&token.meeting_id, now)?;

        info!(
            "Admitted to meeting {} ({}/{})",
            meeting.meeting_id, meeting.joins, meeting.max_participants
        );
        Ok(Admission::new(&token, &meeting))
    }

    /// Count a join for a meeting that just passed validation
    ///
    /// The meeting can be removed or swept in between; that surfaces as an
    /// expired meeting, never as an unknown one.
    fn join_validated(&self, meeting_id: &str, now: u64) -> Result<Meeting, AccessError> {
        self.meetings
            .record_join(meeting_id, now)
            .map_err(|e| match e {
                AccessError::MeetingNotFound => AccessError::MeetingExpired,
                e => e,
            })
    }

    /// Validate the token without touching capacity
    ///
    /// Used by the relay: a connection is admitted on token validity alone,
    /// so it can outnumber the HTTP join counter.
    pub fn check(&self, token: &str, now: u64) -> Result<Admission, AccessError> {
        let (token, meeting) = self.tokens.validate(&self.meetings, token, now).into_result()?;
        Ok(Admission::new(&token, &meeting))
    }

    /// Purge expired meetings, then tokens left without a live meeting
    pub fn sweep(&self, now: u64) -> (usize, usize) {
        let meetings = self.meetings.purge_expired(now);
        let tokens = self.tokens.purge_expired(&self.meetings, now);
        (meetings, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(2 * 60 * 60);
    const WINDOW: Duration = Duration::from_secs(5 * 60);

    fn gate_with_meeting(max: u32) -> (AdmissionGate, Meeting) {
        let gate = AdmissionGate::new(WINDOW);
        let meeting = gate.meetings().create(0, TTL, max).unwrap();
        (gate, meeting)
    }

    #[test]
    fn test_fourth_admission_is_rejected() {
        let (gate, meeting) = gate_with_meeting(3);

        for expected in 1..=3 {
            let (token, _) = gate.invite(&meeting.meeting_id, 0).unwrap();
            let admission = gate.admit(&token.value, 1).unwrap();
            assert_eq!(admission.joins, expected);
            assert_eq!(admission.room, meeting.room);
        }

        let (fourth, _) = gate.invite(&meeting.meeting_id, 0).unwrap();
        assert_eq!(
            gate.admit(&fourth.value, 1).unwrap_err(),
            AccessError::CapacityExceeded
        );
        assert_eq!(gate.meetings().get(&meeting.meeting_id, 1).unwrap().joins, 3);

        // A full meeting keeps the rejected token activated and in place.
        assert!(gate.tokens().get(&fourth.value).unwrap().is_activated());
    }

    #[test]
    fn test_admission_error_order() {
        let (gate, meeting) = gate_with_meeting(1);

        assert_eq!(gate.admit("nope", 0).unwrap_err(), AccessError::TokenNotFound);

        let (token, _) = gate.invite(&meeting.meeting_id, 0).unwrap();
        assert_eq!(
            gate.admit(&token.value, meeting.expires_at + 1).unwrap_err(),
            AccessError::MeetingExpired
        );
        assert!(gate.meetings().is_empty());
    }

    #[test]
    fn test_meeting_removed_after_validation_reads_as_expired() {
        let (gate, meeting) = gate_with_meeting(3);
        let (token, _) = gate.invite(&meeting.meeting_id, 0).unwrap();

        gate.check(&token.value, 1).unwrap();
        gate.meetings().remove(&meeting.meeting_id);
        assert_eq!(
            gate.join_validated(&meeting.meeting_id, 1).unwrap_err(),
            AccessError::MeetingExpired
        );
    }

    #[test]
    fn test_window_expired_admission() {
        let (gate, meeting) = gate_with_meeting(3);
        let (token, _) = gate.invite(&meeting.meeting_id, 0).unwrap();

        gate.admit(&token.value, 1_000).unwrap();
        assert_eq!(
            gate.admit(&token.value, 1_000 + 6 * 60_000).unwrap_err(),
            AccessError::WindowExpired
        );
    }

    #[test]
    fn test_check_does_not_consume_capacity() {
        let (gate, meeting) = gate_with_meeting(1);
        let (token, _) = gate.invite(&meeting.meeting_id, 0).unwrap();

        gate.admit(&token.value, 1).unwrap();
        assert_eq!(
            gate.admit(&token.value, 2).unwrap_err(),
            AccessError::CapacityExceeded
        );

        // The relay check still passes on a full meeting.
        let admission = gate.check(&token.value, 3).unwrap();
        assert_eq!(admission.meeting_id, meeting.meeting_id);
        assert_eq!(admission.joins, 1);
        assert_eq!(admission.token_expires_at, 1 + WINDOW.as_millis() as u64);
    }

    #[test]
    fn test_sweep() {
        let (gate, meeting) = gate_with_meeting(3);
        gate.invite(&meeting.meeting_id, 0).unwrap();

        assert_eq!(gate.sweep(1), (0, 0));
        assert_eq!(gate.sweep(meeting.expires_at + 1), (1, 1));
    }
}
