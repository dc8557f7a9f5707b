//! Invite tokens
//!
//! A token is bound to one meeting at issuance but carries no expiry until it
//! is first validated. The first successful validation opens the activation
//! window; later validations only read it. Distribution delay between
//! issuance and first click therefore never eats into the window.

use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::clock::millis;
use crate::error::AccessError;
use crate::ids;
use crate::meeting::{Meeting, MeetingRegistry};

/// An invite credential
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub value: String,

    /// Meeting this token admits to
    pub meeting_id: String,

    /// Set once, on first successful validation
    pub first_seen_at: Option<u64>,

    /// `first_seen_at + window`, set together with it
    pub expires_at: Option<u64>,
}

impl Token {
    fn new(value: String, meeting_id: String) -> Self {
        Self {
            value,
            meeting_id,
            first_seen_at: None,
            expires_at: None,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.first_seen_at.is_some()
    }

    /// Open the window if this is the first use. Never moves an existing one.
    fn activate(&mut self, now: u64, window: Duration) -> u64 {
        match self.expires_at {
            Some(expires_at) => expires_at,
            None => {
                let expires_at = now.saturating_add(millis(window));
                self.first_seen_at = Some(now);
                self.expires_at = Some(expires_at);
                expires_at
            }
        }
    }
}

/// Outcome of [`TokenRegistry::validate`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    Valid { token: Token, meeting: Meeting },
    NotFound,
    MeetingExpired,
    WindowExpired,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid { .. })
    }

    pub fn into_result(self) -> Result<(Token, Meeting), AccessError> {
        match self {
            Validation::Valid { token, meeting } => Ok((token, meeting)),
            Validation::NotFound => Err(AccessError::TokenNotFound),
            Validation::MeetingExpired => Err(AccessError::MeetingExpired),
            Validation::WindowExpired => Err(AccessError::WindowExpired),
        }
    }
}

/// All outstanding tokens by value
pub struct TokenRegistry {
    tokens: DashMap<String, Token>,
    window: Duration,
}

impl TokenRegistry {
    /// Create a registry whose tokens stay usable for `window` after first use
    pub fn new(window: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            window,
        }
    }

    /// Issue a token for a live meeting
    pub fn issue(
        &self,
        meetings: &MeetingRegistry,
        meeting_id: &str,
        now: u64,
    ) -> Result<(Token, Meeting), AccessError> {
        let meeting = meetings.lookup(meeting_id, now)?;
        let token = Token::new(ids::token()?, meeting.meeting_id.clone());

        self.tokens.insert(token.value.clone(), token.clone());

        info!("Token issued for meeting {}", meeting.meeting_id);
        Ok((token, meeting))
    }

    /// Validate a token, activating it on first use
    ///
    /// Checks run in order: token lookup, meeting lookup, meeting TTL, then
    /// window activation and check. Meeting and window failures evict the
    /// stale records.
    pub fn validate(&self, meetings: &MeetingRegistry, value: &str, now: u64) -> Validation {
        let meeting_id = match self.tokens.get(value) {
            Some(t) => t.meeting_id.clone(),
            None => return Validation::NotFound,
        };

        // `lookup` evicts the meeting itself when its TTL has elapsed.
        let meeting = match meetings.lookup(&meeting_id, now) {
            Ok(m) => m,
            Err(_) => {
                self.tokens.remove(value);
                debug!("Token for meeting {} evicted (meeting gone)", meeting_id);
                return Validation::MeetingExpired;
            }
        };

        // Activation and the window check share the entry lock, so two
        // concurrent first uses open exactly one window.
        let token = {
            let Some(mut entry) = self.tokens.get_mut(value) else {
                return Validation::NotFound;
            };
            let expires_at = entry.activate(now, self.window);
            if now > expires_at {
                None
            } else {
                Some(entry.clone())
            }
        };

        match token {
            Some(token) => Validation::Valid { token, meeting },
            None => {
                self.tokens.remove(value);
                debug!("Token for meeting {} evicted (window expired)", meeting_id);
                Validation::WindowExpired
            }
        }
    }

    pub fn get(&self, value: &str) -> Option<Token> {
        self.tokens.get(value).map(|t| t.clone())
    }

    /// Drop tokens whose window lapsed or whose meeting is gone
    pub fn purge_expired(&self, meetings: &MeetingRegistry, now: u64) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| {
            let window_open = t.expires_at.map_or(true, |e| now <= e);
            window_open && meetings.get(&t.meeting_id, now).is_some()
        });
        let purged = before.saturating_sub(self.tokens.len());
        if purged > 0 {
            info!("Purged {} expired tokens", purged);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(2 * 60 * 60);
    const WINDOW: Duration = Duration::from_secs(5 * 60);
    const MINUTE: u64 = 60_000;

    fn setup() -> (MeetingRegistry, TokenRegistry, Meeting) {
        let meetings = MeetingRegistry::new();
        let tokens = TokenRegistry::new(WINDOW);
        let meeting = meetings.create(0, TTL, 3).unwrap();
        (meetings, tokens, meeting)
    }

    #[test]
    fn test_issue_has_no_expiry() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        assert_eq!(token.meeting_id, meeting.meeting_id);
        assert!(!token.is_activated());
        assert_eq!(token.expires_at, None);
    }

    #[test]
    fn test_issue_unknown_or_expired_meeting() {
        let (meetings, tokens, meeting) = setup();

        assert_eq!(
            tokens.issue(&meetings, "missing", 0).unwrap_err(),
            AccessError::MeetingNotFound
        );
        assert_eq!(
            tokens
                .issue(&meetings, &meeting.meeting_id, meeting.expires_at + 1)
                .unwrap_err(),
            AccessError::MeetingExpired
        );
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_activation_is_lazy() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        // First click an hour after issuance still gets a full window.
        let first_use = 60 * MINUTE;
        match tokens.validate(&meetings, &token.value, first_use) {
            Validation::Valid { token, .. } => {
                assert_eq!(token.first_seen_at, Some(first_use));
                assert_eq!(token.expires_at, Some(first_use + 5 * MINUTE));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_activation_is_idempotent() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        let t = 10 * MINUTE;
        let first = tokens.validate(&meetings, &token.value, t).into_result().unwrap().0;
        let second = tokens
            .validate(&meetings, &token.value, t + 4 * MINUTE)
            .into_result()
            .unwrap()
            .0;

        assert_eq!(first.expires_at, second.expires_at);
        assert_eq!(first.first_seen_at, second.first_seen_at);
    }

    #[test]
    fn test_window_expired() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        let t = 10 * MINUTE;
        assert!(tokens.validate(&meetings, &token.value, t).is_valid());
        assert_eq!(
            tokens.validate(&meetings, &token.value, t + 6 * MINUTE),
            Validation::WindowExpired
        );

        // The stale token is gone; the meeting is untouched.
        assert_eq!(
            tokens.validate(&meetings, &token.value, t + 6 * MINUTE),
            Validation::NotFound
        );
        assert!(meetings.get(&meeting.meeting_id, t + 6 * MINUTE).is_some());
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        assert!(tokens.validate(&meetings, &token.value, 0).is_valid());
        assert!(tokens.validate(&meetings, &token.value, 5 * MINUTE).is_valid());
        assert_eq!(
            tokens.validate(&meetings, &token.value, 5 * MINUTE + 1),
            Validation::WindowExpired
        );
    }

    #[test]
    fn test_meeting_expired_before_first_use() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        let late = meeting.expires_at + 1;
        assert_eq!(
            tokens.validate(&meetings, &token.value, late),
            Validation::MeetingExpired
        );

        // Both records were evicted.
        assert!(tokens.get(&token.value).is_none());
        assert_eq!(
            meetings.lookup(&meeting.meeting_id, late),
            Err(AccessError::MeetingNotFound)
        );
    }

    #[test]
    fn test_meeting_removed_evicts_token() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();
        meetings.remove(&meeting.meeting_id);

        assert_eq!(
            tokens.validate(&meetings, &token.value, 1),
            Validation::MeetingExpired
        );
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_meeting_ttl_applies_inside_window() {
        let (meetings, tokens, meeting) = setup();
        let (token, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        // Activated two minutes before the meeting ends.
        let t = meeting.expires_at - 2 * MINUTE;
        assert!(tokens.validate(&meetings, &token.value, t).is_valid());
        assert_eq!(
            tokens.validate(&meetings, &token.value, t + 3 * MINUTE),
            Validation::MeetingExpired
        );
    }

    #[test]
    fn test_purge_expired() {
        let (meetings, tokens, meeting) = setup();
        let (used, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();
        let (fresh, _) = tokens.issue(&meetings, &meeting.meeting_id, 0).unwrap();

        assert!(tokens.validate(&meetings, &used.value, 0).is_valid());
        assert_eq!(tokens.purge_expired(&meetings, 6 * MINUTE), 1);
        assert!(tokens.get(&fresh.value).is_some());

        assert_eq!(tokens.purge_expired(&meetings, meeting.expires_at + 1), 1);
        assert!(tokens.is_empty());
    }
}
