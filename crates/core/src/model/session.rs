use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{SessionId, SubjectId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("unknown session kind: {0}")]
    UnknownKind(String),

    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("session has an end time but is not completed")]
    EndedWithoutCompletion,
}

//
// ─── SESSION KIND ─────────────────────────────────────────────────────────────
//

/// Whether a session is practice or counts toward the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Training,
    Real,
}

impl SessionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Training => "training",
            SessionKind::Real => "real",
        }
    }

    /// Parse a stored or client-supplied session tag (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownKind` for anything other than `training` or `real`.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "training" => Ok(Self::Training),
            "real" => Ok(Self::Real),
            _ => Err(SessionError::UnknownKind(raw.to_owned())),
        }
    }

    #[must_use]
    pub fn is_training(self) -> bool {
        matches!(self, SessionKind::Training)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Progress state of a session.
///
/// `Complete` is terminal: nothing moves a session back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active { last_seen: u32 },
    Complete,
}

/// One ordered sequence of images assigned to a subject.
///
/// The completion flag only moves `false -> true` and `last_seen_position`
/// never decreases; both invariants are enforced by the mutators below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    subject_id: SubjectId,
    kind: SessionKind,
    is_completed: bool,
    last_seen_position: u32,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A fresh, active session with no progress.
    #[must_use]
    pub fn start(
        id: SessionId,
        subject_id: SubjectId,
        kind: SessionKind,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject_id,
            kind,
            is_completed: false,
            last_seen_position: 0,
            started_at,
            ended_at: None,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the timestamps or completion flag are inconsistent.
    pub fn from_persisted(
        id: SessionId,
        subject_id: SubjectId,
        kind: SessionKind,
        is_completed: bool,
        last_seen_position: u32,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionError> {
        if let Some(ended) = ended_at {
            if !is_completed {
                return Err(SessionError::EndedWithoutCompletion);
            }
            if ended < started_at {
                return Err(SessionError::InvalidTimeRange);
            }
        }

        Ok(Self {
            id,
            subject_id,
            kind,
            is_completed,
            last_seen_position,
            started_at,
            ended_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn last_seen_position(&self) -> u32 {
        self.last_seen_position
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.is_completed {
            SessionState::Complete
        } else {
            SessionState::Active {
                last_seen: self.last_seen_position,
            }
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, subject_id: SubjectId) -> bool {
        self.subject_id == subject_id
    }

    /// Move the cursor to `position` if it is ahead of the current one.
    ///
    /// Returns `true` when the cursor moved.
    pub fn advance_to(&mut self, position: u32) -> bool {
        if position > self.last_seen_position {
            self.last_seen_position = position;
            true
        } else {
            false
        }
    }

    /// Flip the completion flag and stamp the end time.
    ///
    /// Returns `true` only for the first call; later calls keep the original end time.
    pub fn mark_complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_completed {
            return false;
        }
        self.is_completed = true;
        self.ended_at = Some(at.max(self.started_at));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn session() -> Session {
        Session::start(
            SessionId::new(1),
            SubjectId::new(2),
            SessionKind::Real,
            fixed_now(),
        )
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(SessionKind::parse("Training").unwrap(), SessionKind::Training);
        assert_eq!(SessionKind::parse(" real ").unwrap(), SessionKind::Real);
        assert!(matches!(
            SessionKind::parse("block1"),
            Err(SessionError::UnknownKind(_))
        ));
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut s = session();
        assert!(s.advance_to(5));
        assert!(!s.advance_to(2));
        assert!(!s.advance_to(5));
        assert_eq!(s.last_seen_position(), 5);
        assert_eq!(s.state(), SessionState::Active { last_seen: 5 });
    }

    #[test]
    fn completion_is_sticky() {
        let mut s = session();
        let first = fixed_now() + Duration::minutes(3);
        assert!(s.mark_complete(first));
        assert!(!s.mark_complete(first + Duration::minutes(1)));
        assert_eq!(s.ended_at(), Some(first));
        assert_eq!(s.state(), SessionState::Complete);
    }

    #[test]
    fn persisted_end_time_requires_completion() {
        let err = Session::from_persisted(
            SessionId::new(1),
            SubjectId::new(1),
            SessionKind::Training,
            false,
            0,
            fixed_now(),
            Some(fixed_now()),
        )
        .unwrap_err();
        assert_eq!(err, SessionError::EndedWithoutCompletion);
    }
}
