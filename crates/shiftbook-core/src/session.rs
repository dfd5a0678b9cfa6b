//! # Session Lifecycle
//!
//! State transitions for [`Session`]. Writes to stage records are only legal
//! while a session is `IN_PROGRESS`; the terminal statuses never change again.
//!
//! ```text
//!                 ┌──────────────┐
//!   initialize ──►│ IN_PROGRESS  │
//!                 └──────┬───────┘
//!            commit ok   │   commit fails / rollback
//!          ┌─────────────┴──────────────┐
//!          ▼                            ▼
//!   ┌──────────────┐             ┌──────────────┐
//!   │  COMPLETED   │             │ ROLLED_BACK  │
//!   └──────────────┘             └──────────────┘
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{Session, SessionStatus};
use crate::validation::truncate_chars;
use crate::MAX_VALIDATION_ERROR_LEN;

impl SessionStatus {
    /// COMPLETED and ROLLED_BACK accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }

    /// Whether `self → next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::InProgress, SessionStatus::Completed)
                | (SessionStatus::InProgress, SessionStatus::RolledBack)
        )
    }
}

impl Session {
    /// Opens a new IN_PROGRESS session.
    pub fn start(
        bar_id: &str,
        shift_type: Option<&str>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            bar_id: bar_id.to_string(),
            started_at: now,
            ended_at: None,
            status: SessionStatus::InProgress,
            shift_type: shift_type.map(str::to_string),
            notes: notes.map(str::to_string),
            validation_errors: None,
        }
    }

    /// Fails with `InvalidState` unless the session is IN_PROGRESS.
    pub fn require_in_progress(&self) -> CoreResult<()> {
        if self.status != SessionStatus::InProgress {
            return Err(CoreError::InvalidState {
                session_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// IN_PROGRESS → COMPLETED.
    pub fn complete(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.require_in_progress()?;
        self.status = SessionStatus::Completed;
        self.ended_at = Some(now);
        Ok(())
    }

    /// Records why the session was abandoned.
    ///
    /// From IN_PROGRESS this moves to ROLLED_BACK and stamps the end time.
    /// On a session that is already terminal only the reason is replaced;
    /// status and end time stay as they were.
    pub fn roll_back(&mut self, reason: &str, now: DateTime<Utc>) {
        if self.status.can_transition_to(SessionStatus::RolledBack) {
            self.status = SessionStatus::RolledBack;
            self.ended_at = Some(now);
        }
        self.validation_errors = Some(truncate_chars(reason, MAX_VALIDATION_ERROR_LEN));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::start("B1", Some("EVENING"), None, Utc::now())
    }

    #[test]
    fn test_start_is_in_progress() {
        let s = session();
        assert_eq!(s.status, SessionStatus::InProgress);
        assert!(s.ended_at.is_none());
        assert!(s.require_in_progress().is_ok());
    }

    #[test]
    fn test_complete_sets_end_time() {
        let mut s = session();
        s.complete(Utc::now()).unwrap();
        assert_eq!(s.status, SessionStatus::Completed);
        assert!(s.ended_at.is_some());
    }

    #[test]
    fn test_complete_twice_is_invalid_state() {
        let mut s = session();
        s.complete(Utc::now()).unwrap();
        assert!(matches!(
            s.complete(Utc::now()),
            Err(CoreError::InvalidState { status: SessionStatus::Completed, .. })
        ));
    }

    #[test]
    fn test_roll_back_truncates_reason() {
        let mut s = session();
        s.roll_back(&"x".repeat(1500), Utc::now());
        assert_eq!(s.status, SessionStatus::RolledBack);
        assert_eq!(s.validation_errors.as_deref().map(str::len), Some(1000));
    }

    #[test]
    fn test_roll_back_terminal_only_replaces_reason() {
        let mut s = session();
        s.roll_back("first", Utc::now());
        let ended = s.ended_at;
        s.roll_back("second", Utc::now());
        assert_eq!(s.validation_errors.as_deref(), Some("second"));
        assert_eq!(s.ended_at, ended);

        let mut done = session();
        done.complete(Utc::now()).unwrap();
        done.roll_back("late", Utc::now());
        assert_eq!(done.status, SessionStatus::Completed);
    }

    #[test]
    fn test_no_edges_out_of_terminal_states() {
        for terminal in [SessionStatus::Completed, SessionStatus::RolledBack] {
            assert!(terminal.is_terminal());
            for next in [
                SessionStatus::InProgress,
                SessionStatus::Completed,
                SessionStatus::RolledBack,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
