use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game_type::ParseError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    InProgress,
    Paused,
    Finished,
    Deleted,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Start,
    /// A round was appended, replaced or removed.
    LedgerChanged,
    Pause,
    Resume,
    Finish,
    /// Statistics were folded, the ledger may be purged.
    Archive,
    Discard,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot apply {event:?} to a session that is {from}")]
pub struct TransitionError {
    pub from: SessionState,
    pub event: LifecycleEvent,
}

impl SessionState {
    /// Pure transition function of the session lifecycle.
    pub fn apply(self, event: LifecycleEvent) -> Result<SessionState, TransitionError> {
        use LifecycleEvent::*;
        use SessionState::*;

        let next = match (self, event) {
            (Deleted, _) => None,
            (_, Discard) => Some(Deleted),
            (Created, Start | LedgerChanged) => Some(InProgress),
            (InProgress, Start | LedgerChanged) => Some(InProgress),
            (InProgress, Pause) => Some(Paused),
            (Paused, Resume) => Some(InProgress),
            (InProgress, Finish) => Some(Finished),
            (Finished, Archive) => Some(Deleted),
            _ => None,
        };
        next.ok_or_else(|| {
            log::debug!("Rejected lifecycle event {event:?} in state {self}");
            TransitionError { from: self, event }
        })
    }

    pub fn is_finished(self) -> bool {
        self == SessionState::Finished
    }

    /// Whether rounds may still be appended or removed.
    pub fn accepts_rounds(self) -> bool {
        matches!(self, SessionState::Created | SessionState::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::InProgress => "in_progress",
            SessionState::Paused => "paused",
            SessionState::Finished => "finished",
            SessionState::Deleted => "deleted",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(SessionState::Created),
            "in_progress" => Ok(SessionState::InProgress),
            "paused" => Ok(SessionState::Paused),
            "finished" => Ok(SessionState::Finished),
            "deleted" => Ok(SessionState::Deleted),
            _ => Err(ParseError::new("session state", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleEvent::*;
    use super::SessionState::*;
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = Created.apply(LedgerChanged).unwrap();
        assert_eq!(state, InProgress);
        let state = state.apply(Pause).unwrap();
        assert_eq!(state, Paused);
        let state = state.apply(Resume).unwrap();
        assert_eq!(state, InProgress);
        let state = state.apply(Finish).unwrap();
        assert_eq!(state, Finished);
        assert_eq!(state.apply(Archive).unwrap(), Deleted);
    }

    #[test]
    fn test_finished_rejects_ledger_changes() {
        assert_eq!(
            Finished.apply(LedgerChanged),
            Err(TransitionError {
                from: Finished,
                event: LedgerChanged
            })
        );
        assert!(Finished.apply(Resume).is_err());
        assert!(Finished.apply(Pause).is_err());
    }

    #[test]
    fn test_discard_from_any_live_state() {
        for state in [Created, InProgress, Paused, Finished] {
            assert_eq!(state.apply(Discard), Ok(Deleted));
        }
        assert!(Deleted.apply(Discard).is_err());
    }

    #[test]
    fn test_archive_requires_finished() {
        assert!(InProgress.apply(Archive).is_err());
        assert!(Paused.apply(Finish).is_err());
    }

    #[test]
    fn test_paused_does_not_accept_rounds() {
        assert!(!Paused.accepts_rounds());
        assert!(Created.accepts_rounds());
    }

    #[test]
    fn test_state_key_parses_back() {
        for state in [Created, InProgress, Paused, Finished, Deleted] {
            assert_eq!(state.as_str().parse::<SessionState>(), Ok(state));
        }
    }
}
