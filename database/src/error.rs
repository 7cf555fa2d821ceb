use thiserror::Error;
use types::{LifecycleEvent, SessionId, SessionState, TransitionError};

/// Coarse classification surfaced to callers of the score keeper.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    OutOfOrder,
    DuplicateFinalization,
    InvalidInput,
    StorageFailure,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Preset not found: {0}")]
    PresetNotFound(i64),

    #[error("Session {session_id} is {state}, cannot {event:?}")]
    InvalidState {
        session_id: SessionId,
        state: SessionState,
        event: LifecycleEvent,
    },

    #[error("Session {session_id}: round {got} is out of order, expected {expected}")]
    OutOfOrder {
        session_id: SessionId,
        expected: u32,
        got: u32,
    },

    #[error("Session {0} was already finalized")]
    DuplicateFinalization(SessionId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retry exhausted: {0}")]
    RetryExhausted(String),

    #[error("UUID parsing error: {0}")]
    UuidParsing(#[from] uuid::Error),
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::PlayerNotFound(_)
            | DatabaseError::SessionNotFound(_)
            | DatabaseError::PresetNotFound(_) => ErrorKind::NotFound,
            DatabaseError::InvalidState { .. } => ErrorKind::InvalidState,
            DatabaseError::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            DatabaseError::DuplicateFinalization(_) => ErrorKind::DuplicateFinalization,
            DatabaseError::InvalidInput(_) => ErrorKind::InvalidInput,
            DatabaseError::Connection(_)
            | DatabaseError::Query(_)
            | DatabaseError::Serialization(_)
            | DatabaseError::Transaction(_)
            | DatabaseError::Migration(_)
            | DatabaseError::Decode(_)
            | DatabaseError::RetryExhausted(_)
            | DatabaseError::UuidParsing(_) => ErrorKind::StorageFailure,
        }
    }

    /// Storage failures may succeed on a later attempt; domain rejections never do.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::Connection(_) | DatabaseError::Query(_) | DatabaseError::Transaction(_)
        )
    }

    pub(crate) fn from_transition(session_id: SessionId, err: TransitionError) -> Self {
        DatabaseError::InvalidState {
            session_id,
            state: err.from,
            event: err.event,
        }
    }
}
