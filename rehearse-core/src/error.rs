//! Error types for rehearse-core

use thiserror::Error;

/// Errors surfaced by the session lifecycle
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {0} is being modified by another operation")]
    ConcurrentModification(String),

    /// An internal invariant was violated. The session is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation on session {0} was cancelled")]
    Cancelled(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { session_id, .. } => {
                SessionError::ConcurrentModification(session_id)
            }
            other => SessionError::Store(other),
        }
    }
}

/// Errors from the dialogue generator
///
/// These never escape the lifecycle facade; they are replaced by scripted
/// fallback utterances.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Dialogue generation failed: {0}")]
    Failed(String),

    #[error("Dialogue generation timed out after {0}s")]
    Timeout(u64),

    #[error("Dialogue generator returned an empty utterance")]
    EmptyUtterance,

    #[error("Dialogue generation was cancelled")]
    Cancelled,
}

/// Errors from session storage
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Revision conflict on session {session_id}: stored {stored}, attempted {attempted}")]
    Conflict {
        session_id: String,
        stored: u64,
        attempted: u64,
    },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_not_found_displays_correctly() {
        let error = SessionError::NotFound("abc123".to_string());
        assert!(error.to_string().contains("Session not found"));
        assert!(error.to_string().contains("abc123"));
    }

    #[test]
    fn session_error_concurrent_modification_names_session() {
        let error = SessionError::ConcurrentModification("s-1".to_string());
        assert!(error.to_string().contains("s-1"));
        assert!(error.to_string().contains("another operation"));
    }

    #[test]
    fn generation_error_timeout_displays_seconds() {
        let error = GenerationError::Timeout(20);
        assert!(error.to_string().contains("20s"));
    }

    #[test]
    fn store_conflict_converts_to_concurrent_modification() {
        let store_error = StoreError::Conflict {
            session_id: "s-9".to_string(),
            stored: 4,
            attempted: 4,
        };
        let session_error: SessionError = store_error.into();
        assert!(matches!(
            session_error,
            SessionError::ConcurrentModification(id) if id == "s-9"
        ));
    }

    #[test]
    fn store_io_error_stays_a_store_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let session_error: SessionError = StoreError::from(io_error).into();
        assert!(matches!(session_error, SessionError::Store(StoreError::Io(_))));
    }
}
