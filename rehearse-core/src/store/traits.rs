//! SessionStore trait

use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::record::SessionRecord;
use crate::session::summary::SessionSummary;

/// Persistence for session records.
///
/// `save` is an optimistic write: when a record with the same id already
/// exists, the incoming revision must be exactly one past the stored one,
/// otherwise the save fails with [`StoreError::Conflict`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Store `record` under its own session id
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Summaries of the participant's completed sessions, most recent first
    async fn list_by_participant(
        &self,
        participant_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError>;

    /// Every stored record, most recently updated first
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError>;
}

/// Reject a save that does not follow the stored revision.
pub(crate) fn check_revision(
    record: &SessionRecord,
    stored: Option<u64>,
) -> Result<(), StoreError> {
    match stored {
        Some(stored) if record.revision() != stored + 1 => Err(StoreError::Conflict {
            session_id: record.session_id().to_string(),
            stored,
            attempted: record.revision(),
        }),
        _ => Ok(()),
    }
}

/// Most recent completed summaries, newest first.
pub(crate) fn recent_summaries<'a>(
    records: impl Iterator<Item = &'a SessionRecord>,
    participant_id: &str,
    limit: usize,
) -> Vec<SessionSummary> {
    let mut summaries: Vec<SessionSummary> = records
        .filter(|r| r.participant_id() == participant_id)
        .filter_map(|r| r.summary().cloned())
        .collect();
    summaries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    summaries.truncate(limit);
    summaries
}
