//! In-memory session store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::{SessionStore, check_revision, recent_summaries};
use crate::error::StoreError;
use crate::session::record::SessionRecord;
use crate::session::summary::SessionSummary;

#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.records.read().await.get(session_id).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        check_revision(record, records.get(record.session_id()).map(|r| r.revision()))?;
        records.insert(record.session_id().to_string(), record.clone());
        Ok(())
    }

    async fn list_by_participant(
        &self,
        participant_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let records = self.records.read().await;
        Ok(recent_summaries(records.values(), participant_id, limit))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut list: Vec<_> = self.records.read().await.values().cloned().collect();
        list.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(list)
    }
}
