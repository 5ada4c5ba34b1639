//! JSON file session store
//!
//! One pretty-printed document per session under `<root>/sessions/`. Writes go
//! to a temporary file first and are renamed into place.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use super::traits::{SessionStore, check_revision, recent_summaries};
use crate::error::StoreError;
use crate::session::record::SessionRecord;
use crate::session::summary::SessionSummary;

const SESSIONS_DIR: &str = "sessions";

pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes revision check and write within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: &Path) -> Result<Self, StoreError> {
        let dir = root.join(SESSIONS_DIR);
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> Option<PathBuf> {
        is_valid_id(session_id).then(|| self.dir.join(format!("{}.json", session_id)))
    }

    async fn read_record(path: &Path) -> Result<Option<SessionRecord>, StoreError> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_all(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session file"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        match self.path_for(session_id) {
            Some(path) => Self::read_record(&path).await,
            None => Ok(None),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let path = self.path_for(record.session_id()).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid session id '{}'", record.session_id()),
            ))
        })?;

        let _guard = self.write_lock.lock().await;
        let stored = Self::read_record(&path).await?.map(|r| r.revision());
        check_revision(record, stored)?;

        let content = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn list_by_participant(
        &self,
        participant_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let records = self.read_all().await?;
        Ok(recent_summaries(records.iter(), participant_id, limit))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut records = self.read_all().await?;
        records.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(records)
    }
}

/// Ids become file names, so only plain identifier characters are allowed.
fn is_valid_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
