//! Session history that records into memory.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use vc_service::collaborators::{CollaboratorError, HistoryArchive};
use vc_service::session::SessionRecord;

/// Mock history archive. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct RecordingHistory {
    inner: Arc<Mutex<HistoryInner>>,
}

#[derive(Debug, Default)]
struct HistoryInner {
    records: Vec<SessionRecord>,
    failure: Option<CollaboratorError>,
}

impl RecordingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record accepted so far, oldest first.
    pub fn records(&self) -> Vec<SessionRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    /// Reject every subsequent write with `error`.
    pub fn fail_with(&self, error: CollaboratorError) {
        self.inner.lock().unwrap().failure = Some(error);
    }
}

#[async_trait]
impl HistoryArchive for RecordingHistory {
    async fn record_session(&self, record: SessionRecord) -> Result<(), CollaboratorError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.failure.clone() {
            return Err(error);
        }
        inner.records.push(record);
        Ok(())
    }
}
