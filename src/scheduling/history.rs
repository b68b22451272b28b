//! Read access to the append-only audit trail.
//!
//! Entries are written by the transactional commits themselves, one per
//! state transition, so the trail can never disagree with the records it
//! describes. This component only reads them back.

use std::sync::Arc;

use crate::error::Result;
use crate::scheduling::types::{HistoryAction, HistoryEntry};
use crate::store::SchedulingStore;

/// Query facade over recorded state transitions.
pub struct HistoryRecorder<S: SchedulingStore> {
    store: Arc<S>,
}

impl<S: SchedulingStore> HistoryRecorder<S> {
    /// Create a new history recorder.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every transition recorded for a request, oldest first.
    pub async fn trail_for_request(&self, request_id: &str) -> Result<Vec<HistoryEntry>> {
        self.store.list_request_history(request_id).await
    }

    /// Every transition recorded for a meeting, oldest first.
    pub async fn trail_for_meeting(&self, meeting_id: &str) -> Result<Vec<HistoryEntry>> {
        self.store.list_meeting_history(meeting_id).await
    }

    /// The most recent action recorded for a request, if any.
    pub async fn latest_request_action(&self, request_id: &str) -> Result<Option<HistoryAction>> {
        Ok(self
            .trail_for_request(request_id)
            .await?
            .last()
            .map(|entry| entry.action))
    }
}
