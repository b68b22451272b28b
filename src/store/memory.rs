//! Embedded in-memory store with optional JSON persistence.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use crate::error::{Result, SchedulingError, StoreError};
use crate::scheduling::types::{
    AvailabilityWindow, HistoryEntry, Meeting, MeetingRequest, MeetingState, RequestState,
};

use super::traits::{ConflictScope, ResponseCommit, ResponseStamp, SchedulingStore, WindowLock};

// ============================================================================
// Data
// ============================================================================

/// All scheduling records protected by a single RwLock for consistent access.
#[derive(Debug, Default)]
struct ScheduleData {
    windows: HashMap<String, AvailabilityWindow>,
    requests: HashMap<String, MeetingRequest>,
    meetings: HashMap<String, Meeting>,
    /// Append-only audit log, oldest first.
    history: Vec<HistoryEntry>,
    /// Index: owner id -> window ids.
    owner_windows: HashMap<String, HashSet<String>>,
    /// Index: party id -> request ids.
    party_requests: HashMap<String, HashSet<String>>,
    /// Index: party id -> meeting ids.
    party_meetings: HashMap<String, HashSet<String>>,
}

impl ScheduleData {
    fn index_window(&mut self, window: &AvailabilityWindow) {
        self.owner_windows
            .entry(window.owner_id.clone())
            .or_default()
            .insert(window.id.clone());
    }

    fn index_request(&mut self, request: &MeetingRequest) {
        for party in [&request.professor_id, &request.student_id] {
            self.party_requests
                .entry(party.clone())
                .or_default()
                .insert(request.id.clone());
        }
    }

    fn index_meeting(&mut self, meeting: &Meeting) {
        for party in [&meeting.professor_id, &meeting.student_id] {
            self.party_meetings
                .entry(party.clone())
                .or_default()
                .insert(meeting.id.clone());
        }
    }

    /// Whether the window currently backs a still-pending request.
    fn window_backing_pending(&self, window: &AvailabilityWindow) -> bool {
        if !window.held {
            return false;
        }
        match window
            .held_by
            .as_deref()
            .and_then(|id| self.requests.get(id))
        {
            Some(holder) => holder.state == RequestState::Pending,
            // No resolvable holder: trust the flag.
            None => true,
        }
    }

    /// Two-source overlap check for one party's calendar on one date.
    ///
    /// Both the request table (pending and accepted) and the meeting table
    /// (scheduled) are consulted; a meeting can exist without a live request
    /// holding its window, so neither table alone is sufficient.
    fn span_conflicts(
        &self,
        party: &str,
        date: NaiveDate,
        start: chrono::NaiveTime,
        end: chrono::NaiveTime,
        exclude_requests: &[&str],
        exclude_meetings: &[&str],
    ) -> bool {
        if let Some(ids) = self.party_requests.get(party) {
            for id in ids {
                if exclude_requests.contains(&id.as_str()) {
                    continue;
                }
                if let Some(request) = self.requests.get(id) {
                    let live = matches!(
                        request.state,
                        RequestState::Pending | RequestState::Accepted
                    );
                    if live && request.overlaps(date, start, end) {
                        return true;
                    }
                }
            }
        }

        if let Some(ids) = self.party_meetings.get(party) {
            for id in ids {
                if exclude_meetings.contains(&id.as_str()) {
                    continue;
                }
                if let Some(meeting) = self.meetings.get(id) {
                    if meeting.state == MeetingState::Scheduled
                        && meeting.overlaps(date, start, end)
                    {
                        return true;
                    }
                }
            }
        }

        false
    }
}

/// Snapshot format written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct PersistenceData {
    version: u32,
    windows: Vec<AvailabilityWindow>,
    requests: Vec<MeetingRequest>,
    meetings: Vec<Meeting>,
    history: Vec<HistoryEntry>,
}

// ============================================================================
// Store
// ============================================================================

/// In-memory scheduling store.
///
/// Every `commit_*` method runs its precondition checks and writes under one
/// write guard, so transitions are atomic and a failed commit leaves nothing
/// behind. Reservation locks are per-window tokio mutexes handed out from a
/// registry, so attempts on unrelated windows never contend.
pub struct MemoryStore {
    /// All data protected by a single RwLock for consistent access.
    data: RwLock<ScheduleData>,
    /// Per-window reservation locks.
    window_locks: StdMutex<HashMap<String, std::sync::Arc<AsyncMutex<()>>>>,
    /// Optional persistence file path.
    persistence_path: Option<PathBuf>,
    /// Mutex for persistence operations.
    persist_lock: AsyncMutex<()>,
}

impl MemoryStore {
    /// Create a new in-memory store without persistence.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(ScheduleData::default()),
            window_locks: StdMutex::new(HashMap::new()),
            persistence_path: None,
            persist_lock: AsyncMutex::new(()),
        }
    }

    /// Create a store persisting to `schedule.json` under the given directory,
    /// loading existing data if present.
    pub async fn with_persistence(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(StoreError::Io)?;

        let persistence_path = data_dir.join("schedule.json");
        let store = Self {
            data: RwLock::new(ScheduleData::default()),
            window_locks: StdMutex::new(HashMap::new()),
            persistence_path: Some(persistence_path.clone()),
            persist_lock: AsyncMutex::new(()),
        };

        if persistence_path.exists() {
            store.load_from_file(&persistence_path).await?;
        }

        Ok(store)
    }

    /// Load data from a JSON snapshot, rebuilding the indexes.
    async fn load_from_file(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(StoreError::Io)?;

        let persisted: PersistenceData = serde_json::from_str(&content)?;

        let mut data = self.data.write().await;

        for window in persisted.windows {
            data.index_window(&window);
            data.windows.insert(window.id.clone(), window);
        }
        for request in persisted.requests {
            data.index_request(&request);
            data.requests.insert(request.id.clone(), request);
        }
        for meeting in persisted.meetings {
            data.index_meeting(&meeting);
            data.meetings.insert(meeting.id.clone(), meeting);
        }
        data.history = persisted.history;

        tracing::info!(
            "Loaded {} windows, {} requests, {} meetings from {}",
            data.windows.len(),
            data.requests.len(),
            data.meetings.len(),
            path.display()
        );

        Ok(())
    }

    /// Write the current state to disk if persistence is configured.
    async fn persist(&self) -> Result<()> {
        let Some(ref path) = self.persistence_path else {
            return Ok(());
        };

        let _lock = self.persist_lock.lock().await;

        let data = self.data.read().await;
        let persisted = PersistenceData {
            version: 1,
            windows: data.windows.values().cloned().collect(),
            requests: data.requests.values().cloned().collect(),
            meetings: data.meetings.values().cloned().collect(),
            history: data.history.clone(),
        };
        drop(data);

        let content = serde_json::to_string_pretty(&persisted)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(StoreError::Io)?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(StoreError::Io)?;

        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn add_window(&self, window: AvailabilityWindow) -> Result<()> {
        {
            let mut data = self.data.write().await;
            if data.windows.contains_key(&window.id) {
                return Err(StoreError::DuplicateId(window.id).into());
            }
            data.index_window(&window);
            data.windows.insert(window.id.clone(), window);
        }
        self.persist().await
    }

    async fn get_window(&self, id: &str) -> Result<Option<AvailabilityWindow>> {
        Ok(self.data.read().await.windows.get(id).cloned())
    }

    async fn list_windows(&self, owner_id: &str) -> Result<Vec<AvailabilityWindow>> {
        let data = self.data.read().await;
        let mut windows: Vec<AvailabilityWindow> = data
            .owner_windows
            .get(owner_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| data.windows.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        windows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(windows)
    }

    async fn set_window_active(&self, id: &str, active: bool) -> Result<AvailabilityWindow> {
        let window = {
            let mut data = self.data.write().await;
            let window = data
                .windows
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("window {id}")))?;
            window.active = active;
            window.updated_at = Utc::now();
            window.clone()
        };
        self.persist().await?;
        Ok(window)
    }

    async fn lock_window(&self, id: &str) -> WindowLock {
        let lock = {
            let mut registry = self.window_locks.lock().unwrap();
            registry
                .entry(id.to_string())
                .or_insert_with(|| std::sync::Arc::new(AsyncMutex::new(())))
                .clone()
        };
        // Registry guard is released before awaiting the window mutex.
        WindowLock::new(lock.lock_owned().await)
    }

    async fn get_request(&self, id: &str) -> Result<Option<MeetingRequest>> {
        Ok(self.data.read().await.requests.get(id).cloned())
    }

    async fn list_requests_for(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<MeetingRequest>> {
        let data = self.data.read().await;
        let mut requests: Vec<MeetingRequest> = data
            .party_requests
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| data.requests.get(id))
                    .filter(|r| date.is_none_or(|d| r.date == d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        requests.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.start_time.cmp(&b.start_time))
                .then(a.id.cmp(&b.id))
        });
        Ok(requests)
    }

    async fn get_meeting(&self, id: &str) -> Result<Option<Meeting>> {
        Ok(self.data.read().await.meetings.get(id).cloned())
    }

    async fn list_meetings_for(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Meeting>> {
        let data = self.data.read().await;
        let mut meetings: Vec<Meeting> = data
            .party_meetings
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| data.meetings.get(id))
                    .filter(|m| date.is_none_or(|d| m.date == d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        meetings.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.start_time.cmp(&b.start_time))
                .then(a.id.cmp(&b.id))
        });
        Ok(meetings)
    }

    async fn list_request_history(&self, request_id: &str) -> Result<Vec<HistoryEntry>> {
        let data = self.data.read().await;
        Ok(data
            .history
            .iter()
            .filter(|e| e.request_id.as_deref() == Some(request_id))
            .cloned()
            .collect())
    }

    async fn list_meeting_history(&self, meeting_id: &str) -> Result<Vec<HistoryEntry>> {
        let data = self.data.read().await;
        Ok(data
            .history
            .iter()
            .filter(|e| e.meeting_id.as_deref() == Some(meeting_id))
            .cloned()
            .collect())
    }

    async fn commit_reservation(
        &self,
        request: MeetingRequest,
        scope: ConflictScope,
        entry: HistoryEntry,
    ) -> Result<MeetingRequest> {
        let date = request.date;
        let start = request.start_time;
        let end = request.end_time();

        {
            let mut data = self.data.write().await;

            if let Some(window_id) = request.window_id.clone() {
                let window = match data.windows.get(&window_id) {
                    Some(w) => w.clone(),
                    None => return Err(SchedulingError::WindowInactive(window_id)),
                };
                if !window.active {
                    return Err(SchedulingError::WindowInactive(window_id));
                }
                if data.window_backing_pending(&window) {
                    return Err(SchedulingError::SlotUnavailable {
                        date,
                        start,
                        reason: "window is already held by a pending request".to_string(),
                    });
                }
            }

            let parties: &[&str] = match scope {
                ConflictScope::WindowOwner => &[&request.professor_id],
                ConflictScope::BothParties => &[&request.professor_id, &request.student_id],
            };
            for party in parties {
                if data.span_conflicts(party, date, start, end, &[], &[]) {
                    return Err(SchedulingError::SlotUnavailable {
                        date,
                        start,
                        reason: "block overlaps an existing request or meeting".to_string(),
                    });
                }
            }

            if let Some(window_id) = &request.window_id {
                if let Some(window) = data.windows.get_mut(window_id) {
                    window.held = true;
                    window.held_by = Some(request.id.clone());
                    window.updated_at = Utc::now();
                }
            }
            data.index_request(&request);
            data.requests.insert(request.id.clone(), request.clone());
            data.history.push(entry);
        }

        self.persist().await?;
        Ok(request)
    }

    async fn commit_response(
        &self,
        request_id: &str,
        commit: ResponseCommit,
        stamp: ResponseStamp,
        entry: HistoryEntry,
    ) -> Result<(MeetingRequest, Option<Meeting>)> {
        let result = {
            let mut data = self.data.write().await;

            let mut request = match data.requests.get(request_id) {
                Some(r) => r.clone(),
                None => {
                    return Err(SchedulingError::RequestNotFound(request_id.to_string()));
                }
            };
            if request.state != RequestState::Pending {
                return Err(SchedulingError::AlreadyResponded(request_id.to_string()));
            }

            request.responded_by = Some(stamp.responder_id);
            request.responded_at = Some(stamp.responded_at);
            request.response_comment = stamp.comment;
            request.updated_at = Utc::now();

            let meeting = match commit {
                ResponseCommit::Accept { meeting } => {
                    request.state = RequestState::Accepted;
                    data.index_meeting(&meeting);
                    data.meetings.insert(meeting.id.clone(), meeting.clone());
                    Some(meeting)
                }
                ResponseCommit::Reject => {
                    request.state = RequestState::Rejected;
                    if let Some(window_id) = request.window_id.clone() {
                        if let Some(window) = data.windows.get_mut(&window_id) {
                            if window.held_by.as_deref() == Some(request_id) {
                                window.held = false;
                                window.held_by = None;
                                window.updated_at = Utc::now();
                            }
                        }
                    }
                    None
                }
            };

            data.requests.insert(request.id.clone(), request.clone());
            data.history.push(entry);
            (request, meeting)
        };

        self.persist().await?;
        Ok(result)
    }

    async fn commit_cancellation(
        &self,
        meeting_id: &str,
        reason: Option<String>,
        entry: HistoryEntry,
    ) -> Result<Meeting> {
        let meeting = {
            let mut data = self.data.write().await;

            let mut meeting = match data.meetings.get(meeting_id) {
                Some(m) => m.clone(),
                None => return Err(SchedulingError::MeetingNotFound(meeting_id.to_string())),
            };
            match meeting.state {
                MeetingState::Scheduled => {}
                MeetingState::Cancelled => {
                    return Err(SchedulingError::AlreadyCancelled(meeting_id.to_string()));
                }
                state => {
                    return Err(SchedulingError::InvalidState {
                        entity: "meeting",
                        id: meeting_id.to_string(),
                        state: state.as_str().to_string(),
                    });
                }
            }

            meeting.state = MeetingState::Cancelled;
            meeting.updated_at = Utc::now();

            // Keep the originating request consistent with the cancelled
            // meeting so conflict scans free the block again.
            if let Some(request) = data.requests.get_mut(&meeting.request_id) {
                if request.state != RequestState::Rejected {
                    request.state = RequestState::Rejected;
                    if reason.is_some() {
                        request.response_comment = reason.clone();
                    }
                    request.updated_at = Utc::now();
                }
            }

            data.meetings.insert(meeting.id.clone(), meeting.clone());
            data.history.push(entry);
            meeting
        };

        self.persist().await?;
        Ok(meeting)
    }

    async fn commit_reschedule(
        &self,
        meeting_id: &str,
        successor: MeetingRequest,
        entry: HistoryEntry,
    ) -> Result<(Meeting, MeetingRequest)> {
        let result = {
            let mut data = self.data.write().await;

            let mut meeting = match data.meetings.get(meeting_id) {
                Some(m) => m.clone(),
                None => return Err(SchedulingError::MeetingNotFound(meeting_id.to_string())),
            };
            if meeting.state != MeetingState::Scheduled {
                return Err(SchedulingError::InvalidState {
                    entity: "meeting",
                    id: meeting_id.to_string(),
                    state: meeting.state.as_str().to_string(),
                });
            }

            let date = successor.date;
            let start = successor.start_time;
            let end = successor.end_time();
            for party in [&successor.professor_id, &successor.student_id] {
                if data.span_conflicts(
                    party,
                    date,
                    start,
                    end,
                    &[meeting.request_id.as_str()],
                    &[meeting_id],
                ) {
                    return Err(SchedulingError::SlotUnavailable {
                        date,
                        start,
                        reason: "new slot overlaps an existing request or meeting".to_string(),
                    });
                }
            }

            meeting.state = MeetingState::Rescheduled;
            meeting.updated_at = Utc::now();
            data.meetings.insert(meeting.id.clone(), meeting.clone());
            data.index_request(&successor);
            data.requests.insert(successor.id.clone(), successor.clone());
            data.history.push(entry);
            (meeting, successor)
        };

        self.persist().await?;
        Ok(result)
    }

    async fn commit_completion(&self, meeting_id: &str, entry: HistoryEntry) -> Result<Meeting> {
        let meeting = {
            let mut data = self.data.write().await;

            let mut meeting = match data.meetings.get(meeting_id) {
                Some(m) => m.clone(),
                None => return Err(SchedulingError::MeetingNotFound(meeting_id.to_string())),
            };
            if meeting.state != MeetingState::Scheduled {
                return Err(SchedulingError::InvalidState {
                    entity: "meeting",
                    id: meeting_id.to_string(),
                    state: meeting.state.as_str().to_string(),
                });
            }

            meeting.state = MeetingState::Completed;
            meeting.updated_at = Utc::now();
            data.meetings.insert(meeting.id.clone(), meeting.clone());
            data.history.push(entry);
            meeting
        };

        self.persist().await?;
        Ok(meeting)
    }
}
