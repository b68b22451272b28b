//! Storage contract for the scheduling engine.
//!
//! The engine needs three storage primitives and nothing else: reads, a
//! single-writer-per-key lock for window reservations, and atomic composite
//! commits that apply a full state transition or nothing at all. Any backend
//! offering those suffices; [`MemoryStore`](super::MemoryStore) is the
//! embedded implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::error::Result;
use crate::scheduling::types::{
    AvailabilityWindow, HistoryEntry, Meeting, MeetingRequest,
};

// ============================================================================
// Lock Handle
// ============================================================================

/// Exclusive per-window lock held for the duration of a reservation attempt.
///
/// Dropping the handle releases the lock. Holding it blocks other reservation
/// attempts on the same window but never on unrelated windows.
pub struct WindowLock {
    _guard: OwnedMutexGuard<()>,
}

impl WindowLock {
    /// Wrap an acquired guard.
    pub fn new(guard: OwnedMutexGuard<()>) -> Self {
        Self { _guard: guard }
    }
}

impl std::fmt::Debug for WindowLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowLock").finish()
    }
}

// ============================================================================
// Commit Arguments
// ============================================================================

/// Which calendars a commit re-checks for overlap inside its critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    /// Only the availability-window owner's calendar is guarded.
    WindowOwner,
    /// Both request parties' calendars are guarded.
    BothParties,
}

/// Resolution applied to a pending request by [`SchedulingStore::commit_response`].
#[derive(Debug, Clone)]
pub enum ResponseCommit {
    /// Accept the request and insert the meeting built from it.
    Accept { meeting: Meeting },
    /// Reject the request and release its window back to availability.
    Reject,
}

/// Responder attribution recorded on the request at resolution time.
#[derive(Debug, Clone)]
pub struct ResponseStamp {
    pub responder_id: String,
    pub responded_at: DateTime<Utc>,
    pub comment: Option<String>,
}

impl ResponseStamp {
    pub fn new(responder_id: impl Into<String>, comment: Option<String>) -> Self {
        Self {
            responder_id: responder_id.into(),
            responded_at: Utc::now(),
            comment,
        }
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Storage interface shared by every scheduling component.
///
/// Read methods return current state without coordination. The `commit_*`
/// methods are atomic: each one validates its state preconditions and applies
/// every write of the transition inside a single critical section, so a
/// failed commit leaves no partial writes behind.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    /// Initialize the store (load persisted state when configured).
    async fn initialize(&self) -> Result<()>;

    // ------------------------------------------------------------------
    // Availability windows
    // ------------------------------------------------------------------

    /// Insert a freshly published window.
    async fn add_window(&self, window: AvailabilityWindow) -> Result<()>;

    /// Get a window by id.
    async fn get_window(&self, id: &str) -> Result<Option<AvailabilityWindow>>;

    /// List all windows owned by a user, active or not.
    async fn list_windows(&self, owner_id: &str) -> Result<Vec<AvailabilityWindow>>;

    /// Flip the `active` flag on a window.
    async fn set_window_active(&self, id: &str, active: bool) -> Result<AvailabilityWindow>;

    /// Acquire the exclusive reservation lock for a window.
    async fn lock_window(&self, id: &str) -> WindowLock;

    // ------------------------------------------------------------------
    // Requests and meetings
    // ------------------------------------------------------------------

    /// Get a meeting request by id.
    async fn get_request(&self, id: &str) -> Result<Option<MeetingRequest>>;

    /// List requests in which the user is a party, optionally narrowed to
    /// one date.
    async fn list_requests_for(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<MeetingRequest>>;

    /// Get a meeting by id.
    async fn get_meeting(&self, id: &str) -> Result<Option<Meeting>>;

    /// List meetings in which the user is a party, optionally narrowed to
    /// one date.
    async fn list_meetings_for(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Meeting>>;

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Audit trail of a request, oldest first.
    async fn list_request_history(&self, request_id: &str) -> Result<Vec<HistoryEntry>>;

    /// Audit trail of a meeting, oldest first.
    async fn list_meeting_history(&self, meeting_id: &str) -> Result<Vec<HistoryEntry>>;

    // ------------------------------------------------------------------
    // Atomic transitions
    // ------------------------------------------------------------------

    /// Insert a pending request, re-checking conflicts and taking the window
    /// hold in the same critical section.
    ///
    /// When the request references a window, the window must exist, be
    /// active, and not be backing another still-pending request; on success
    /// it is marked held by the new request. The requested span must not
    /// overlap any pending/accepted request or scheduled meeting of the
    /// guarded parties, checked against both tables. On conflict the store
    /// returns `SlotUnavailable` and writes nothing.
    async fn commit_reservation(
        &self,
        request: MeetingRequest,
        scope: ConflictScope,
        entry: HistoryEntry,
    ) -> Result<MeetingRequest>;

    /// Resolve a pending request.
    ///
    /// Compare-and-set on `state == pending`; a request already resolved
    /// fails with `AlreadyResponded`. Accepting inserts the meeting;
    /// rejecting releases the request's window when it still holds one.
    async fn commit_response(
        &self,
        request_id: &str,
        commit: ResponseCommit,
        stamp: ResponseStamp,
        entry: HistoryEntry,
    ) -> Result<(MeetingRequest, Option<Meeting>)>;

    /// Cancel a scheduled meeting and mark its originating request rejected,
    /// carrying the cancellation reason as the request's response comment.
    ///
    /// Compare-and-set on `state == scheduled`; a second cancellation fails
    /// with `AlreadyCancelled`, other terminal states with `InvalidState`.
    async fn commit_cancellation(
        &self,
        meeting_id: &str,
        reason: Option<String>,
        entry: HistoryEntry,
    ) -> Result<Meeting>;

    /// Mark a scheduled meeting rescheduled and insert its successor request
    /// in the same critical section.
    ///
    /// The successor span is conflict-checked for both parties, excluding
    /// the meeting being moved and its originating request.
    async fn commit_reschedule(
        &self,
        meeting_id: &str,
        successor: MeetingRequest,
        entry: HistoryEntry,
    ) -> Result<(Meeting, MeetingRequest)>;

    /// Mark a scheduled meeting completed.
    async fn commit_completion(&self, meeting_id: &str, entry: HistoryEntry) -> Result<Meeting>;
}
