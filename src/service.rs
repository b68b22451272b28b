//! Scheduler facade that wires the scheduling components to one store.
//!
//! The scheduler handles:
//! - Availability window publication and withdrawal
//! - Slot expansion over the configured horizon
//! - Shared-availability matching between two users
//! - Reservation of open blocks and direct meeting proposals
//! - Accept/reject responses that promote requests into meetings
//! - Meeting cancellation, rescheduling and completion
//! - History trails for requests and meetings

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Weekday};

use crate::config::SchedulingConfig;
use crate::directory::{ProjectRoster, UserDirectory};
use crate::error::{ConfigError, Result};
use crate::notify::{LogNotifier, Notifier};
use crate::scheduling::{
    AvailabilityManager, AvailabilityMatcher, AvailabilityWindow, Decision, HistoryEntry,
    HistoryRecorder, Meeting, MeetingLifecycle, MeetingRequest, OpenSlot, ProposeRequest,
    ReservationTransactor, ReserveRequest, ResponseOutcome, ResponseWorkflow, SharedWindow,
    SlotExpander,
};
use crate::store::SchedulingStore;

// ============================================================================
// Scheduler
// ============================================================================

/// Entry point for the scheduling engine.
///
/// Owns one instance of every component, all sharing the same store and
/// collaborators. Construct it through [`Scheduler::builder`].
pub struct Scheduler<S: SchedulingStore> {
    store: Arc<S>,
    availability: AvailabilityManager<S>,
    expander: SlotExpander<S>,
    matcher: AvailabilityMatcher<S>,
    transactor: ReservationTransactor<S>,
    workflow: ResponseWorkflow<S>,
    lifecycle: MeetingLifecycle<S>,
    history: HistoryRecorder<S>,
}

impl<S: SchedulingStore> std::fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

impl<S: SchedulingStore> Scheduler<S> {
    /// Start building a scheduler around the given store.
    pub fn builder(store: Arc<S>) -> SchedulerBuilder<S> {
        SchedulerBuilder::new(store)
    }

    // ------------------------------------------------------------------
    // Availability
    // ------------------------------------------------------------------

    /// Publish a weekly recurring availability window.
    pub async fn publish_weekly(
        &self,
        owner_id: &str,
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<AvailabilityWindow> {
        self.availability
            .publish_weekly(owner_id, weekday, start_time, end_time)
            .await
    }

    /// Publish a single-date availability window.
    pub async fn publish_on_date(
        &self,
        owner_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<AvailabilityWindow> {
        self.availability
            .publish_on_date(owner_id, date, start_time, end_time)
            .await
    }

    /// Withdraw a window from future slot expansion.
    pub async fn deactivate_window(
        &self,
        owner_id: &str,
        window_id: &str,
    ) -> Result<AvailabilityWindow> {
        self.availability.deactivate(owner_id, window_id).await
    }

    /// All windows published by a user, active or not.
    pub async fn windows_for(&self, owner_id: &str) -> Result<Vec<AvailabilityWindow>> {
        self.availability.windows_for(owner_id).await
    }

    // ------------------------------------------------------------------
    // Slot expansion and matching
    // ------------------------------------------------------------------

    /// Bookable blocks for a user over the configured horizon.
    pub async fn open_slots(&self, owner_id: &str) -> Result<Vec<OpenSlot>> {
        self.expander.open_slots(owner_id).await
    }

    /// Bookable blocks from an explicit reference date and horizon.
    pub async fn open_slots_from(
        &self,
        owner_id: &str,
        today: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<OpenSlot>> {
        self.expander
            .open_slots_from(owner_id, today, horizon_days)
            .await
    }

    /// Weekly spans where both users are available.
    pub async fn shared_windows(&self, user_a: &str, user_b: &str) -> Result<Vec<SharedWindow>> {
        self.matcher.shared_windows(user_a, user_b).await
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Reserve one open block of a published window for a project meeting.
    pub async fn reserve(&self, params: ReserveRequest) -> Result<MeetingRequest> {
        self.transactor.reserve(params).await
    }

    /// Propose a meeting inside the parties' shared availability.
    pub async fn propose(&self, params: ProposeRequest) -> Result<MeetingRequest> {
        self.transactor.propose(params).await
    }

    /// Accept or reject a pending request.
    pub async fn respond(
        &self,
        request_id: &str,
        responder_id: &str,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<ResponseOutcome> {
        self.workflow
            .respond(request_id, responder_id, decision, comment)
            .await
    }

    /// Look up a request by id.
    pub async fn request(&self, request_id: &str) -> Result<Option<MeetingRequest>> {
        self.store.get_request(request_id).await
    }

    /// All requests involving a user, optionally narrowed to one date.
    pub async fn requests_for(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<MeetingRequest>> {
        self.store.list_requests_for(user_id, date).await
    }

    // ------------------------------------------------------------------
    // Meetings
    // ------------------------------------------------------------------

    /// Cancel a scheduled meeting.
    pub async fn cancel(
        &self,
        meeting_id: &str,
        actor_id: &str,
        reason: Option<String>,
    ) -> Result<Meeting> {
        self.lifecycle.cancel(meeting_id, actor_id, reason).await
    }

    /// Move a scheduled meeting to a new date and time.
    ///
    /// Returns the superseded meeting and the replacement request, which
    /// goes back to the counterpart for confirmation.
    pub async fn reschedule(
        &self,
        meeting_id: &str,
        actor_id: &str,
        new_date: NaiveDate,
        new_start: NaiveTime,
    ) -> Result<(Meeting, MeetingRequest)> {
        self.lifecycle
            .reschedule(meeting_id, actor_id, new_date, new_start)
            .await
    }

    /// Mark a scheduled meeting as having taken place.
    pub async fn complete(&self, meeting_id: &str, actor_id: &str) -> Result<Meeting> {
        self.lifecycle.complete(meeting_id, actor_id).await
    }

    /// Look up a meeting by id.
    pub async fn meeting(&self, meeting_id: &str) -> Result<Option<Meeting>> {
        self.store.get_meeting(meeting_id).await
    }

    /// All meetings involving a user, optionally narrowed to one date.
    pub async fn meetings_for(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Meeting>> {
        self.store.list_meetings_for(user_id, date).await
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// The audit trail of a request, oldest entry first.
    pub async fn request_history(&self, request_id: &str) -> Result<Vec<HistoryEntry>> {
        self.history.trail_for_request(request_id).await
    }

    /// The audit trail of a meeting, oldest entry first.
    pub async fn meeting_history(&self, meeting_id: &str) -> Result<Vec<HistoryEntry>> {
        self.history.trail_for_meeting(meeting_id).await
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Scheduler`].
///
/// A user directory and a project roster are required; the notifier falls
/// back to [`LogNotifier`] and the configuration to its defaults.
pub struct SchedulerBuilder<S: SchedulingStore> {
    store: Arc<S>,
    directory: Option<Arc<dyn UserDirectory>>,
    roster: Option<Arc<dyn ProjectRoster>>,
    notifier: Option<Arc<dyn Notifier>>,
    config: Option<SchedulingConfig>,
}

impl<S: SchedulingStore> SchedulerBuilder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            directory: None,
            roster: None,
            notifier: None,
            config: None,
        }
    }

    /// Set the directory used to resolve and validate users.
    pub fn directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Set the roster used to check project membership.
    pub fn roster(mut self, roster: Arc<dyn ProjectRoster>) -> Self {
        self.roster = Some(roster);
        self
    }

    /// Set the notifier that delivers scheduling events.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the scheduling configuration.
    pub fn config(mut self, config: SchedulingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the scheduler, validating the configuration.
    pub fn build(self) -> Result<Scheduler<S>> {
        let directory = self
            .directory
            .ok_or_else(|| ConfigError::Invalid("a user directory is required".to_string()))?;
        let roster = self
            .roster
            .ok_or_else(|| ConfigError::Invalid("a project roster is required".to_string()))?;
        let notifier: Arc<dyn Notifier> = self
            .notifier
            .unwrap_or_else(|| Arc::new(LogNotifier::new()));
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Scheduler {
            availability: AvailabilityManager::new(self.store.clone(), config.clone()),
            expander: SlotExpander::new(self.store.clone(), config.clone()),
            matcher: AvailabilityMatcher::new(self.store.clone()),
            transactor: ReservationTransactor::new(
                self.store.clone(),
                directory.clone(),
                roster.clone(),
                notifier.clone(),
                config.clone(),
            ),
            workflow: ResponseWorkflow::new(self.store.clone(), directory, notifier.clone()),
            lifecycle: MeetingLifecycle::new(self.store.clone(), notifier, config),
            history: HistoryRecorder::new(self.store.clone()),
            store: self.store,
        })
    }
}
