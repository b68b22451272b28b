//! Cancellation, rescheduling and completion of confirmed meetings.
//!
//! A meeting leaves the `scheduled` state exactly once. Rescheduling never
//! edits the meeting in place: it marks the old record rescheduled and
//! spawns a fresh pending request that must go through the response
//! workflow again.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use tracing::{debug, warn};

use crate::config::SchedulingConfig;
use crate::error::{Result, SchedulingError, ValidationError};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::scheduling::types::{
    HistoryAction, HistoryEntry, Meeting, MeetingRequest, MeetingState,
};
use crate::store::SchedulingStore;

/// Drives confirmed meetings through their terminal transitions.
pub struct MeetingLifecycle<S: SchedulingStore> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    config: SchedulingConfig,
}

impl<S: SchedulingStore> MeetingLifecycle<S> {
    /// Create a new lifecycle manager.
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, config: SchedulingConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Cancel a scheduled meeting.
    ///
    /// Either party may cancel. The originating request is marked rejected
    /// with the reason as its response comment, keeping both conflict
    /// sources consistent so the block frees up again.
    pub async fn cancel(
        &self,
        meeting_id: &str,
        actor_id: &str,
        reason: Option<String>,
    ) -> Result<Meeting> {
        let meeting = self.authorized_meeting(meeting_id, actor_id).await?;

        let mut entry = HistoryEntry::for_meeting(meeting_id, actor_id, HistoryAction::Cancelled)
            .with_request(&meeting.request_id);
        if let Some(reason) = &reason {
            entry = entry.with_comment(reason.clone());
        }

        debug!("{} cancels meeting {}", actor_id, meeting_id);
        let meeting = self
            .store
            .commit_cancellation(meeting_id, reason.clone(), entry)
            .await?;

        self.notify_counterpart(
            &meeting,
            actor_id,
            NotificationKind::MeetingCancelled,
            format!(
                "meeting on {} at {} was cancelled{}",
                meeting.date,
                meeting.start_time,
                reason.map(|r| format!(": {r}")).unwrap_or_default()
            ),
        )
        .await;

        Ok(meeting)
    }

    /// Move a scheduled meeting to a new slot.
    ///
    /// The old meeting becomes `rescheduled` and a successor request is
    /// created in `pending` state carrying over project, parties, duration
    /// and type, attributed to the initiating party. The new slot is
    /// conflict-checked for both parties; no window lock is involved since
    /// no availability window backs a reschedule.
    pub async fn reschedule(
        &self,
        meeting_id: &str,
        actor_id: &str,
        new_date: NaiveDate,
        new_start: NaiveTime,
    ) -> Result<(Meeting, MeetingRequest)> {
        let meeting = self.authorized_meeting(meeting_id, actor_id).await?;

        let duration = meeting.duration_minutes();
        let new_end = new_start + Duration::minutes(duration);
        let today = Utc::now().date_naive();
        if new_date <= today {
            return Err(ValidationError::PastDate(new_date).into());
        }
        if new_end <= new_start || !self.config.office_hours.contains(new_start, new_end) {
            return Err(ValidationError::OutsideOfficeHours {
                start: new_start,
                end: new_end,
                open: self.config.office_hours.open,
                close: self.config.office_hours.close,
            }
            .into());
        }
        if !self.config.office_hours.allow_weekends
            && matches!(new_date.weekday(), Weekday::Sat | Weekday::Sun)
        {
            return Err(ValidationError::WeekendNotAllowed.into());
        }

        let description = if meeting.description.is_empty() {
            "[rescheduled]".to_string()
        } else {
            format!("[rescheduled] {}", meeting.description)
        };
        let successor = MeetingRequest::new(
            &meeting.project_id,
            &meeting.professor_id,
            &meeting.student_id,
            new_date,
            new_start,
            duration as u32,
        )
        .with_type(meeting.meeting_type)
        .with_description(description)
        .requested_by(actor_id);
        let entry = HistoryEntry::for_meeting(meeting_id, actor_id, HistoryAction::Rescheduled)
            .with_request(&successor.id);

        debug!(
            "{} reschedules meeting {} to {} {}",
            actor_id, meeting_id, new_date, new_start
        );
        let (meeting, successor) = self
            .store
            .commit_reschedule(meeting_id, successor, entry)
            .await?;

        self.notify_counterpart(
            &meeting,
            actor_id,
            NotificationKind::MeetingRescheduled,
            format!(
                "meeting on {} at {} was moved; new proposal: {} at {}",
                meeting.date, meeting.start_time, successor.date, successor.start_time
            ),
        )
        .await;

        Ok((meeting, successor))
    }

    /// Record that a scheduled meeting took place.
    pub async fn complete(&self, meeting_id: &str, actor_id: &str) -> Result<Meeting> {
        self.authorized_meeting(meeting_id, actor_id).await?;
        let entry = HistoryEntry::for_meeting(meeting_id, actor_id, HistoryAction::Completed);
        debug!("{} completes meeting {}", actor_id, meeting_id);
        self.store.commit_completion(meeting_id, entry).await
    }

    async fn authorized_meeting(&self, meeting_id: &str, actor_id: &str) -> Result<Meeting> {
        let meeting = self
            .store
            .get_meeting(meeting_id)
            .await?
            .ok_or_else(|| SchedulingError::MeetingNotFound(meeting_id.to_string()))?;
        if !meeting.is_party(actor_id) {
            return Err(SchedulingError::NotAuthorized {
                actor: actor_id.to_string(),
                resource: format!("meeting {meeting_id}"),
            });
        }
        Ok(meeting)
    }

    async fn notify_counterpart(
        &self,
        meeting: &Meeting,
        actor_id: &str,
        kind: NotificationKind,
        message: String,
    ) {
        let Some(counterpart) = meeting.counterpart_of(actor_id) else {
            return;
        };
        let notification =
            Notification::new(counterpart, kind, message).with_meeting(&meeting.id);
        if let Err(err) = self.notifier.notify(notification).await {
            warn!("failed to deliver lifecycle notification: {err}");
        }
    }
}
