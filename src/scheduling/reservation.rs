//! Transactional creation of meeting requests.
//!
//! Two entry points exist: [`ReservationTransactor::reserve`] books one
//! exact block against a published window, and
//! [`ReservationTransactor::propose`] files an auto-matched request inside
//! the shared availability of both parties, without touching any window.
//! Both insert the request, its window hold, and the audit entry as one
//! atomic store transition; a conflict leaves no partial writes.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::config::SchedulingConfig;
use crate::directory::{ProjectRoster, UserDirectory, UserProfile};
use crate::error::{Result, SchedulingError, ValidationError};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::scheduling::matcher::AvailabilityMatcher;
use crate::scheduling::types::{
    HistoryAction, HistoryEntry, MeetingRequest, MeetingType, Role,
};
use crate::store::{ConflictScope, SchedulingStore};

// ============================================================================
// Parameters
// ============================================================================

/// Parameters for a direct reservation against a published window.
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    /// Window the block belongs to.
    pub window_id: String,
    /// Thesis project the meeting concerns.
    pub project_id: String,
    /// Reserving student.
    pub student_id: String,
    /// Concrete date of the block.
    pub date: NaiveDate,
    /// Block start.
    pub start_time: NaiveTime,
    /// Block end (exclusive).
    pub end_time: NaiveTime,
    /// Kind of meeting.
    pub meeting_type: MeetingType,
    /// Free-text description.
    pub description: String,
}

impl ReserveRequest {
    /// Create reservation parameters for one block.
    pub fn new(
        window_id: impl Into<String>,
        project_id: impl Into<String>,
        student_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            window_id: window_id.into(),
            project_id: project_id.into(),
            student_id: student_id.into(),
            date,
            start_time,
            end_time,
            meeting_type: MeetingType::default(),
            description: String::new(),
        }
    }

    /// Set the meeting type.
    pub fn with_type(mut self, meeting_type: MeetingType) -> Self {
        self.meeting_type = meeting_type;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Parameters for an auto-matched proposal.
#[derive(Debug, Clone)]
pub struct ProposeRequest {
    /// Thesis project the meeting concerns.
    pub project_id: String,
    /// Professor party.
    pub professor_id: String,
    /// Student party.
    pub student_id: String,
    /// Proposed date.
    pub date: NaiveDate,
    /// Proposed start time.
    pub start_time: NaiveTime,
    /// Proposed duration in minutes.
    pub duration_minutes: u32,
    /// Kind of meeting.
    pub meeting_type: MeetingType,
    /// Free-text description.
    pub description: String,
    /// Party filing the proposal; its counterpart responds.
    pub proposed_by: String,
}

impl ProposeRequest {
    /// Create proposal parameters.
    pub fn new(
        project_id: impl Into<String>,
        professor_id: impl Into<String>,
        student_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: u32,
        proposed_by: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            professor_id: professor_id.into(),
            student_id: student_id.into(),
            date,
            start_time,
            duration_minutes,
            meeting_type: MeetingType::default(),
            description: String::new(),
            proposed_by: proposed_by.into(),
        }
    }

    /// Set the meeting type.
    pub fn with_type(mut self, meeting_type: MeetingType) -> Self {
        self.meeting_type = meeting_type;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// Transactor
// ============================================================================

/// Creates pending meeting requests under conflict control.
pub struct ReservationTransactor<S: SchedulingStore> {
    store: Arc<S>,
    directory: Arc<dyn UserDirectory>,
    roster: Arc<dyn ProjectRoster>,
    notifier: Arc<dyn Notifier>,
    matcher: AvailabilityMatcher<S>,
    config: SchedulingConfig,
}

impl<S: SchedulingStore> ReservationTransactor<S> {
    /// Create a new transactor.
    pub fn new(
        store: Arc<S>,
        directory: Arc<dyn UserDirectory>,
        roster: Arc<dyn ProjectRoster>,
        notifier: Arc<dyn Notifier>,
        config: SchedulingConfig,
    ) -> Self {
        let matcher = AvailabilityMatcher::new(store.clone());
        Self {
            store,
            directory,
            roster,
            notifier,
            matcher,
            config,
        }
    }

    /// Reserve one exact block of a window for a student.
    ///
    /// The professor is the window owner. The call acquires the per-window
    /// lock, so concurrent attempts on the same window are serialized;
    /// attempts on unrelated windows proceed in parallel. On success the
    /// request is pending and the window is held by it.
    pub async fn reserve(&self, params: ReserveRequest) -> Result<MeetingRequest> {
        if params.window_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("window_id").into());
        }
        if params.project_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("project_id").into());
        }
        if params.student_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("student_id").into());
        }

        let window = self
            .store
            .get_window(&params.window_id)
            .await?
            .ok_or_else(|| SchedulingError::WindowInactive(params.window_id.clone()))?;
        if !window.active {
            return Err(SchedulingError::WindowInactive(window.id.clone()));
        }

        let professor = self.resolve_role(&window.owner_id, Role::Professor).await?;
        let student = self.resolve_role(&params.student_id, Role::Student).await?;
        self.ensure_member(&params.project_id, &professor.id).await?;
        self.ensure_member(&params.project_id, &student.id).await?;

        let today = Utc::now().date_naive();
        if params.date <= today {
            return Err(ValidationError::PastDate(params.date).into());
        }
        if !window.matches_date(params.date) {
            return Err(ValidationError::WindowDateMismatch {
                date: params.date,
                expected: window.recurrence.describe(),
            }
            .into());
        }

        // The reservable unit is exactly one block on the window's grid.
        let block_minutes = self.config.block_minutes;
        let length = (params.end_time - params.start_time).num_minutes();
        let offset = (params.start_time - window.start_time).num_minutes();
        if length != i64::from(block_minutes)
            || offset < 0
            || offset % i64::from(block_minutes) != 0
            || params.end_time > window.end_time
        {
            return Err(ValidationError::MisalignedBlock {
                start: params.start_time,
                end: params.end_time,
                block_minutes,
            }
            .into());
        }

        let request = MeetingRequest::new(
            &params.project_id,
            &window.owner_id,
            &params.student_id,
            params.date,
            params.start_time,
            block_minutes,
        )
        .with_type(params.meeting_type)
        .with_description(params.description)
        .with_window(&window.id);
        let entry =
            HistoryEntry::for_request(&request.id, &request.student_id, HistoryAction::Reserved);

        debug!(
            "reserving {} {} on window {} for {}",
            params.date, params.start_time, window.id, request.student_id
        );
        let lock = self.store.lock_window(&window.id).await;
        let request = self
            .store
            .commit_reservation(request, ConflictScope::WindowOwner, entry)
            .await?;
        drop(lock);

        let notification = Notification::new(
            &professor.id,
            NotificationKind::RequestReserved,
            format!(
                "{} reserved {} from {} to {}",
                student.display_name,
                request.date,
                request.start_time,
                request.end_time()
            ),
        )
        .with_request(&request.id);
        if let Err(err) = self.notifier.notify(notification).await {
            warn!("failed to deliver reservation notification: {err}");
        }

        Ok(request)
    }

    /// File a proposal inside the shared availability of both parties.
    ///
    /// No window is involved and no lock is taken; the commit's conflict
    /// check guards both parties' calendars.
    pub async fn propose(&self, params: ProposeRequest) -> Result<MeetingRequest> {
        if params.project_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("project_id").into());
        }
        if params.professor_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("professor_id").into());
        }
        if params.student_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("student_id").into());
        }
        if params.proposed_by != params.professor_id && params.proposed_by != params.student_id {
            return Err(SchedulingError::NotAuthorized {
                actor: params.proposed_by.clone(),
                resource: format!("project {}", params.project_id),
            });
        }

        let professor = self.resolve_role(&params.professor_id, Role::Professor).await?;
        let student = self.resolve_role(&params.student_id, Role::Student).await?;
        self.ensure_member(&params.project_id, &professor.id).await?;
        self.ensure_member(&params.project_id, &student.id).await?;

        if params.duration_minutes == 0 || params.duration_minutes > 480 {
            return Err(ValidationError::InvalidDuration(params.duration_minutes).into());
        }
        let today = Utc::now().date_naive();
        if params.date <= today {
            return Err(ValidationError::PastDate(params.date).into());
        }
        let end_time =
            params.start_time + Duration::minutes(i64::from(params.duration_minutes));
        // A span wrapping past midnight can never sit inside a same-day window.
        if end_time <= params.start_time {
            return Err(ValidationError::InvalidDuration(params.duration_minutes).into());
        }

        if !self
            .matcher
            .covers(
                &params.professor_id,
                &params.student_id,
                params.date,
                params.start_time,
                end_time,
            )
            .await?
        {
            return Err(ValidationError::OutsideSharedAvailability(
                params.professor_id.clone(),
                params.student_id.clone(),
            )
            .into());
        }

        let request = MeetingRequest::new(
            &params.project_id,
            &params.professor_id,
            &params.student_id,
            params.date,
            params.start_time,
            params.duration_minutes,
        )
        .with_type(params.meeting_type)
        .with_description(params.description)
        .requested_by(&params.proposed_by);
        let entry =
            HistoryEntry::for_request(&request.id, &params.proposed_by, HistoryAction::Proposed);

        debug!(
            "proposing {} {} for {} and {}",
            params.date, params.start_time, params.professor_id, params.student_id
        );
        let request = self
            .store
            .commit_reservation(request, ConflictScope::BothParties, entry)
            .await?;

        let (recipient, proposer_name) = if params.proposed_by == professor.id {
            (&student, professor.display_name.clone())
        } else {
            (&professor, student.display_name.clone())
        };
        let notification = Notification::new(
            &recipient.id,
            NotificationKind::RequestProposed,
            format!(
                "{} proposed a meeting on {} at {}",
                proposer_name, request.date, request.start_time
            ),
        )
        .with_request(&request.id);
        if let Err(err) = self.notifier.notify(notification).await {
            warn!("failed to deliver proposal notification: {err}");
        }

        Ok(request)
    }

    async fn resolve_role(&self, user_id: &str, expected: Role) -> Result<UserProfile> {
        let profile = self
            .directory
            .lookup(user_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownUser(user_id.to_string()))?;
        if profile.role != expected {
            return Err(ValidationError::RoleMismatch {
                user: user_id.to_string(),
                expected: expected.as_str().to_string(),
            }
            .into());
        }
        Ok(profile)
    }

    async fn ensure_member(&self, project_id: &str, user_id: &str) -> Result<()> {
        if !self.roster.is_member(project_id, user_id).await? {
            return Err(SchedulingError::NotAuthorized {
                actor: user_id.to_string(),
                resource: format!("project {project_id}"),
            });
        }
        Ok(())
    }
}
