//! Core types for availability, reservations, meetings and audit history.
//!
//! This module defines the persistent records the scheduling engine operates
//! on, together with their state enums and the small value types produced by
//! the slot expander and the availability matcher.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::SchedulingConfig;
use crate::error::ValidationError;

// ============================================================================
// Roles
// ============================================================================

/// Canonical party role within a thesis project.
///
/// The surrounding platform historically encoded roles both as strings and as
/// numeric codes; `parse` accepts the legacy spellings so the reconciliation
/// happens once, at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Professor,
    Student,
}

impl Role {
    /// Parse a role from its canonical or legacy representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "professor" | "prof" | "1" => Some(Self::Professor),
            "student" | "2" => Some(Self::Student),
            _ => None,
        }
    }

    /// Get the role as its canonical string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professor => "professor",
            Self::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Availability Windows
// ============================================================================

/// When an availability window applies.
///
/// Exactly one of the two shapes holds, which the enum makes structural:
/// a window either repeats weekly on one day or covers a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WindowRecurrence {
    /// Repeats every week on the given day. 0=Mon, 1=Tue, ..., 6=Sun.
    Weekly { weekday: u8 },
    /// Applies only to this calendar date.
    Date { date: NaiveDate },
}

impl WindowRecurrence {
    /// Weekly recurrence on the given day.
    pub fn weekly(weekday: Weekday) -> Self {
        Self::Weekly {
            weekday: weekday_index(weekday),
        }
    }

    /// Single-date window.
    pub fn on(date: NaiveDate) -> Self {
        Self::Date { date }
    }

    /// The recurring weekday, if this is a weekly window.
    pub fn weekday(&self) -> Option<Weekday> {
        match self {
            Self::Weekly { weekday } => weekday_from_index(*weekday),
            Self::Date { .. } => None,
        }
    }

    /// The literal date, if this is a date-specific window.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Weekly { .. } => None,
            Self::Date { date } => Some(*date),
        }
    }

    /// Whether the window applies on the given calendar date.
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        match self {
            Self::Weekly { weekday } => weekday_index(date.weekday()) == *weekday,
            Self::Date { date: d } => *d == date,
        }
    }

    /// Human-readable description, used in validation messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Weekly { weekday } => format!("every {}", weekday_name(*weekday)),
            Self::Date { date } => date.to_string(),
        }
    }
}

/// A declared span of free time belonging to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// Unique identifier.
    pub id: String,
    /// User that published the window.
    pub owner_id: String,
    /// Weekly or date-specific applicability.
    pub recurrence: WindowRecurrence,
    /// Start of the free span.
    pub start_time: NaiveTime,
    /// End of the free span (exclusive).
    pub end_time: NaiveTime,
    /// Whether the owner still offers this window.
    pub active: bool,
    /// Whether a reservation currently holds the window.
    pub held: bool,
    /// The request holding the window, when `held` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_by: Option<String>,
    /// When the window was published.
    pub created_at: DateTime<Utc>,
    /// When the window was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityWindow {
    fn new(
        owner_id: impl Into<String>,
        recurrence: WindowRecurrence,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            recurrence,
            start_time,
            end_time,
            active: true,
            held: false,
            held_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a weekly recurring window.
    pub fn weekly(
        owner_id: impl Into<String>,
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self::new(
            owner_id,
            WindowRecurrence::weekly(weekday),
            start_time,
            end_time,
        )
    }

    /// Create a window for a single calendar date.
    pub fn on_date(
        owner_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self::new(owner_id, WindowRecurrence::on(date), start_time, end_time)
    }

    /// Whether the window applies on the given calendar date.
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.recurrence.matches_date(date)
    }

    /// Validate the window against platform rules before publication.
    pub fn validate(
        &self,
        config: &SchedulingConfig,
        today: NaiveDate,
    ) -> Result<(), ValidationError> {
        if self.owner_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("owner_id"));
        }

        if self.start_time >= self.end_time {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start_time,
                end: self.end_time,
            });
        }

        let span = self.end_time - self.start_time;
        if span < Duration::minutes(i64::from(config.block_minutes)) {
            return Err(ValidationError::WindowTooShort(config.block_minutes));
        }

        if !config
            .office_hours
            .contains(self.start_time, self.end_time)
        {
            return Err(ValidationError::OutsideOfficeHours {
                start: self.start_time,
                end: self.end_time,
                open: config.office_hours.open,
                close: config.office_hours.close,
            });
        }

        if !config.office_hours.allow_weekends {
            let weekend = match self.recurrence {
                WindowRecurrence::Weekly { weekday } => weekday >= 5,
                WindowRecurrence::Date { date } => {
                    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
                }
            };
            if weekend {
                return Err(ValidationError::WeekendNotAllowed);
            }
        }

        if let Some(date) = self.recurrence.date() {
            if date <= today {
                return Err(ValidationError::PastDate(date));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Meeting Requests
// ============================================================================

/// Kind of meeting being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    /// Regular advising session.
    #[default]
    Advising,
    /// Review of a thesis draft or chapter.
    ThesisReview,
    /// Defense rehearsal or committee meeting.
    Defense,
    /// Anything else.
    General,
}

impl MeetingType {
    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Advising => "Advising",
            Self::ThesisReview => "Thesis Review",
            Self::Defense => "Defense",
            Self::General => "General",
        }
    }
}

/// Lifecycle state of a meeting request. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Waiting for the counterpart's decision.
    #[default]
    Pending,
    /// Accepted; a meeting was created from it.
    Accepted,
    /// Declined, or invalidated by a cancellation.
    Rejected,
}

impl RequestState {
    /// Get the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// A proposed, not-yet-confirmed meeting between a professor and a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequest {
    /// Unique identifier.
    pub id: String,
    /// Thesis project the meeting concerns.
    pub project_id: String,
    /// Professor party.
    pub professor_id: String,
    /// Student party.
    pub student_id: String,
    /// Proposed calendar date.
    pub date: NaiveDate,
    /// Proposed start time.
    pub start_time: NaiveTime,
    /// Proposed duration in minutes.
    pub duration_minutes: u32,
    /// Kind of meeting.
    pub meeting_type: MeetingType,
    /// Free-text description.
    pub description: String,
    /// Current state.
    pub state: RequestState,
    /// Party that created the request; only its counterpart may respond.
    pub requested_by: String,
    /// Who responded, once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_by: Option<String>,
    /// When the response was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    /// Comment attached to the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_comment: Option<String>,
    /// Availability window backing the request. Auto-matched proposals have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<String>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl MeetingRequest {
    /// Create a new pending request. `requested_by` defaults to the student,
    /// which is the direct-reservation case.
    pub fn new(
        project_id: impl Into<String>,
        professor_id: impl Into<String>,
        student_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: u32,
    ) -> Self {
        let now = Utc::now();
        let student_id = student_id.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            professor_id: professor_id.into(),
            student_id: student_id.clone(),
            date,
            start_time,
            duration_minutes,
            meeting_type: MeetingType::default(),
            description: String::new(),
            state: RequestState::Pending,
            requested_by: student_id,
            responded_by: None,
            responded_at: None,
            response_comment: None,
            window_id: None,
            created_at: now,
            updated_at: now,
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

    /// Reference the availability window backing this request.
    pub fn with_window(mut self, window_id: impl Into<String>) -> Self {
        self.window_id = Some(window_id.into());
        self
    }

    /// Attribute the request to a specific party.
    pub fn requested_by(mut self, user_id: impl Into<String>) -> Self {
        self.requested_by = user_id.into();
        self
    }

    /// End time of the proposed span.
    pub fn end_time(&self) -> NaiveTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether the given user is the professor or the student of this request.
    pub fn is_party(&self, user_id: &str) -> bool {
        self.professor_id == user_id || self.student_id == user_id
    }

    /// The other party, when `user_id` is one of the two.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.professor_id == user_id {
            Some(&self.student_id)
        } else if self.student_id == user_id {
            Some(&self.professor_id)
        } else {
            None
        }
    }

    /// The party entitled to respond: the counterpart of whoever created it.
    pub fn responder_id(&self) -> &str {
        if self.requested_by == self.student_id {
            &self.professor_id
        } else {
            &self.student_id
        }
    }

    /// Whether the request still awaits a decision.
    pub fn is_open(&self) -> bool {
        self.state == RequestState::Pending
    }

    /// Whether the proposed span overlaps the given span on the same date.
    pub fn overlaps(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.date == date && spans_overlap(self.start_time, self.end_time(), start, end)
    }
}

// ============================================================================
// Meetings
// ============================================================================

/// Lifecycle state of a confirmed meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingState {
    /// Confirmed and upcoming.
    #[default]
    Scheduled,
    /// Took place; terminal.
    Completed,
    /// Called off; terminal.
    Cancelled,
    /// Superseded by a follow-up request; terminal.
    Rescheduled,
}

impl MeetingState {
    /// Get the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        }
    }

    /// Terminal states admit no further lifecycle actions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

/// A confirmed calendar meeting, created exclusively from an accepted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    /// Unique identifier.
    pub id: String,
    /// The request this meeting was created from.
    pub request_id: String,
    /// Thesis project the meeting concerns.
    pub project_id: String,
    /// Professor party.
    pub professor_id: String,
    /// Student party.
    pub student_id: String,
    /// Calendar date.
    pub date: NaiveDate,
    /// Start time.
    pub start_time: NaiveTime,
    /// End time (exclusive).
    pub end_time: NaiveTime,
    /// Kind of meeting.
    pub meeting_type: MeetingType,
    /// Display title.
    pub title: String,
    /// Free-text description carried over from the request.
    pub description: String,
    /// Current state.
    pub state: MeetingState,
    /// When the meeting was created.
    pub created_at: DateTime<Utc>,
    /// When the meeting was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Build a scheduled meeting from an accepted request.
    pub fn from_request(request: &MeetingRequest, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            project_id: request.project_id.clone(),
            professor_id: request.professor_id.clone(),
            student_id: request.student_id.clone(),
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time(),
            meeting_type: request.meeting_type,
            title: title.into(),
            description: request.description.clone(),
            state: MeetingState::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given user is the professor or the student of this meeting.
    pub fn is_party(&self, user_id: &str) -> bool {
        self.professor_id == user_id || self.student_id == user_id
    }

    /// The other party, when `user_id` is one of the two.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.professor_id == user_id {
            Some(&self.student_id)
        } else if self.student_id == user_id {
            Some(&self.professor_id)
        } else {
            None
        }
    }

    /// Duration of the meeting in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Whether the meeting overlaps the given span on the same date.
    pub fn overlaps(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.date == date && spans_overlap(self.start_time, self.end_time, start, end)
    }
}

// ============================================================================
// History
// ============================================================================

/// Audited state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// A block was reserved against an availability window.
    Reserved,
    /// A request was created by the auto-match flow.
    Proposed,
    /// A pending request was accepted.
    Accepted,
    /// A pending request was rejected.
    Rejected,
    /// A scheduled meeting was cancelled.
    Cancelled,
    /// A scheduled meeting was moved to a new slot.
    Rescheduled,
    /// A scheduled meeting took place.
    Completed,
}

impl HistoryAction {
    /// Get the action as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Proposed => "proposed",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable audit record of one state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier.
    pub id: String,
    /// Request the transition concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Meeting the transition concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<String>,
    /// User that triggered the transition.
    pub actor_id: String,
    /// What happened.
    pub action: HistoryAction,
    /// Optional comment (response comment, cancellation reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// When the transition was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Entry for a request transition.
    pub fn for_request(
        request_id: impl Into<String>,
        actor_id: impl Into<String>,
        action: HistoryAction,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: Some(request_id.into()),
            meeting_id: None,
            actor_id: actor_id.into(),
            action,
            comment: None,
            recorded_at: Utc::now(),
        }
    }

    /// Entry for a meeting transition.
    pub fn for_meeting(
        meeting_id: impl Into<String>,
        actor_id: impl Into<String>,
        action: HistoryAction,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: None,
            meeting_id: Some(meeting_id.into()),
            actor_id: actor_id.into(),
            action,
            comment: None,
            recorded_at: Utc::now(),
        }
    }

    /// Also reference the request involved in a meeting transition.
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Also reference the meeting involved in a request transition.
    pub fn with_meeting(mut self, meeting_id: impl Into<String>) -> Self {
        self.meeting_id = Some(meeting_id.into());
        self
    }

    /// Attach a comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

// ============================================================================
// Slot and Match Output Types
// ============================================================================

/// A reservable block produced by the slot expander.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSlot {
    /// Concrete calendar date of the block.
    pub date: NaiveDate,
    /// Block start.
    pub start_time: NaiveTime,
    /// Block end (exclusive).
    pub end_time: NaiveTime,
    /// Window the block was expanded from.
    pub window_id: String,
}

/// A weekly span two users are both free in, produced by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedWindow {
    /// Day the overlap falls on. 0=Mon, 1=Tue, ..., 6=Sun.
    pub weekday: u8,
    /// Start of the overlap.
    pub start_time: NaiveTime,
    /// End of the overlap (exclusive).
    pub end_time: NaiveTime,
    /// Contributing window of the first user.
    pub window_a: String,
    /// Contributing window of the second user.
    pub window_b: String,
}

impl SharedWindow {
    /// The overlap day as a chrono weekday.
    pub fn day(&self) -> Weekday {
        weekday_from_index(self.weekday).unwrap_or(Weekday::Mon)
    }

    /// Length of the overlap in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Half-open interval overlap on one day.
pub(crate) fn spans_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Days-from-Monday index for a weekday.
pub(crate) fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_monday() as u8
}

/// Weekday for a days-from-Monday index.
pub(crate) fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_name(index: u8) -> &'static str {
    match index {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}
