//! Tests for cancelling, rescheduling and completing meetings.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc, Weekday};

use convene::{
    next_occurrence, Decision, Meeting, MeetingState, MemoryStore, RequestState, ReserveRequest,
    Role, Scheduler, SchedulingError, StaticDirectory, StaticRoster, UserProfile,
};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn next_monday() -> NaiveDate {
    next_occurrence(Utc::now().date_naive(), Weekday::Mon)
}

fn scheduler() -> Scheduler<MemoryStore> {
    let directory = StaticDirectory::new()
        .with_user(UserProfile::new("prof-1", "Dr. Vega", Role::Professor))
        .with_user(UserProfile::new("stu-1", "Dana Kim", Role::Student))
        .with_user(UserProfile::new("stu-2", "Lee Moss", Role::Student));
    let roster = StaticRoster::new()
        .with_member("proj-1", "prof-1")
        .with_member("proj-1", "stu-1")
        .with_member("proj-2", "prof-1")
        .with_member("proj-2", "stu-2");
    Scheduler::builder(Arc::new(MemoryStore::new()))
        .directory(Arc::new(directory))
        .roster(Arc::new(roster))
        .build()
        .unwrap()
}

/// Reserve the 10:00 block of a fresh Monday 10:00 to 11:00 window and
/// accept it, returning the scheduled meeting.
async fn scheduled_meeting(scheduler: &Scheduler<MemoryStore>) -> Meeting {
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();
    let request = scheduler
        .reserve(ReserveRequest::new(
            &window.id,
            "proj-1",
            "stu-1",
            next_monday(),
            t(10, 0),
            t(10, 30),
        ))
        .await
        .unwrap();
    scheduler
        .respond(&request.id, "prof-1", Decision::Accept, None)
        .await
        .unwrap()
        .meeting
        .unwrap()
}

#[tokio::test]
async fn test_cancel_frees_the_block_for_rebooking() {
    let scheduler = scheduler();
    let meeting = scheduled_meeting(&scheduler).await;
    let date = meeting.date;

    // One of four blocks is consumed across two Mondays: 3 + 4 remain.
    assert_eq!(scheduler.open_slots("prof-1").await.unwrap().len(), 7);

    let cancelled = scheduler
        .cancel(&meeting.id, "stu-1", Some("thesis draft not ready".to_string()))
        .await
        .unwrap();
    assert_eq!(cancelled.state, MeetingState::Cancelled);

    // The originating request carries the cancellation outcome.
    let request = scheduler
        .request(&meeting.request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.state, RequestState::Rejected);
    assert_eq!(
        request.response_comment.as_deref(),
        Some("thesis draft not ready")
    );

    // The block reopens and another project can take it.
    assert_eq!(scheduler.open_slots("prof-1").await.unwrap().len(), 8);
    let window_id = scheduler.windows_for("prof-1").await.unwrap()[0].id.clone();
    let rebooked = scheduler
        .reserve(ReserveRequest::new(
            &window_id,
            "proj-2",
            "stu-2",
            date,
            t(10, 0),
            t(10, 30),
        ))
        .await
        .unwrap();
    assert_eq!(rebooked.state, RequestState::Pending);
}

#[tokio::test]
async fn test_cancel_twice_reports_already_cancelled() {
    let scheduler = scheduler();
    let meeting = scheduled_meeting(&scheduler).await;

    scheduler.cancel(&meeting.id, "prof-1", None).await.unwrap();
    let err = scheduler
        .cancel(&meeting.id, "prof-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::AlreadyCancelled(_)));
}

#[tokio::test]
async fn test_only_parties_touch_the_meeting() {
    let scheduler = scheduler();
    let meeting = scheduled_meeting(&scheduler).await;

    let err = scheduler
        .cancel(&meeting.id, "stu-2", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotAuthorized { .. }));
    let err = scheduler
        .complete(&meeting.id, "stu-2")
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotAuthorized { .. }));
}

#[tokio::test]
async fn test_reschedule_supersedes_the_meeting() {
    let scheduler = scheduler();
    let meeting = scheduled_meeting(&scheduler).await;
    let new_date = next_monday() + Duration::days(2);

    let (superseded, successor) = scheduler
        .reschedule(&meeting.id, "prof-1", new_date, t(14, 0))
        .await
        .unwrap();
    assert_eq!(superseded.state, MeetingState::Rescheduled);
    assert_eq!(successor.state, RequestState::Pending);
    assert_eq!(successor.project_id, meeting.project_id);
    assert_eq!(successor.professor_id, "prof-1");
    assert_eq!(successor.student_id, "stu-1");
    assert_eq!(successor.duration_minutes, 30);
    assert_eq!(successor.requested_by, "prof-1");
    assert_eq!(successor.date, new_date);

    // The counterpart confirms the replacement.
    let outcome = scheduler
        .respond(&successor.id, "stu-1", Decision::Accept, None)
        .await
        .unwrap();
    let replacement = outcome.meeting.unwrap();
    assert_eq!(replacement.date, new_date);
    assert_eq!(replacement.start_time, t(14, 0));
    assert_eq!(replacement.end_time, t(14, 30));
}

#[tokio::test]
async fn test_reschedule_requires_a_scheduled_meeting() {
    let scheduler = scheduler();
    let meeting = scheduled_meeting(&scheduler).await;

    scheduler.cancel(&meeting.id, "prof-1", None).await.unwrap();
    let err = scheduler
        .reschedule(
            &meeting.id,
            "prof-1",
            next_monday() + Duration::days(2),
            t(14, 0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidState { .. }));
}

#[tokio::test]
async fn test_complete_is_terminal() {
    let scheduler = scheduler();
    let meeting = scheduled_meeting(&scheduler).await;

    let completed = scheduler.complete(&meeting.id, "prof-1").await.unwrap();
    assert_eq!(completed.state, MeetingState::Completed);

    let err = scheduler
        .complete(&meeting.id, "prof-1")
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidState { .. }));
    let err = scheduler
        .cancel(&meeting.id, "prof-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidState { .. }));
}
