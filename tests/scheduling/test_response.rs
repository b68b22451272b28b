//! Tests for accept/reject responses and their effect on slot expansion.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc, Weekday};

use convene::{
    next_occurrence, Decision, MeetingState, MemoryStore, NotificationKind, RecordingNotifier,
    RequestState, ReserveRequest, Role, Scheduler, SchedulingError, StaticDirectory, StaticRoster,
    UserProfile,
};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn next_monday() -> NaiveDate {
    next_occurrence(Utc::now().date_naive(), Weekday::Mon)
}

fn scheduler_with_notifier() -> (Scheduler<MemoryStore>, Arc<RecordingNotifier>) {
    let directory = StaticDirectory::new()
        .with_user(UserProfile::new("prof-1", "Dr. Vega", Role::Professor))
        .with_user(UserProfile::new("stu-1", "Dana Kim", Role::Student))
        .with_user(UserProfile::new("stu-2", "Lee Moss", Role::Student));
    let roster = StaticRoster::new()
        .with_member("proj-1", "prof-1")
        .with_member("proj-1", "stu-1")
        .with_member("proj-2", "prof-1")
        .with_member("proj-2", "stu-2");
    let notifier = Arc::new(RecordingNotifier::new());
    let scheduler = Scheduler::builder(Arc::new(MemoryStore::new()))
        .directory(Arc::new(directory))
        .roster(Arc::new(roster))
        .notifier(notifier.clone())
        .build()
        .unwrap();
    (scheduler, notifier)
}

fn scheduler() -> Scheduler<MemoryStore> {
    scheduler_with_notifier().0
}

#[tokio::test]
async fn test_accept_schedules_only_the_reserved_block() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(12, 0))
        .await
        .unwrap();
    let date = next_monday();

    // Four blocks on each of the two Mondays inside the horizon.
    assert_eq!(scheduler.open_slots("prof-1").await.unwrap().len(), 8);

    let request = scheduler
        .reserve(ReserveRequest::new(
            &window.id,
            "proj-1",
            "stu-1",
            date,
            t(10, 30),
            t(11, 0),
        ))
        .await
        .unwrap();

    // A pending request hides the whole window from expansion.
    assert!(scheduler.open_slots("prof-1").await.unwrap().is_empty());

    let outcome = scheduler
        .respond(&request.id, "prof-1", Decision::Accept, None)
        .await
        .unwrap();
    let meeting = outcome.meeting.expect("accept produces a meeting");
    assert_eq!(outcome.request.state, RequestState::Accepted);
    assert_eq!(meeting.state, MeetingState::Scheduled);
    assert_eq!(meeting.date, date);
    assert_eq!(meeting.start_time, t(10, 30));
    assert_eq!(meeting.end_time, t(11, 0));

    // Only the accepted block is consumed; the rest reopen.
    let slots = scheduler.open_slots("prof-1").await.unwrap();
    assert_eq!(slots.len(), 7);
    assert!(!slots
        .iter()
        .any(|s| s.date == date && s.start_time == t(10, 30)));
    assert!(slots
        .iter()
        .any(|s| s.date == date && s.start_time == t(11, 0)));
}

#[tokio::test]
async fn test_reject_frees_the_window_for_rebooking() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();
    let date = next_monday();

    let request = scheduler
        .reserve(ReserveRequest::new(
            &window.id,
            "proj-1",
            "stu-1",
            date,
            t(10, 0),
            t(10, 30),
        ))
        .await
        .unwrap();

    let outcome = scheduler
        .respond(
            &request.id,
            "prof-1",
            Decision::Reject,
            Some("committee meeting".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(outcome.request.state, RequestState::Rejected);
    assert_eq!(
        outcome.request.response_comment.as_deref(),
        Some("committee meeting")
    );
    assert!(outcome.meeting.is_none());

    let window = scheduler.windows_for("prof-1").await.unwrap().remove(0);
    assert!(!window.held);
    assert!(window.held_by.is_none());

    // Every block is offered again and the same one can be rebooked.
    assert_eq!(scheduler.open_slots("prof-1").await.unwrap().len(), 4);
    let rebooked = scheduler
        .reserve(ReserveRequest::new(
            &window.id,
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
async fn test_second_response_is_rejected() {
    let scheduler = scheduler();
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
        .unwrap();
    let err = scheduler
        .respond(&request.id, "prof-1", Decision::Reject, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::AlreadyResponded(_)));
}

#[tokio::test]
async fn test_only_the_counterpart_may_respond() {
    let scheduler = scheduler();
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

    // Neither the requester nor an outsider may answer.
    for actor in ["stu-1", "stu-2"] {
        let err = scheduler
            .respond(&request.id, actor, Decision::Accept, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotAuthorized { .. }));
    }

    // The request is still open for the professor.
    let outcome = scheduler
        .respond(&request.id, "prof-1", Decision::Accept, None)
        .await
        .unwrap();
    assert!(outcome.meeting.is_some());
}

#[tokio::test]
async fn test_notifications_reach_the_right_parties() {
    let (scheduler, notifier) = scheduler_with_notifier();
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
        .unwrap();

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].recipient_id, "prof-1");
    assert_eq!(sent[0].kind, NotificationKind::RequestReserved);
    assert_eq!(sent[0].request_id.as_deref(), Some(request.id.as_str()));
    assert_eq!(sent[1].recipient_id, "stu-1");
    assert_eq!(sent[1].kind, NotificationKind::RequestAccepted);
    assert!(sent[1].meeting_id.is_some());
}
