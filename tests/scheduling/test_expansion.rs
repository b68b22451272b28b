//! Tests for slot expansion, availability matching and store persistence.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc, Weekday};
use tempfile::TempDir;

use convene::{
    next_occurrence, Decision, MeetingState, MemoryStore, RequestState, ReserveRequest, Role,
    Scheduler, SchedulingError, StaticDirectory, StaticRoster, UserProfile, ValidationError,
};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn next_monday() -> NaiveDate {
    next_occurrence(Utc::now().date_naive(), Weekday::Mon)
}

fn scheduler_on(store: Arc<MemoryStore>) -> Scheduler<MemoryStore> {
    let directory = StaticDirectory::new()
        .with_user(UserProfile::new("prof-1", "Dr. Vega", Role::Professor))
        .with_user(UserProfile::new("stu-1", "Dana Kim", Role::Student));
    let roster = StaticRoster::new()
        .with_member("proj-1", "prof-1")
        .with_member("proj-1", "stu-1");
    Scheduler::builder(store)
        .directory(Arc::new(directory))
        .roster(Arc::new(roster))
        .build()
        .unwrap()
}

fn scheduler() -> Scheduler<MemoryStore> {
    scheduler_on(Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_weekly_windows_expand_sorted() {
    let scheduler = scheduler();
    scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();

    let slots = scheduler.open_slots("prof-1").await.unwrap();
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0].date, next_monday());
    assert_eq!(slots[0].start_time, t(10, 0));
    assert_eq!(slots[0].end_time, t(10, 30));
    assert_eq!(slots[1].start_time, t(10, 30));
    assert_eq!(slots[2].date, next_monday() + Duration::days(7));
    assert_eq!(slots[2].start_time, t(10, 0));
}

#[tokio::test]
async fn test_horizon_excludes_far_windows() {
    let scheduler = scheduler();
    scheduler
        .publish_on_date("prof-1", next_monday(), t(10, 0), t(11, 0))
        .await
        .unwrap();
    scheduler
        .publish_on_date(
            "prof-1",
            next_monday() + Duration::days(14),
            t(10, 0),
            t(11, 0),
        )
        .await
        .unwrap();

    // Only the near window falls inside the 14-day horizon.
    let slots = scheduler.open_slots("prof-1").await.unwrap();
    assert_eq!(slots.len(), 2);
    assert!(slots.iter().all(|s| s.date == next_monday()));
}

#[tokio::test]
async fn test_deactivated_window_stops_expanding() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();
    assert_eq!(scheduler.open_slots("prof-1").await.unwrap().len(), 4);

    let retired = scheduler
        .deactivate_window("prof-1", &window.id)
        .await
        .unwrap();
    assert!(!retired.active);
    assert!(scheduler.open_slots("prof-1").await.unwrap().is_empty());

    // Only the owner may retire a window.
    let err = scheduler
        .deactivate_window("stu-1", &window.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotAuthorized { .. }));
}

#[tokio::test]
async fn test_publication_is_validated() {
    let scheduler = scheduler();

    let err = scheduler
        .publish_weekly("prof-1", Weekday::Sat, t(10, 0), t(11, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::WeekendNotAllowed)
    ));

    let err = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(7, 0), t(9, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::OutsideOfficeHours { .. })
    ));

    let err = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(10, 15))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::WindowTooShort(_))
    ));

    // A Monday well in the past.
    let err = scheduler
        .publish_on_date(
            "prof-1",
            NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            t(10, 0),
            t(11, 0),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::PastDate(_))
    ));
}

#[tokio::test]
async fn test_shared_windows_intersect_weekly_availability() {
    let scheduler = scheduler();
    scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(12, 0))
        .await
        .unwrap();
    scheduler
        .publish_weekly("prof-1", Weekday::Wed, t(9, 0), t(10, 0))
        .await
        .unwrap();
    scheduler
        .publish_weekly("stu-1", Weekday::Mon, t(11, 0), t(13, 0))
        .await
        .unwrap();

    let shared = scheduler.shared_windows("prof-1", "stu-1").await.unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].day(), Weekday::Mon);
    assert_eq!(shared[0].start_time, t(11, 0));
    assert_eq!(shared[0].end_time, t(12, 0));

    assert!(scheduler
        .shared_windows("prof-1", "nobody")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_persistence_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let date = next_monday();

    let (window_id, request_id, meeting_id) = {
        let store = Arc::new(MemoryStore::with_persistence(dir.path()).await.unwrap());
        let scheduler = scheduler_on(store);
        let window = scheduler
            .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
            .await
            .unwrap();
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
        let meeting = scheduler
            .respond(&request.id, "prof-1", Decision::Accept, None)
            .await
            .unwrap()
            .meeting
            .unwrap();
        (window.id, request.id, meeting.id)
    };

    let store = Arc::new(MemoryStore::with_persistence(dir.path()).await.unwrap());
    let scheduler = scheduler_on(store);

    let request = scheduler.request(&request_id).await.unwrap().unwrap();
    assert_eq!(request.state, RequestState::Accepted);
    let meeting = scheduler.meeting(&meeting_id).await.unwrap().unwrap();
    assert_eq!(meeting.state, MeetingState::Scheduled);
    assert_eq!(scheduler.request_history(&request_id).await.unwrap().len(), 2);

    // The accepted block stays consumed after the reload.
    let slots = scheduler.open_slots("prof-1").await.unwrap();
    assert_eq!(slots.len(), 3);
    assert!(slots.iter().all(|s| s.window_id == window_id));
    assert!(!slots
        .iter()
        .any(|s| s.date == date && s.start_time == t(10, 0)));
}
