//! Tests for reserving open blocks and proposing meetings.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc, Weekday};

use convene::{
    next_occurrence, MemoryStore, ProposeRequest, RequestState, ReserveRequest, Role, Scheduler,
    SchedulingError, StaticDirectory, StaticRoster, UserProfile, ValidationError,
};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn next_monday() -> NaiveDate {
    next_occurrence(Utc::now().date_naive(), Weekday::Mon)
}

/// Scheduler over a fresh in-memory store with two thesis projects
/// supervised by the same professor.
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

#[tokio::test]
async fn test_reserve_creates_pending_request_and_holds_window() {
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

    assert_eq!(request.state, RequestState::Pending);
    assert_eq!(request.professor_id, "prof-1");
    assert_eq!(request.requested_by, "stu-1");
    assert_eq!(request.window_id.as_deref(), Some(window.id.as_str()));

    let window = scheduler.windows_for("prof-1").await.unwrap().remove(0);
    assert!(window.held);
    assert_eq!(window.held_by.as_deref(), Some(request.id.as_str()));
}

#[tokio::test]
async fn test_held_window_rejects_a_second_reservation() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();
    let date = next_monday();

    scheduler
        .reserve(ReserveRequest::new(
            &window.id, "proj-1", "stu-1", date, t(10, 0), t(10, 30),
        ))
        .await
        .unwrap();

    // Another block of the same window is still off-limits while the
    // first request is pending.
    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id, "proj-2", "stu-2", date, t(10, 30), t(11, 0),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::SlotUnavailable { .. }));
}

#[tokio::test]
async fn test_concurrent_reservations_have_one_winner() {
    let scheduler = Arc::new(scheduler());
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();
    let date = next_monday();

    let first = {
        let scheduler = scheduler.clone();
        let window_id = window.id.clone();
        tokio::spawn(async move {
            scheduler
                .reserve(ReserveRequest::new(
                    &window_id, "proj-1", "stu-1", date, t(10, 0), t(10, 30),
                ))
                .await
        })
    };
    let second = {
        let scheduler = scheduler.clone();
        let window_id = window.id.clone();
        tokio::spawn(async move {
            scheduler
                .reserve(ReserveRequest::new(
                    &window_id, "proj-2", "stu-2", date, t(10, 0), t(10, 30),
                ))
                .await
        })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    let loss = outcomes
        .into_iter()
        .find(|o| o.is_err())
        .unwrap()
        .unwrap_err();
    assert!(matches!(loss, SchedulingError::SlotUnavailable { .. }));

    // The losing attempt wrote nothing.
    let requests = scheduler.requests_for("prof-1", None).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].state, RequestState::Pending);
}

#[tokio::test]
async fn test_misaligned_blocks_are_rejected() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();
    let date = next_monday();

    // Off-grid start.
    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id, "proj-1", "stu-1", date, t(10, 15), t(10, 45),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::MisalignedBlock { .. })
    ));

    // Double-length block.
    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id, "proj-1", "stu-1", date, t(10, 0), t(11, 0),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::MisalignedBlock { .. })
    ));

    // Past the end of the window.
    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id, "proj-1", "stu-1", date, t(11, 0), t(11, 30),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::MisalignedBlock { .. })
    ));
}

#[tokio::test]
async fn test_reserve_checks_date_against_recurrence() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();

    let tuesday = next_monday() + Duration::days(1);
    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id, "proj-1", "stu-1", tuesday, t(10, 0), t(10, 30),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::WindowDateMismatch { .. })
    ));
}

#[tokio::test]
async fn test_reserve_enforces_project_membership() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();

    // stu-2 is not on proj-1.
    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id,
            "proj-1",
            "stu-2",
            next_monday(),
            t(10, 0),
            t(10, 30),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotAuthorized { .. }));
}

#[tokio::test]
async fn test_reserve_validates_directory_roles() {
    let scheduler = scheduler();
    let window = scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(11, 0))
        .await
        .unwrap();

    // A professor id in the student seat fails role validation.
    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id,
            "proj-1",
            "prof-1",
            next_monday(),
            t(10, 0),
            t(10, 30),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::RoleMismatch { .. })
    ));

    let err = scheduler
        .reserve(ReserveRequest::new(
            &window.id,
            "proj-1",
            "stu-9",
            next_monday(),
            t(10, 0),
            t(10, 30),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::UnknownUser(_))
    ));
}

#[tokio::test]
async fn test_propose_requires_shared_availability() {
    let scheduler = scheduler();
    scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(12, 0))
        .await
        .unwrap();
    scheduler
        .publish_weekly("stu-1", Weekday::Mon, t(11, 0), t(13, 0))
        .await
        .unwrap();

    // 10:00 is outside the student's availability.
    let err = scheduler
        .propose(ProposeRequest::new(
            "proj-1",
            "prof-1",
            "stu-1",
            next_monday(),
            t(10, 0),
            30,
            "prof-1",
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::Validation(ValidationError::OutsideSharedAvailability(_, _))
    ));

    // 11:00 to 12:00 lies inside the overlap; duration is free-form.
    let request = scheduler
        .propose(ProposeRequest::new(
            "proj-1",
            "prof-1",
            "stu-1",
            next_monday(),
            t(11, 0),
            60,
            "prof-1",
        ))
        .await
        .unwrap();
    assert_eq!(request.state, RequestState::Pending);
    assert_eq!(request.requested_by, "prof-1");
    assert_eq!(request.duration_minutes, 60);
    assert!(request.window_id.is_none());
}

#[tokio::test]
async fn test_propose_rejects_outside_initiators() {
    let scheduler = scheduler();
    scheduler
        .publish_weekly("prof-1", Weekday::Mon, t(10, 0), t(12, 0))
        .await
        .unwrap();
    scheduler
        .publish_weekly("stu-1", Weekday::Mon, t(10, 0), t(12, 0))
        .await
        .unwrap();

    let err = scheduler
        .propose(ProposeRequest::new(
            "proj-1",
            "prof-1",
            "stu-1",
            next_monday(),
            t(10, 0),
            30,
            "stu-2",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotAuthorized { .. }));
}
