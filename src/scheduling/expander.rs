//! Expansion of availability windows into concrete reservable blocks.
//!
//! The expander is a pure function of current store state: it projects each
//! active window of an owner onto concrete dates over a bounded horizon,
//! splits every occurrence into fixed-size blocks, and drops blocks already
//! consumed by a live request or a scheduled meeting. Calling it twice
//! without an intervening mutation yields identical output.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use tracing::debug;

use crate::config::SchedulingConfig;
use crate::error::Result;
use crate::scheduling::types::{
    weekday_from_index, AvailabilityWindow, MeetingState, OpenSlot, RequestState,
    WindowRecurrence,
};
use crate::store::SchedulingStore;

/// Turns windows into a chronological list of open 30-minute blocks.
pub struct SlotExpander<S: SchedulingStore> {
    store: Arc<S>,
    config: SchedulingConfig,
}

impl<S: SchedulingStore> SlotExpander<S> {
    /// Create a new slot expander.
    pub fn new(store: Arc<S>, config: SchedulingConfig) -> Self {
        Self { store, config }
    }

    /// Open blocks for the owner over the configured horizon, starting today.
    pub async fn open_slots(&self, owner_id: &str) -> Result<Vec<OpenSlot>> {
        self.open_slots_from(owner_id, Utc::now().date_naive(), self.config.horizon_days)
            .await
    }

    /// Open blocks from an explicit reference date over an explicit horizon.
    ///
    /// Occurrences are strictly after `today` and at most `horizon_days`
    /// days out. A window backing a still-pending request is skipped whole;
    /// a window whose hold was resolved expands again, with consumed blocks
    /// filtered out individually.
    pub async fn open_slots_from(
        &self,
        owner_id: &str,
        today: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<OpenSlot>> {
        let limit = today + Duration::days(i64::from(horizon_days));
        let windows = self.store.list_windows(owner_id).await?;
        debug!(
            "expanding {} windows for {} between {} and {}",
            windows.len(),
            owner_id,
            today,
            limit
        );

        let mut slots = Vec::new();
        for window in windows {
            if !window.active {
                continue;
            }
            if self.backs_pending_request(&window).await? {
                continue;
            }
            for date in occurrences(&window, today, limit) {
                self.collect_open_blocks(&window, date, &mut slots).await?;
            }
        }

        slots.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.start_time.cmp(&b.start_time))
                .then(a.window_id.cmp(&b.window_id))
        });
        Ok(slots)
    }

    /// Whether the window is held by a request that is still pending.
    async fn backs_pending_request(&self, window: &AvailabilityWindow) -> Result<bool> {
        if !window.held {
            return Ok(false);
        }
        match &window.held_by {
            Some(request_id) => Ok(self
                .store
                .get_request(request_id)
                .await?
                .map(|request| request.state == RequestState::Pending)
                .unwrap_or(true)),
            None => Ok(true),
        }
    }

    /// Split one window occurrence into blocks and keep the unconsumed ones.
    async fn collect_open_blocks(
        &self,
        window: &AvailabilityWindow,
        date: NaiveDate,
        slots: &mut Vec<OpenSlot>,
    ) -> Result<()> {
        // Both tables are conflict sources: a meeting can exist without a
        // live request holding the window.
        let requests = self
            .store
            .list_requests_for(&window.owner_id, Some(date))
            .await?;
        let meetings = self
            .store
            .list_meetings_for(&window.owner_id, Some(date))
            .await?;

        let block = Duration::minutes(i64::from(self.config.block_minutes));
        let mut start = window.start_time;
        loop {
            let end = start + block;
            // The second clause catches wrap-around past midnight.
            if end > window.end_time || end <= start {
                break;
            }

            let consumed = requests.iter().any(|r| {
                matches!(r.state, RequestState::Pending | RequestState::Accepted)
                    && r.overlaps(date, start, end)
            }) || meetings
                .iter()
                .any(|m| m.state == MeetingState::Scheduled && m.overlaps(date, start, end));

            if !consumed {
                slots.push(OpenSlot {
                    date,
                    start_time: start,
                    end_time: end,
                    window_id: window.id.clone(),
                });
            }
            start = end;
        }
        Ok(())
    }
}

/// Concrete dates a window applies to, strictly after `today`, up to `limit`.
fn occurrences(window: &AvailabilityWindow, today: NaiveDate, limit: NaiveDate) -> Vec<NaiveDate> {
    match window.recurrence {
        WindowRecurrence::Weekly { weekday } => {
            let Some(weekday) = weekday_from_index(weekday) else {
                return Vec::new();
            };
            let mut date = next_occurrence(today, weekday);
            let mut dates = Vec::new();
            while date <= limit {
                dates.push(date);
                date += Duration::days(7);
            }
            dates
        }
        WindowRecurrence::Date { date } => {
            if date > today && date <= limit {
                vec![date]
            } else {
                Vec::new()
            }
        }
    }
}

/// First date strictly after `today` falling on the given weekday.
pub fn next_occurrence(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let today_index = i64::from(today.weekday().num_days_from_monday());
    let target_index = i64::from(weekday.num_days_from_monday());
    let mut days_ahead = (target_index - today_index).rem_euclid(7);
    if days_ahead == 0 {
        days_ahead = 7;
    }
    today + Duration::days(days_ahead)
}
