//! Pairwise intersection of two users' recurring availability.
//!
//! Used by the find-and-propose flow to discover spans both parties are
//! free in. Direct reservation never consults the matcher.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveTime};
use tracing::debug;

use crate::error::Result;
use crate::scheduling::types::{
    weekday_index, AvailabilityWindow, SharedWindow, WindowRecurrence,
};
use crate::store::SchedulingStore;

/// Computes weekly overlap between two users' availability.
pub struct AvailabilityMatcher<S: SchedulingStore> {
    store: Arc<S>,
}

impl<S: SchedulingStore> AvailabilityMatcher<S> {
    /// Create a new availability matcher.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All weekly spans the two users are both free in.
    ///
    /// Only active recurring windows take part; date-specific windows are a
    /// direct-reservation concern. Every intersecting pair is returned,
    /// ordered by weekday and earliest start.
    pub async fn shared_windows(&self, user_a: &str, user_b: &str) -> Result<Vec<SharedWindow>> {
        let windows_a = recurring_active(self.store.list_windows(user_a).await?);
        let windows_b = recurring_active(self.store.list_windows(user_b).await?);
        debug!(
            "matching {} windows of {} against {} windows of {}",
            windows_a.len(),
            user_a,
            windows_b.len(),
            user_b
        );

        let mut shared = Vec::new();
        for (day_a, window_a) in &windows_a {
            for (day_b, window_b) in &windows_b {
                if day_a != day_b {
                    continue;
                }
                let start = window_a.start_time.max(window_b.start_time);
                let end = window_a.end_time.min(window_b.end_time);
                if start < end {
                    shared.push(SharedWindow {
                        weekday: *day_a,
                        start_time: start,
                        end_time: end,
                        window_a: window_a.id.clone(),
                        window_b: window_b.id.clone(),
                    });
                }
            }
        }

        shared.sort_by(|a, b| {
            a.weekday
                .cmp(&b.weekday)
                .then(a.start_time.cmp(&b.start_time))
                .then(a.end_time.cmp(&b.end_time))
                .then(a.window_a.cmp(&b.window_a))
        });
        Ok(shared)
    }

    /// Whether the concrete span lies entirely inside some shared window of
    /// the two users, on the matching weekday.
    pub async fn covers(
        &self,
        user_a: &str,
        user_b: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<bool> {
        let weekday = weekday_index(date.weekday());
        let shared = self.shared_windows(user_a, user_b).await?;
        Ok(shared
            .iter()
            .any(|s| s.weekday == weekday && start >= s.start_time && end <= s.end_time))
    }
}

/// Active weekly windows paired with their weekday index.
fn recurring_active(windows: Vec<AvailabilityWindow>) -> Vec<(u8, AvailabilityWindow)> {
    windows
        .into_iter()
        .filter(|w| w.active)
        .filter_map(|w| match w.recurrence {
            WindowRecurrence::Weekly { weekday } => Some((weekday, w)),
            WindowRecurrence::Date { .. } => None,
        })
        .collect()
}
