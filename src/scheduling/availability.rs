//! Publication and withdrawal of availability windows.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
use tracing::debug;

use crate::config::SchedulingConfig;
use crate::error::{Result, SchedulingError};
use crate::scheduling::types::AvailabilityWindow;
use crate::store::SchedulingStore;

/// Manages the windows a user offers for reservation.
///
/// Windows are published by their owner and withdrawn by their owner; holds
/// and releases are applied only by the reservation and response paths.
pub struct AvailabilityManager<S: SchedulingStore> {
    store: Arc<S>,
    config: SchedulingConfig,
}

impl<S: SchedulingStore> AvailabilityManager<S> {
    /// Create a new availability manager.
    pub fn new(store: Arc<S>, config: SchedulingConfig) -> Self {
        Self { store, config }
    }

    /// Publish a weekly recurring window.
    pub async fn publish_weekly(
        &self,
        owner_id: &str,
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<AvailabilityWindow> {
        self.publish(AvailabilityWindow::weekly(
            owner_id, weekday, start_time, end_time,
        ))
        .await
    }

    /// Publish a window for a single calendar date.
    pub async fn publish_on_date(
        &self,
        owner_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<AvailabilityWindow> {
        self.publish(AvailabilityWindow::on_date(
            owner_id, date, start_time, end_time,
        ))
        .await
    }

    async fn publish(&self, window: AvailabilityWindow) -> Result<AvailabilityWindow> {
        window.validate(&self.config, Utc::now().date_naive())?;
        debug!(
            "publishing window {} ({}) for {}",
            window.id,
            window.recurrence.describe(),
            window.owner_id
        );
        self.store.add_window(window.clone()).await?;
        Ok(window)
    }

    /// Withdraw a window from future expansion. Only the owner may do this;
    /// an existing hold is unaffected, the window just stops being offered.
    pub async fn deactivate(&self, owner_id: &str, window_id: &str) -> Result<AvailabilityWindow> {
        let window = self
            .store
            .get_window(window_id)
            .await?
            .ok_or_else(|| SchedulingError::WindowInactive(window_id.to_string()))?;
        if window.owner_id != owner_id {
            return Err(SchedulingError::NotAuthorized {
                actor: owner_id.to_string(),
                resource: format!("window {window_id}"),
            });
        }
        debug!("deactivating window {} for {}", window_id, owner_id);
        self.store.set_window_active(window_id, false).await
    }

    /// All windows a user has published, active or not.
    pub async fn windows_for(&self, owner_id: &str) -> Result<Vec<AvailabilityWindow>> {
        self.store.list_windows(owner_id).await
    }
}
