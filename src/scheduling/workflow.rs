//! Acceptance and rejection of pending meeting requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directory::UserDirectory;
use crate::error::{Result, SchedulingError};
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::scheduling::types::{HistoryAction, HistoryEntry, Meeting, MeetingRequest};
use crate::store::{ResponseCommit, ResponseStamp, SchedulingStore};

/// Decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

/// Outcome of a response call.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    /// The resolved request.
    pub request: MeetingRequest,
    /// The meeting created on acceptance.
    pub meeting: Option<Meeting>,
}

/// Resolves pending requests into meetings or released slots.
pub struct ResponseWorkflow<S: SchedulingStore> {
    store: Arc<S>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl<S: SchedulingStore> ResponseWorkflow<S> {
    /// Create a new response workflow.
    pub fn new(
        store: Arc<S>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
        }
    }

    /// Accept or reject a pending request.
    ///
    /// Only the counterpart of the requesting party may respond. Acceptance
    /// creates the scheduled meeting and permanently consumes the backing
    /// window; rejection releases the window back to future expansion. The
    /// state precondition makes racing calls safe: whichever caller loses
    /// the race observes `AlreadyResponded`.
    pub async fn respond(
        &self,
        request_id: &str,
        responder_id: &str,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<ResponseOutcome> {
        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| SchedulingError::RequestNotFound(request_id.to_string()))?;

        if responder_id != request.responder_id() {
            return Err(SchedulingError::NotAuthorized {
                actor: responder_id.to_string(),
                resource: format!("request {request_id}"),
            });
        }
        if !request.is_open() {
            return Err(SchedulingError::AlreadyResponded(request_id.to_string()));
        }

        debug!("{} responds {:?} to request {}", responder_id, decision, request_id);
        let stamp = ResponseStamp::new(responder_id, comment.clone());

        let (request, meeting) = match decision {
            Decision::Accept => {
                let title = self.meeting_title(&request).await?;
                let meeting = Meeting::from_request(&request, title);
                let mut entry =
                    HistoryEntry::for_request(request_id, responder_id, HistoryAction::Accepted)
                        .with_meeting(&meeting.id);
                if let Some(comment) = &comment {
                    entry = entry.with_comment(comment.clone());
                }
                self.store
                    .commit_response(request_id, ResponseCommit::Accept { meeting }, stamp, entry)
                    .await?
            }
            Decision::Reject => {
                let mut entry =
                    HistoryEntry::for_request(request_id, responder_id, HistoryAction::Rejected);
                if let Some(comment) = &comment {
                    entry = entry.with_comment(comment.clone());
                }
                self.store
                    .commit_response(request_id, ResponseCommit::Reject, stamp, entry)
                    .await?
            }
        };

        let (kind, message) = match decision {
            Decision::Accept => (
                NotificationKind::RequestAccepted,
                format!(
                    "your meeting on {} at {} is confirmed",
                    request.date, request.start_time
                ),
            ),
            Decision::Reject => (
                NotificationKind::RequestRejected,
                format!(
                    "your request for {} at {} was declined",
                    request.date, request.start_time
                ),
            ),
        };
        let mut notification =
            Notification::new(&request.requested_by, kind, message).with_request(&request.id);
        if let Some(meeting) = &meeting {
            notification = notification.with_meeting(&meeting.id);
        }
        if let Err(err) = self.notifier.notify(notification).await {
            warn!("failed to deliver response notification: {err}");
        }

        Ok(ResponseOutcome { request, meeting })
    }

    /// Meeting title rendered from directory display names, with the raw
    /// identifier as fallback for users the directory cannot resolve.
    async fn meeting_title(&self, request: &MeetingRequest) -> Result<String> {
        let professor = self.display_name(&request.professor_id).await?;
        let student = self.display_name(&request.student_id).await?;
        Ok(format!(
            "{}: {} and {}",
            request.meeting_type.display_name(),
            professor,
            student
        ))
    }

    async fn display_name(&self, user_id: &str) -> Result<String> {
        Ok(self
            .directory
            .lookup(user_id)
            .await?
            .map(|profile| profile.display_name)
            .unwrap_or_else(|| user_id.to_string()))
    }
}
