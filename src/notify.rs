//! Outbound scheduling notifications.
//!
//! The engine emits a notification after every committed transition and
//! treats delivery as fire-and-forget: a failing notifier is logged and
//! never rolls back the transition that triggered it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kinds of notification the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A block was reserved against the recipient's window.
    RequestReserved,
    /// An auto-matched meeting was proposed to the recipient.
    RequestProposed,
    /// The recipient's request was accepted.
    RequestAccepted,
    /// The recipient's request was rejected.
    RequestRejected,
    /// A meeting the recipient is a party to was cancelled.
    MeetingCancelled,
    /// A meeting the recipient is a party to was moved.
    MeetingRescheduled,
}

impl NotificationKind {
    /// Get the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestReserved => "request.reserved",
            Self::RequestProposed => "request.proposed",
            Self::RequestAccepted => "request.accepted",
            Self::RequestRejected => "request.rejected",
            Self::MeetingCancelled => "meeting.cancelled",
            Self::MeetingRescheduled => "meeting.rescheduled",
        }
    }

    /// Parse a kind from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "request.reserved" => Some(Self::RequestReserved),
            "request.proposed" => Some(Self::RequestProposed),
            "request.accepted" => Some(Self::RequestAccepted),
            "request.rejected" => Some(Self::RequestRejected),
            "meeting.cancelled" => Some(Self::MeetingCancelled),
            "meeting.rescheduled" => Some(Self::MeetingRescheduled),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// User the message is addressed to.
    pub recipient_id: String,
    /// What happened.
    pub kind: NotificationKind,
    /// Request involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Meeting involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<String>,
    /// Human-readable summary.
    pub message: String,
}

impl Notification {
    /// Create a notification.
    pub fn new(
        recipient_id: impl Into<String>,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            kind,
            request_id: None,
            meeting_id: None,
            message: message.into(),
        }
    }

    /// Reference the request involved.
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Reference the meeting involved.
    pub fn with_meeting(mut self, meeting_id: impl Into<String>) -> Self {
        self.meeting_id = Some(meeting_id.into());
        self
    }
}

/// Delivery channel for scheduling notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Notifier that writes to the tracing log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        tracing::info!(
            "notify {} [{}]: {}",
            notification.recipient_id,
            notification.kind,
            notification.message
        );
        Ok(())
    }
}

/// Notifier that records every message, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}
