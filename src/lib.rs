//! Convene: Meeting Scheduling for Thesis Projects
//!
//! A scheduling engine for university thesis-project administration:
//! professors publish availability windows, students reserve 30-minute
//! blocks, and accept/reject responses promote requests into tracked
//! meetings with a full audit trail.

pub mod config;
pub mod directory;
pub mod error;
pub mod notify;
pub mod scheduling;
pub mod service;
pub mod store;

pub use config::{OfficeHoursConfig, SchedulingConfig, StorageConfig};
pub use directory::{ProjectRoster, StaticDirectory, StaticRoster, UserDirectory, UserProfile};
pub use error::{ConfigError, Result, SchedulingError, StoreError, ValidationError};
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier, RecordingNotifier};
pub use scheduling::{
    next_occurrence, AvailabilityManager, AvailabilityMatcher, AvailabilityWindow, Decision,
    HistoryAction, HistoryEntry, HistoryRecorder, Meeting, MeetingLifecycle, MeetingRequest,
    MeetingState, MeetingType, OpenSlot, ProposeRequest, RequestState, ReservationTransactor,
    ReserveRequest, ResponseOutcome, ResponseWorkflow, Role, SharedWindow, SlotExpander,
    WindowRecurrence,
};
pub use service::{Scheduler, SchedulerBuilder};
pub use store::{
    ConflictScope, MemoryStore, ResponseCommit, ResponseStamp, SchedulingStore, WindowLock,
};
