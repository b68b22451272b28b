//! Scheduling core: availability, reservation, response and lifecycle.
//!
//! This module implements the meeting-scheduling engine:
//!
//! - **Availability Manager**: publication and withdrawal of free-time windows
//! - **Slot Expander**: projection of windows into concrete 30-minute blocks
//! - **Availability Matcher**: weekly overlap between two users' windows
//! - **Reservation Transactor**: conflict-checked creation of pending requests
//! - **Response Workflow**: accept/reject decisions producing meetings
//! - **Meeting Lifecycle**: cancellation, rescheduling and completion
//! - **History Recorder**: read access to the append-only audit trail
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Scheduling Core                         │
//! │                                                              │
//! │  SlotExpander ─┐                                             │
//! │                ├──▶ ReservationTransactor                    │
//! │  Matcher ──────┘            │                                │
//! │                             ▼                                │
//! │                     ResponseWorkflow                         │
//! │                             │                                │
//! │                             ▼                                │
//! │                     MeetingLifecycle                         │
//! │                                                              │
//! │  every transition appends a HistoryEntry                     │
//! │                             │                                │
//! │                             ▼                                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulingStore                           │  │
//! │  │  (windows, requests, meetings, history)                │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use convene::{Scheduler, ReserveRequest, Decision, MemoryStore};
//! use std::sync::Arc;
//!
//! let scheduler = Scheduler::builder(Arc::new(MemoryStore::new()))
//!     .directory(directory)
//!     .roster(roster)
//!     .build()?;
//!
//! let slots = scheduler.open_slots("prof-1").await?;
//! let request = scheduler
//!     .reserve(ReserveRequest::new(
//!         &slots[0].window_id,
//!         "proj-1",
//!         "stu-1",
//!         slots[0].date,
//!         slots[0].start_time,
//!         slots[0].end_time,
//!     ))
//!     .await?;
//! let outcome = scheduler
//!     .respond(&request.id, "prof-1", Decision::Accept, None)
//!     .await?;
//! ```

pub mod availability;
pub mod expander;
pub mod history;
pub mod lifecycle;
pub mod matcher;
pub mod reservation;
pub mod types;
pub mod workflow;

pub use availability::AvailabilityManager;
pub use expander::{next_occurrence, SlotExpander};
pub use history::HistoryRecorder;
pub use lifecycle::MeetingLifecycle;
pub use matcher::AvailabilityMatcher;
pub use reservation::{ProposeRequest, ReservationTransactor, ReserveRequest};
pub use types::{
    AvailabilityWindow, HistoryAction, HistoryEntry, Meeting, MeetingRequest, MeetingState,
    MeetingType, OpenSlot, RequestState, Role, SharedWindow, WindowRecurrence,
};
pub use workflow::{Decision, ResponseOutcome, ResponseWorkflow};
