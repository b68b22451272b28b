//! Storage layer for scheduling records.
//!
//! [`traits::SchedulingStore`] is the contract every component works
//! against; [`memory::MemoryStore`] is the embedded implementation used in
//! production deployments without an external database and in tests.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{ConflictScope, ResponseCommit, ResponseStamp, SchedulingStore, WindowLock};
