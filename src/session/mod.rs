//! Keyed monitoring sessions, at most one per cgroup.
//!
//! A [`Registry`] owns every active [`Session`]; a session owns its
//! [`crate::perf::CounterGroup`]. Removing a session from the registry closes all
//! of its counters.
mod active;
mod error;
mod registry;

pub use active::{Session, SessionInfo};
pub use error::{Error, Result};
pub use registry::{Registry, StartOutcome};
