//! Cgroup identifiers used to scope perf counters.
//!
//! A [`CgroupName`] is the path-like key a caller uses to address a monitored
//! cgroup (e.g. `/oar/job_1876192`). It is resolved against the root of the
//! perf_event hierarchy detected by [`crate::mountinfo`].
mod error;
mod name;

pub use error::{Error, Result};
pub use name::CgroupName;
