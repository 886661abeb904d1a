//! Locates the cgroup hierarchy that perf_event counters are scoped against.
mod detect;
mod error;
mod parser;

pub use detect::{
    CgroupVersion, PerfEventHierarchy, detect_perf_event_hierarchy,
    detect_validated_perf_event_hierarchy,
};
pub use error::{Error, Result};
