//! Per-cgroup kernel performance counters.
//!
//! This module maps human-readable metric names onto `perf_event_open(2)` event
//! descriptors and manages groups of counters scoped to one cgroup, one counter
//! per (metric, core) pair.
//!
//! # Key Components
//!
//! - [`CATALOG`]: The static, ordered metric table. A metric is identified by its index.
//! - [`resolve`]: Turns a comma-separated metric spec into catalog indices.
//! - [`CounterGroup`]: Owns every counter of one monitoring session and aggregates reads across cores.
//! - [`CounterBackend`] / [`Counter`]: The seam between aggregation logic and the kernel.
//! - [`KernelBackend`]: The `perf_event_open(2)` implementation of that seam.
//!
//! Per-cgroup counters cannot be opened with `cpu == -1`: in cgroup mode the kernel
//! only counts an event when the thread running on the monitored CPU belongs to the
//! cgroup, so one counter per online core is required and reads sum over cores.
mod catalog;
mod counter;
mod cpus;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod group;
mod selector;

pub use catalog::{CATALOG, EventType, MetricDescriptor, descriptor, lookup};
pub use counter::{Counter, CounterBackend, KernelBackend, PerfCounter};
pub use error::{Error, Result};
pub use group::CounterGroup;
pub use selector::{Selection, resolve};
