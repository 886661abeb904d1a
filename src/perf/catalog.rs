//! The static table of countable metrics.
//!
//! Each entry pairs a metric name with the `type` and `config` fields of
//! `struct perf_event_attr`. A metric is addressed by its position in [`CATALOG`];
//! the order is part of the public contract and must not change.
//!
//! Entries of type [`EventType::HardwareCache`] carry the raw cache id, operation
//! or result constant as their whole `config` value rather than the composite
//! `id | op << 8 | result << 16` encoding. `cache_l1d`, `cache_op_read` and
//! `cache_result_access` therefore all select L1D read accesses.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// The `type` field of `struct perf_event_attr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Hardware,
    Software,
    HardwareCache,
}

impl EventType {
    /// Returns the kernel ABI value (`PERF_TYPE_*`).
    pub fn as_raw(self) -> u32 {
        match self {
            EventType::Hardware => 0,
            EventType::Software => 1,
            EventType::HardwareCache => 3,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Hardware => "hardware",
            EventType::Software => "software",
            EventType::HardwareCache => "hw_cache",
        };
        f.write_str(name)
    }
}

/// One countable metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Name used in metric specs, e.g. `instructions`.
    pub name: &'static str,
    pub event_type: EventType,
    /// The `config` field of `struct perf_event_attr`.
    pub event_key: u64,
}

const fn metric(name: &'static str, event_type: EventType, event_key: u64) -> MetricDescriptor {
    MetricDescriptor {
        name,
        event_type,
        event_key,
    }
}

use EventType::{Hardware, HardwareCache, Software};

/// Every metric that can be requested, in index order.
pub static CATALOG: [MetricDescriptor; 28] = [
    metric("cpu_cycles", Hardware, 0),
    metric("instructions", Hardware, 1),
    metric("cache_references", Hardware, 2),
    metric("cache_misses", Hardware, 3),
    metric("branch_instructions", Hardware, 4),
    metric("branch_misses", Hardware, 5),
    metric("bus_cycles", Hardware, 6),
    metric("ref_cpu_cycles", Hardware, 9),
    metric("cache_l1d", HardwareCache, 0),
    metric("cache_ll", HardwareCache, 2),
    metric("cache_dtlb", HardwareCache, 3),
    metric("cache_itlb", HardwareCache, 4),
    metric("cache_bpu", HardwareCache, 5),
    metric("cache_node", HardwareCache, 6),
    metric("cache_op_read", HardwareCache, 0),
    metric("cache_op_prefetch", HardwareCache, 2),
    metric("cache_result_access", HardwareCache, 0),
    metric("cpu_clock", Software, 0),
    metric("task_clock", Software, 1),
    metric("page_faults", Software, 2),
    metric("context_switches", Software, 3),
    metric("cpu_migrations", Software, 4),
    metric("page_faults_min", Software, 5),
    metric("page_faults_maj", Software, 6),
    metric("alignment_faults", Software, 7),
    metric("emulation_faults", Software, 8),
    metric("dummy", Software, 9),
    metric("bpf_output", Software, 10),
];

static INDEX_BY_NAME: LazyLock<HashMap<&'static str, usize>> = LazyLock::new(|| {
    CATALOG
        .iter()
        .enumerate()
        .map(|(index, m)| (m.name, index))
        .collect()
});

/// Returns the catalog index of the metric with exactly this name.
pub fn lookup(name: &str) -> Option<usize> {
    INDEX_BY_NAME.get(name).copied()
}

/// Returns the descriptor at `index`, if any.
pub fn descriptor(index: usize) -> Option<&'static MetricDescriptor> {
    CATALOG.get(index)
}
