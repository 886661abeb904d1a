use std::fs::File;
use std::io;

use perf_event::Builder;
use perf_event::events::{Cache, CacheId, CacheOp, CacheResult, Event, Hardware, Software};

use super::catalog::{EventType, MetricDescriptor};
use super::{Error, Result, cpus};

/// A single opened event counter.
///
/// Dropping the value releases the underlying kernel resource.
pub trait Counter {
    fn enable(&mut self) -> io::Result<()>;
    fn disable(&mut self) -> io::Result<()>;
    /// Zeroes the accumulated count.
    fn reset(&mut self) -> io::Result<()>;
    /// Returns the count accumulated since the last reset.
    fn read(&mut self) -> io::Result<u64>;
}

/// Opens counters for a [`super::CounterGroup`].
pub trait CounterBackend {
    type Counter: Counter;

    /// Number of cores a group opens counters on, indexed `0..core_count()`.
    fn core_count(&self) -> usize;

    /// Opens one disabled counter for `metric`, scoped to the cgroup directory
    /// `cgroup` and pinned to `cpu`.
    fn open(
        &self,
        metric: &MetricDescriptor,
        cgroup: &File,
        cpu: usize,
    ) -> io::Result<Self::Counter>;
}

/// A `perf_event_open(2)` counter.
pub struct PerfCounter {
    inner: perf_event::Counter,
}

impl Counter for PerfCounter {
    fn enable(&mut self) -> io::Result<()> {
        self.inner.enable()
    }

    fn disable(&mut self) -> io::Result<()> {
        self.inner.disable()
    }

    fn reset(&mut self) -> io::Result<()> {
        self.inner.reset()
    }

    fn read(&mut self) -> io::Result<u64> {
        self.inner.read()
    }
}

/// Opens real kernel counters on every online core.
#[derive(Debug, Clone)]
pub struct KernelBackend {
    core_count: usize,
}

impl KernelBackend {
    /// Creates a backend, detecting the online core count once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CoreCount`] if the count cannot be determined.
    pub fn new() -> Result<Self> {
        let core_count = cpus::online_cpus(cpus::ONLINE_CPUS_PATH).map_err(Error::CoreCount)?;
        log::debug!("Detected {core_count} online cpus");
        Ok(Self { core_count })
    }
}

impl CounterBackend for KernelBackend {
    type Counter = PerfCounter;

    fn core_count(&self) -> usize {
        self.core_count
    }

    fn open(
        &self,
        metric: &MetricDescriptor,
        cgroup: &File,
        cpu: usize,
    ) -> io::Result<PerfCounter> {
        let key = metric.event_key;
        let inner = match metric.event_type {
            EventType::Hardware => build(hardware_event(key)?, cgroup, cpu)?,
            EventType::Software => build(software_event(key)?, cgroup, cpu)?,
            EventType::HardwareCache => build(cache_event(key)?, cgroup, cpu)?,
        };
        Ok(PerfCounter { inner })
    }
}

fn build(
    event: impl Event + 'static,
    cgroup: &File,
    cpu: usize,
) -> io::Result<perf_event::Counter> {
    Builder::new(event)
        .observe_cgroup(cgroup)
        .one_cpu(cpu)
        .build()
}

fn unsupported(event_type: EventType, key: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("no {event_type} event with config {key}"),
    )
}

fn hardware_event(key: u64) -> io::Result<Hardware> {
    Ok(match key {
        0 => Hardware::CPU_CYCLES,
        1 => Hardware::INSTRUCTIONS,
        2 => Hardware::CACHE_REFERENCES,
        3 => Hardware::CACHE_MISSES,
        4 => Hardware::BRANCH_INSTRUCTIONS,
        5 => Hardware::BRANCH_MISSES,
        6 => Hardware::BUS_CYCLES,
        9 => Hardware::REF_CPU_CYCLES,
        _ => return Err(unsupported(EventType::Hardware, key)),
    })
}

fn software_event(key: u64) -> io::Result<Software> {
    Ok(match key {
        0 => Software::CPU_CLOCK,
        1 => Software::TASK_CLOCK,
        2 => Software::PAGE_FAULTS,
        3 => Software::CONTEXT_SWITCHES,
        4 => Software::CPU_MIGRATIONS,
        5 => Software::PAGE_FAULTS_MIN,
        6 => Software::PAGE_FAULTS_MAJ,
        7 => Software::ALIGNMENT_FAULTS,
        8 => Software::EMULATION_FAULTS,
        9 => Software::DUMMY,
        10 => Software::BPF_OUTPUT,
        _ => return Err(unsupported(EventType::Software, key)),
    })
}

/// Cache entries carry a bare cache id; the operation and result are the zero
/// values (read, access), which keeps `config` equal to the catalog key.
fn cache_event(key: u64) -> io::Result<Cache> {
    let which = match key {
        0 => CacheId::L1D,
        1 => CacheId::L1I,
        2 => CacheId::LL,
        3 => CacheId::DTLB,
        4 => CacheId::ITLB,
        5 => CacheId::BPU,
        6 => CacheId::NODE,
        _ => return Err(unsupported(EventType::HardwareCache, key)),
    };
    Ok(Cache {
        which,
        operation: CacheOp::READ,
        result: CacheResult::ACCESS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::CATALOG;

    #[test]
    fn test_every_catalog_entry_maps_to_an_event() {
        for metric in &CATALOG {
            let key = metric.event_key;
            let mapped = match metric.event_type {
                EventType::Hardware => hardware_event(key).map(drop),
                EventType::Software => software_event(key).map(drop),
                EventType::HardwareCache => cache_event(key).map(drop),
            };
            assert!(mapped.is_ok(), "{} has no kernel event", metric.name);
        }
    }

    #[test]
    fn test_unknown_config_is_unsupported() {
        let err = software_event(99).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(hardware_event(42).is_err());
        assert!(cache_event(7).is_err());
    }
}
