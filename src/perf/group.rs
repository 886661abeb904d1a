use std::fs::File;
use std::path::{Path, PathBuf};

use super::catalog::{self, MetricDescriptor};
use super::counter::{Counter, CounterBackend};
use super::{Error, Result};

/// All counters of one monitoring session: one per (selected metric, core).
///
/// A group is either fully open or does not exist. Counters are owned values,
/// so dropping the group (or calling [`CounterGroup::close`]) releases every one
/// of them exactly once.
#[derive(Debug)]
pub struct CounterGroup<C> {
    cgroup: PathBuf,
    core_count: usize,
    metrics: Vec<usize>,
    /// `counters[m][cpu]` counts `metrics[m]` on core `cpu`.
    counters: Vec<Vec<C>>,
    enabled: bool,
}

impl<C: Counter> CounterGroup<C> {
    /// Opens a disabled counter for every metric in `metrics` on every core.
    ///
    /// # Arguments
    ///
    /// * `backend` - Opens the individual counters and reports the core count.
    /// * `cgroup` - The cgroup directory inside the perf_event hierarchy.
    /// * `metrics` - Catalog indices in selection order; duplicates are allowed.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMetrics`] / [`Error::UnknownMetric`] for an unusable metric list.
    /// - [`Error::CgroupOpen`] if the cgroup directory cannot be opened.
    /// - [`Error::CounterOpen`] if any single counter fails to open. Counters opened
    ///   before the failure are closed before returning.
    pub fn open<B>(backend: &B, cgroup: impl AsRef<Path>, metrics: Vec<usize>) -> Result<Self>
    where
        B: CounterBackend<Counter = C>,
    {
        let descriptors = metrics
            .iter()
            .map(|&index| catalog::descriptor(index).ok_or(Error::UnknownMetric { index }))
            .collect::<Result<Vec<&MetricDescriptor>>>()?;
        if descriptors.is_empty() {
            return Err(Error::NoMetrics);
        }

        let path = cgroup.as_ref();
        let dir = File::open(path).map_err(|source| Error::CgroupOpen {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Gathering counters for {}", path.display());

        let core_count = backend.core_count();
        let mut counters = Vec::with_capacity(descriptors.len());
        for metric in descriptors {
            let mut per_core = Vec::with_capacity(core_count);
            for cpu in 0..core_count {
                let counter =
                    backend
                        .open(metric, &dir, cpu)
                        .map_err(|source| Error::CounterOpen {
                            metric: metric.name,
                            cpu,
                            source,
                        })?;
                per_core.push(counter);
            }
            counters.push(per_core);
        }

        Ok(Self {
            cgroup: path.to_path_buf(),
            core_count,
            metrics,
            counters,
            enabled: false,
        })
    }

    /// Starts counting on every core.
    ///
    /// Failures are logged per counter and otherwise ignored.
    pub fn enable(&mut self) {
        self.for_each_counter("enable", |c| c.enable());
        self.enabled = true;
    }

    /// Zeroes every counter. Failures are logged per counter and otherwise ignored.
    pub fn reset(&mut self) {
        self.for_each_counter("reset", |c| c.reset());
    }

    /// Returns, per selected metric, the count summed over all cores since the
    /// previous read (or since [`CounterGroup::enable`]), then resets the counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if any counter cannot be read. Nothing is reset in
    /// that case, so a later retry still sees the full delta.
    pub fn read(&mut self) -> Result<Vec<u64>> {
        let mut values = Vec::with_capacity(self.counters.len());
        for (&index, per_core) in self.metrics.iter().zip(&mut self.counters) {
            let mut sum: u64 = 0;
            for (cpu, counter) in per_core.iter_mut().enumerate() {
                let count = counter.read().map_err(|source| Error::Read {
                    metric: catalog::CATALOG[index].name,
                    cpu,
                    source,
                })?;
                sum = sum.saturating_add(count);
            }
            values.push(sum);
        }
        self.reset();
        Ok(values)
    }

    /// Stops and releases every counter.
    pub fn close(mut self) {
        self.for_each_counter("disable", |c| c.disable());
        log::debug!(
            "Closing {} counters for {}",
            self.counter_count(),
            self.cgroup.display()
        );
    }

    fn for_each_counter(&mut self, action: &str, f: impl Fn(&mut C) -> std::io::Result<()>) {
        for (&index, per_core) in self.metrics.iter().zip(&mut self.counters) {
            for (cpu, counter) in per_core.iter_mut().enumerate() {
                if let Err(err) = f(counter) {
                    log::warn!(
                        "failed to {action} counter `{}` on cpu {cpu} for {}: {err}",
                        catalog::CATALOG[index].name,
                        self.cgroup.display()
                    );
                }
            }
        }
    }
}

impl<C> CounterGroup<C> {
    /// The cgroup directory the counters are scoped to.
    pub fn cgroup(&self) -> &Path {
        &self.cgroup
    }

    pub fn core_count(&self) -> usize {
        self.core_count
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Catalog indices in selection order.
    pub fn metrics(&self) -> &[usize] {
        &self.metrics
    }

    /// Metric names in selection order, matching the layout of [`CounterGroup::read`].
    pub fn metric_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.metrics.iter().map(|&i| catalog::CATALOG[i].name)
    }

    pub fn counter_count(&self) -> usize {
        self.counters.iter().map(Vec::len).sum()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
