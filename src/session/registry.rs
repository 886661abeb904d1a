use std::path::{Path, PathBuf};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::cgroup::CgroupName;
use crate::perf::{CounterBackend, CounterGroup, resolve};
use crate::sample::CounterSample;

use super::active::{Session, SessionInfo};
use super::{Error, Result};

/// Result of a successful [`Registry::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session was opened and enabled.
    Started,
    /// The cgroup already had a session; it was left untouched.
    AlreadyActive,
}

/// Active monitoring sessions keyed by cgroup name.
///
/// Every method takes `&self`; per-key exclusion comes from the map, so a
/// registry can be shared behind an [`std::sync::Arc`].
pub struct Registry<B: CounterBackend> {
    backend: B,
    root: PathBuf,
    sessions: DashMap<CgroupName, Session<B::Counter>>,
}

impl<B: CounterBackend> Registry<B> {
    /// Creates an empty registry resolving cgroup names under `root`.
    ///
    /// # Arguments
    ///
    /// * `backend` - Opens the counters of new sessions.
    /// * `root` - Mount point of the perf_event cgroup hierarchy.
    pub fn new(backend: B, root: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            root: root.into(),
            sessions: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts monitoring `cgroup` with the metrics listed in `metric_spec`.
    ///
    /// If the cgroup already has a session nothing changes and
    /// [`StartOutcome::AlreadyActive`] is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] if `cgroup` is not a valid cgroup name.
    /// - [`Error::Perf`] if no metric in the spec resolves or the counters cannot
    ///   be opened. The registry is left unchanged.
    pub fn start(&self, cgroup: &str, metric_spec: &str) -> Result<StartOutcome> {
        let cgroup = CgroupName::new(cgroup)?;
        match self.sessions.entry(cgroup) {
            Entry::Occupied(entry) => {
                log::debug!("cgroup `{}` is already monitored", entry.key());
                Ok(StartOutcome::AlreadyActive)
            }
            Entry::Vacant(entry) => {
                let cgroup = entry.key().clone();
                let perf_err = |source| Error::Perf {
                    cgroup: cgroup.clone(),
                    source,
                };

                let metrics = resolve(metric_spec)
                    .into_indices(metric_spec)
                    .map_err(perf_err)?;
                let mut group = CounterGroup::open(&self.backend, cgroup.resolve(&self.root), metrics)
                    .map_err(perf_err)?;
                group.enable();

                log::info!(
                    "Started monitoring cgroup `{}`: metrics={}, cores={}",
                    cgroup,
                    group.metric_count(),
                    group.core_count()
                );
                entry.insert(Session::new(cgroup.clone(), group));
                Ok(StartOutcome::Started)
            }
        }
    }

    /// Returns the per-metric deltas of `cgroup` since its previous read.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the cgroup has no session.
    /// - [`Error::Perf`] wrapping a retryable read failure; the session stays active.
    pub fn read(&self, cgroup: &str) -> Result<Vec<u64>> {
        let mut session = self
            .sessions
            .get_mut(cgroup)
            .ok_or_else(|| Error::NotFound(cgroup.to_owned()))?;
        let session = session.value_mut();
        session.group_mut().read().map_err(|source| Error::Perf {
            cgroup: session.cgroup().clone(),
            source,
        })
    }

    /// Replaces the metrics counted for an active session.
    ///
    /// The new counters are opened and enabled before the old ones are closed, so
    /// on failure the session keeps counting its previous metrics. Counts not yet
    /// read under the previous metrics are discarded on success.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the cgroup has no session.
    /// - [`Error::Perf`] if no metric in `metric_spec` resolves or the new counters
    ///   cannot be opened.
    pub fn set_metrics(&self, cgroup: &str, metric_spec: &str) -> Result<()> {
        let mut session = self
            .sessions
            .get_mut(cgroup)
            .ok_or_else(|| Error::NotFound(cgroup.to_owned()))?;
        let name = session.cgroup().clone();
        let perf_err = |source| Error::Perf {
            cgroup: name.clone(),
            source,
        };

        let metrics = resolve(metric_spec)
            .into_indices(metric_spec)
            .map_err(perf_err)?;
        let mut group = CounterGroup::open(&self.backend, name.resolve(&self.root), metrics)
            .map_err(perf_err)?;
        group.enable();

        log::info!(
            "Reconfigured cgroup `{}`: metrics={}",
            name,
            group.metric_count()
        );
        session.replace_group(group).close();
        Ok(())
    }

    /// Zeroes the counters of `cgroup` without reading them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cgroup has no session.
    pub fn reset(&self, cgroup: &str) -> Result<()> {
        let mut session = self
            .sessions
            .get_mut(cgroup)
            .ok_or_else(|| Error::NotFound(cgroup.to_owned()))?;
        session.group_mut().reset();
        Ok(())
    }

    /// Stops monitoring `cgroup` and closes its counters. Unknown names are ignored.
    pub fn stop(&self, cgroup: &str) {
        if let Some((cgroup, session)) = self.sessions.remove(cgroup) {
            session.close();
            log::info!("Stopped monitoring cgroup `{cgroup}`");
        }
    }

    /// Stops every session.
    pub fn clear(&self) {
        let cgroups: Vec<CgroupName> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for cgroup in cgroups {
            self.stop(cgroup.as_ref());
        }
    }

    /// Lists active sessions in no particular order.
    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions.iter().map(|e| e.value().info()).collect()
    }

    /// Reads every session, appending one sample per successful read to `out`.
    ///
    /// A failed read is logged and the session kept, so the next round retries it.
    ///
    /// # Arguments
    ///
    /// * `timestamp` - A timestamp (e.g., UNIX time) to associate with collected samples.
    pub fn collect(&self, timestamp: u64, out: &mut Vec<CounterSample>) {
        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            match session.group_mut().read() {
                Ok(values) => out.push(CounterSample::new(
                    timestamp,
                    session.cgroup().clone(),
                    session.group().metric_names().collect(),
                    values,
                )),
                Err(err) => log::error!(
                    target: "cgroup registry",
                    "failed reading counters: cgroup={}, error={}",
                    session.cgroup(),
                    err
                ),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::{self, fake::FakeBackend};

    struct Fixture {
        backend: FakeBackend,
        registry: Registry<FakeBackend>,
        _root: tempfile::TempDir,
    }

    fn fixture(cores: usize, cgroups: &[&str]) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        for cgroup in cgroups {
            std::fs::create_dir_all(root.path().join(cgroup.trim_start_matches('/'))).unwrap();
        }
        let backend = FakeBackend::new(cores);
        let registry = Registry::new(backend.clone(), root.path());
        Fixture {
            backend,
            registry,
            _root: root,
        }
    }

    #[test]
    fn test_start_then_read() {
        let f = fixture(4, &["/oar/cg1"]);
        let outcome = f.registry.start("/oar/cg1", "instructions,page_faults").unwrap();
        assert_eq!(outcome, StartOutcome::Started);

        let values = f.registry.read("/oar/cg1").unwrap();
        assert_eq!(values.len(), 2);

        f.backend.record(2);
        assert_eq!(f.registry.read("/oar/cg1").unwrap(), vec![8, 8]);
        assert_eq!(f.registry.read("/oar/cg1").unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_second_start_is_a_no_op() {
        let f = fixture(2, &["cg1"]);
        f.registry.start("cg1", "instructions").unwrap();
        assert_eq!(f.backend.live_counters(), 2);

        let outcome = f.registry.start("cg1", "page_faults,cache_misses").unwrap();
        assert_eq!(outcome, StartOutcome::AlreadyActive);
        assert_eq!(f.backend.live_counters(), 2);

        f.backend.record(1);
        assert_eq!(f.registry.read("cg1").unwrap(), vec![2]);
    }

    #[test]
    fn test_unknown_cgroup_is_not_found() {
        let f = fixture(2, &[]);
        assert!(matches!(
            f.registry.read("cg-unknown"),
            Err(Error::NotFound(name)) if name == "cg-unknown"
        ));
        assert!(matches!(
            f.registry.reset("cg-unknown"),
            Err(Error::NotFound(_))
        ));
        f.registry.stop("cg-unknown");
        assert!(f.registry.is_empty());
    }

    #[test]
    fn test_empty_metric_spec_touches_nothing() {
        let f = fixture(2, &["cg1"]);
        let err = f.registry.start("cg1", "bogus,,also_bogus").unwrap_err();
        assert!(matches!(
            err,
            Error::Perf {
                source: perf::Error::EmptySelection { .. },
                ..
            }
        ));
        assert_eq!(f.backend.open_attempts(), 0);
        assert!(f.registry.is_empty());
    }

    #[test]
    fn test_failed_open_leaves_registry_unchanged() {
        let f = fixture(2, &[]);
        let err = f.registry.start("/missing", "instructions").unwrap_err();
        assert!(matches!(
            err,
            Error::Perf {
                source: perf::Error::CgroupOpen { .. },
                ..
            }
        ));
        assert!(!err.is_retryable());
        assert!(f.registry.is_empty());
        assert_eq!(f.backend.live_counters(), 0);

        assert!(matches!(
            f.registry.read("/missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_partial_counter_failure_leaks_nothing() {
        let f = fixture(3, &["cg1"]);
        f.backend.fail_open_at(4);
        let err = f.registry.start("cg1", "instructions,cache_misses").unwrap_err();
        assert!(matches!(
            err,
            Error::Perf {
                source: perf::Error::CounterOpen { cpu: 1, .. },
                ..
            }
        ));
        assert_eq!(f.backend.live_counters(), 0);
        assert!(f.registry.is_empty());

        // The same cgroup can be started once the failure is gone.
        assert_eq!(
            f.registry.start("cg1", "instructions").unwrap(),
            StartOutcome::Started
        );
    }

    #[test]
    fn test_invalid_name() {
        let f = fixture(1, &[]);
        let err = f.registry.start("/oar/../../etc", "instructions").unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }

    #[test]
    fn test_stop_closes_counters() {
        let f = fixture(4, &["cg1", "cg2"]);
        f.registry.start("cg1", "instructions,page_faults").unwrap();
        f.registry.start("cg2", "instructions").unwrap();
        assert_eq!(f.backend.live_counters(), 12);

        f.registry.stop("cg1");
        assert_eq!(f.backend.live_counters(), 4);
        assert!(matches!(f.registry.read("cg1"), Err(Error::NotFound(_))));
        assert_eq!(f.registry.len(), 1);

        f.registry.clear();
        assert_eq!(f.backend.live_counters(), 0);
        assert!(f.registry.is_empty());
    }

    #[test]
    fn test_list_reports_shape() {
        let f = fixture(4, &["cg1", "cg2"]);
        f.registry
            .start("cg1", "instructions,instructions,page_faults")
            .unwrap();
        f.registry.start("cg2", "cpu_cycles").unwrap();

        let mut infos = f.registry.list();
        infos.sort_by(|a, b| a.cgroup.as_ref().cmp(b.cgroup.as_ref()));
        let shapes: Vec<_> = infos
            .iter()
            .map(|i| (i.cgroup.to_string(), i.core_count, i.metric_count))
            .collect();
        assert_eq!(
            shapes,
            vec![("cg1".to_string(), 4, 3), ("cg2".to_string(), 4, 1)]
        );
    }

    #[test]
    fn test_set_metrics_swaps_counters() {
        let f = fixture(2, &["cg1"]);
        f.registry.start("cg1", "instructions").unwrap();
        assert_eq!(f.backend.live_counters(), 2);

        f.registry
            .set_metrics("cg1", "page_faults,cache_misses")
            .unwrap();
        assert_eq!(f.backend.live_counters(), 4);
        assert_eq!(f.registry.list()[0].metric_count, 2);

        f.backend.record(1);
        assert_eq!(f.registry.read("cg1").unwrap(), vec![2, 2]);
    }

    #[test]
    fn test_failed_set_metrics_keeps_previous_counters() {
        let f = fixture(2, &["cg1"]);
        f.registry.start("cg1", "instructions").unwrap();
        f.backend.record(1);

        // Attempts 0 and 1 opened the session; fail the second new counter.
        f.backend.fail_open_at(3);
        let err = f
            .registry
            .set_metrics("cg1", "page_faults,cache_misses")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Perf {
                source: perf::Error::CounterOpen { cpu: 1, .. },
                ..
            }
        ));
        assert_eq!(f.backend.live_counters(), 2);

        let err = f.registry.set_metrics("cg1", "nope").unwrap_err();
        assert!(matches!(
            err,
            Error::Perf {
                source: perf::Error::EmptySelection { .. },
                ..
            }
        ));

        assert_eq!(f.registry.read("cg1").unwrap(), vec![2]);
        assert!(matches!(
            f.registry.set_metrics("cg-unknown", "instructions"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_read_failure_is_retryable() {
        let f = fixture(2, &["cg1"]);
        f.registry.start("cg1", "page_faults").unwrap();
        f.backend.record(3);

        f.backend.fail_reads(true);
        let err = f.registry.read("cg1").unwrap_err();
        assert!(err.is_retryable());

        f.backend.fail_reads(false);
        assert_eq!(f.registry.read("cg1").unwrap(), vec![6]);
    }

    #[test]
    fn test_collect_keeps_failing_sessions() {
        let f = fixture(2, &["cg1", "cg2"]);
        f.registry.start("cg1", "instructions").unwrap();
        f.registry.start("cg2", "page_faults,page_faults").unwrap();
        f.backend.record(1);

        let mut out = Vec::new();
        f.registry.collect(42, &mut out);
        out.sort_by(|a, b| a.cgroup.as_ref().cmp(b.cgroup.as_ref()));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, 42);
        assert_eq!(out[0].metric_names, vec!["instructions"]);
        assert_eq!(out[0].metric_values, vec![2]);
        assert_eq!(out[1].metric_names, vec!["page_faults", "page_faults"]);
        assert_eq!(out[1].metric_values, vec![2, 2]);

        f.backend.fail_reads(true);
        let mut out = Vec::new();
        f.registry.collect(43, &mut out);
        assert!(out.is_empty());
        assert_eq!(f.registry.len(), 2);
    }
}
