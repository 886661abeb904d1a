use crate::cgroup::CgroupName;
use crate::perf::{Counter, CounterGroup};

/// One active monitoring instance for exactly one cgroup.
#[derive(Debug)]
pub struct Session<C> {
    cgroup: CgroupName,
    group: CounterGroup<C>,
}

impl<C: Counter> Session<C> {
    pub fn new(cgroup: CgroupName, group: CounterGroup<C>) -> Self {
        Self { cgroup, group }
    }

    pub fn cgroup(&self) -> &CgroupName {
        &self.cgroup
    }

    pub fn group(&self) -> &CounterGroup<C> {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut CounterGroup<C> {
        &mut self.group
    }

    /// Swaps in a new counter group, returning the previous one.
    pub fn replace_group(&mut self, group: CounterGroup<C>) -> CounterGroup<C> {
        std::mem::replace(&mut self.group, group)
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            cgroup: self.cgroup.clone(),
            core_count: self.group.core_count(),
            metric_count: self.group.metric_count(),
        }
    }

    /// Releases every counter of the session.
    pub fn close(self) {
        self.group.close();
    }
}

/// Summary of a session for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub cgroup: CgroupName,
    pub core_count: usize,
    pub metric_count: usize,
}
