//! In-memory counter backend for tests.
//!
//! Counters count whatever [`FakeBackend::record`] feeds them while enabled, and
//! the backend tracks how many counters are alive so tests can check that no
//! handle outlives its group.

use std::io;
use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::catalog::MetricDescriptor;
use super::counter::{Counter, CounterBackend};

#[derive(Debug, Default)]
struct CounterState {
    value: AtomicU64,
    enabled: AtomicBool,
}

#[derive(Debug, Default)]
struct Shared {
    core_count: usize,
    live: AtomicUsize,
    attempts: AtomicUsize,
    fail_open_at: Mutex<Option<usize>>,
    fail_reads: AtomicBool,
    reads: AtomicUsize,
    fail_read_at: Mutex<Option<usize>>,
    fail_enables: AtomicBool,
    counters: Mutex<Vec<Weak<CounterState>>>,
}

#[derive(Debug, Clone)]
pub struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    pub fn new(core_count: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                core_count,
                ..Default::default()
            }),
        }
    }

    /// Makes the `attempt`-th open call (0-based, counted over the backend's lifetime) fail.
    pub fn fail_open_at(&self, attempt: usize) {
        *self.shared.fail_open_at.lock().unwrap() = Some(attempt);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes the `attempt`-th read call (0-based, counted over the backend's lifetime) fail.
    pub fn fail_read_at(&self, attempt: usize) {
        *self.shared.fail_read_at.lock().unwrap() = Some(attempt);
    }

    pub fn fail_enables(&self, fail: bool) {
        self.shared.fail_enables.store(fail, Ordering::SeqCst);
    }

    /// Number of counters opened and not yet dropped.
    pub fn live_counters(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Number of open attempts so far, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Adds `events` to every live, enabled counter.
    pub fn record(&self, events: u64) {
        let counters = self.shared.counters.lock().unwrap();
        for state in counters.iter().filter_map(Weak::upgrade) {
            if state.enabled.load(Ordering::SeqCst) {
                state.value.fetch_add(events, Ordering::SeqCst);
            }
        }
    }
}

#[derive(Debug)]
pub struct FakeCounter {
    state: Arc<CounterState>,
    shared: Arc<Shared>,
}

impl Drop for FakeCounter {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Counter for FakeCounter {
    fn enable(&mut self) -> io::Result<()> {
        if self.shared.fail_enables.load(Ordering::SeqCst) {
            return Err(io::Error::other("enable rejected"));
        }
        self.state.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&mut self) -> io::Result<()> {
        self.state.enabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        self.state.value.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self) -> io::Result<u64> {
        let attempt = self.shared.reads.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_reads.load(Ordering::SeqCst)
            || *self.shared.fail_read_at.lock().unwrap() == Some(attempt)
        {
            return Err(io::Error::other("read failed"));
        }
        Ok(self.state.value.load(Ordering::SeqCst))
    }
}

impl CounterBackend for FakeBackend {
    type Counter = FakeCounter;

    fn core_count(&self) -> usize {
        self.shared.core_count
    }

    fn open(
        &self,
        _metric: &MetricDescriptor,
        _cgroup: &File,
        _cpu: usize,
    ) -> io::Result<FakeCounter> {
        let attempt = self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        if *self.shared.fail_open_at.lock().unwrap() == Some(attempt) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }

        let state = Arc::new(CounterState::default());
        self.shared
            .counters
            .lock()
            .unwrap()
            .push(Arc::downgrade(&state));
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        Ok(FakeCounter {
            state,
            shared: Arc::clone(&self.shared),
        })
    }
}
