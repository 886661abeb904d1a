//! cgperf: per-cgroup hardware/software performance counters and RAPL energy readings.
//!
//! The library keeps a registry of monitoring sessions, one per cgroup, each owning
//! one kernel counter per (metric, core) pair and returning per-metric deltas summed
//! over all cores on every read. The binary polls every session at a fixed period and
//! writes the samples as JSON lines to stdout.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use error::ResultOkLogExt;
use session::StartOutcome;

pub mod cgroup;
pub mod config;
pub mod energy;
pub mod error;
pub mod fsutil;
pub mod mountinfo;
pub mod perf;
pub mod sample;
pub mod session;

/// Runs the cgperf daemon.
///
/// Loads the configuration from the environment, locates the perf_event cgroup
/// hierarchy, starts a session for every configured cgroup and then samples all
/// sessions (and RAPL zones, if enabled) at each period boundary until Ctrl-C.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration variables (see [`config`]).
/// - No perf_event cgroup hierarchy mounted.
/// - Failure to determine the online CPU count.
/// - I/O errors when writing samples to stdout.
///
/// Failing to start a single cgroup or to initialize the energy reader is logged
/// and does not stop the daemon.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;

    let cgroup_root = match &config.cgroup_root {
        Some(root) => root.clone(),
        None => {
            let hierarchy =
                mountinfo::detect_validated_perf_event_hierarchy("/proc/self/mountinfo")?;
            log::debug!("Detected perf_event hierarchy: {:?}", hierarchy.version);
            hierarchy.mount_point
        }
    };
    log::debug!("Final Cgroup Root: {}", cgroup_root.display());

    let registry = Arc::new(session::Registry::new(
        perf::KernelBackend::new()?,
        cgroup_root,
    ));
    for cgroup in &config.cgroups {
        match registry.start(cgroup, &config.metrics) {
            Ok(StartOutcome::Started) => {}
            Ok(StartOutcome::AlreadyActive) => {
                log::warn!("cgroup `{cgroup}` is listed more than once")
            }
            Err(err) => log::error!("failed to start monitoring: {err}"),
        }
    }

    let energy = if config.enable_rapl {
        energy::EnergyReader::initialize(&energy::Powercap::default())
            .ok_log()
            .map(Arc::new)
    } else {
        None
    };

    let hostname = fsutil::read_trimmed("/proc/sys/kernel/hostname")
        .ok_log()
        .unwrap_or_default();
    log::debug!("Hostname: {}", &hostname);

    clear_after(
        &registry,
        poll(&registry, energy, &hostname, config.sample_period),
    )
    .await
}

/// Awaits `work`, then stops every session of `registry` whatever the outcome.
async fn clear_after<B, T>(registry: &session::Registry<B>, work: impl Future<Output = T>) -> T
where
    B: perf::CounterBackend,
{
    let out = work.await;
    registry.clear();
    out
}

/// Samples every session at each period boundary until Ctrl-C.
///
/// Returns early on the first output or runtime error.
async fn poll(
    registry: &Arc<session::Registry<perf::KernelBackend>>,
    energy: Option<Arc<energy::EnergyReader>>,
    hostname: &str,
    period: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH)?;
    let first_tick = tokio::time::Instant::now() + delay_until_round(since_epoch, period);
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            res = &mut shutdown => {
                res?;
                log::info!("Received Ctrl-C, stopping all sessions");
                return Ok(());
            }
        }
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64;

        let registry = Arc::clone(registry);
        let energy = energy.clone();
        let (counters, energy) = tokio::task::spawn_blocking(move || {
            let before = std::time::Instant::now();
            let mut out = Vec::with_capacity(registry.len());
            registry.collect(timestamp, &mut out);
            let energy = energy.and_then(|reader| {
                let values = reader.read_energy_uj().ok_log()?;
                Some(sample::EnergySample::new(
                    timestamp,
                    reader.zone_names(),
                    values,
                    reader.read_max_range_uj().to_vec(),
                ))
            });
            log::trace!("collect() took {} nanoseconds", before.elapsed().as_nanos());
            (out, energy)
        })
        .await?;

        let mut stdout = std::io::stdout().lock();
        for entry in &counters {
            sample::write_line(&mut stdout, hostname, entry)?;
        }
        if let Some(entry) = &energy {
            sample::write_line(&mut stdout, hostname, entry)?;
        }
        stdout.flush()?;
    }
}

/// Returns how long to wait from `since_epoch` until the next multiple of `period`.
///
/// Sampling on round timestamps keeps samples from different hosts aligned.
fn delay_until_round(since_epoch: Duration, period: Duration) -> Duration {
    let period_ns = period.as_nanos().max(1);
    let wait_ns = period_ns - since_epoch.as_nanos() % period_ns;
    Duration::from_nanos(u64::try_from(wait_ns).unwrap_or(u64::MAX))
}
