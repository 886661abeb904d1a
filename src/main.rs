/// Entry point for the cgperf monitoring daemon.
///
/// Opens per-cgroup performance counters for the cgroups listed in the
/// environment and prints one JSON line per cgroup (plus one for RAPL energy, if
/// enabled) at every sample period.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid environment variables
/// or no perf_event cgroup hierarchy).
///
/// # Examples
///
/// ```bash
/// CGPERF_CGROUPS=/oar/job_42 CGPERF_METRICS=instructions,cache_misses RUST_LOG=info cgperf
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    cgperf::run().await
}
