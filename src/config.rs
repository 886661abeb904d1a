//! Daemon configuration read from environment variables.
//!
//! | Variable               | Default                                  |
//! |------------------------|------------------------------------------|
//! | `CGPERF_CGROUP_ROOT`   | detected from `/proc/self/mountinfo`     |
//! | `CGPERF_CGROUPS`       | empty                                    |
//! | `CGPERF_METRICS`       | `instructions,cache_misses,page_faults`  |
//! | `CGPERF_SAMPLE_PERIOD` | `1` (seconds)                            |
//! | `CGPERF_ENABLE_RAPL`   | `false`                                  |

use std::path::PathBuf;
use std::time::Duration;

pub const CGROUP_ROOT_VAR: &str = "CGPERF_CGROUP_ROOT";
pub const CGROUPS_VAR: &str = "CGPERF_CGROUPS";
pub const METRICS_VAR: &str = "CGPERF_METRICS";
pub const SAMPLE_PERIOD_VAR: &str = "CGPERF_SAMPLE_PERIOD";
pub const ENABLE_RAPL_VAR: &str = "CGPERF_ENABLE_RAPL";

pub const DEFAULT_METRICS: &str = "instructions,cache_misses,page_faults";
const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
#[error("invalid value `{value}` for environment variable `{var}`: {reason}")]
pub struct Error {
    pub var: &'static str,
    pub value: String,
    pub reason: &'static str,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the perf_event cgroup hierarchy; `None` means detect it.
    pub cgroup_root: Option<PathBuf>,
    /// Cgroups to start monitoring at startup.
    pub cgroups: Vec<String>,
    /// Metric spec applied to every seed cgroup.
    pub metrics: String,
    pub sample_period: Duration,
    pub enable_rapl: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cgroup_root: None,
            cgroups: Vec::new(),
            metrics: DEFAULT_METRICS.to_owned(),
            sample_period: DEFAULT_SAMPLE_PERIOD,
            enable_rapl: false,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(root) = lookup(CGROUP_ROOT_VAR).filter(|v| !v.is_empty()) {
            config.cgroup_root = Some(PathBuf::from(root));
        }
        if let Some(cgroups) = lookup(CGROUPS_VAR) {
            config.cgroups = cgroups
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(metrics) = lookup(METRICS_VAR) {
            config.metrics = metrics;
        }
        if let Some(raw) = lookup(SAMPLE_PERIOD_VAR) {
            config.sample_period = parse_period(&raw)?;
        }
        if let Some(raw) = lookup(ENABLE_RAPL_VAR) {
            config.enable_rapl = parse_bool(ENABLE_RAPL_VAR, &raw)?;
        }

        Ok(config)
    }
}

fn parse_period(raw: &str) -> Result<Duration> {
    let invalid = |reason| Error {
        var: SAMPLE_PERIOD_VAR,
        value: raw.to_owned(),
        reason,
    };
    let secs = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid("not a number"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid("must be a positive number of seconds"));
    }
    let period = Duration::try_from_secs_f64(secs).map_err(|_| invalid("out of range"))?;
    if period.is_zero() {
        return Err(invalid("must be a positive number of seconds"));
    }
    Ok(period)
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error {
            var,
            value: raw.to_owned(),
            reason: "expected a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| env.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.metrics, "instructions,cache_misses,page_faults");
        assert_eq!(config.sample_period, Duration::from_secs(1));
    }

    #[test]
    fn test_full_config() {
        let config = from_pairs(&[
            ("CGPERF_CGROUP_ROOT", "/sys/fs/cgroup/perf_event"),
            ("CGPERF_CGROUPS", "/oar/job_1, /oar/job_2,,"),
            ("CGPERF_METRICS", "cpu_cycles,instructions"),
            ("CGPERF_SAMPLE_PERIOD", "0.5"),
            ("CGPERF_ENABLE_RAPL", "TRUE"),
        ])
        .unwrap();

        assert_eq!(
            config.cgroup_root,
            Some(PathBuf::from("/sys/fs/cgroup/perf_event"))
        );
        assert_eq!(config.cgroups, ["/oar/job_1", "/oar/job_2"]);
        assert_eq!(config.metrics, "cpu_cycles,instructions");
        assert_eq!(config.sample_period, Duration::from_millis(500));
        assert!(config.enable_rapl);
    }

    #[test]
    fn test_invalid_period() {
        for raw in ["abc", "0", "-1", "inf", "1e-12"] {
            let err = from_pairs(&[("CGPERF_SAMPLE_PERIOD", raw)]).unwrap_err();
            assert_eq!(err.var, SAMPLE_PERIOD_VAR);
            assert_eq!(err.value, raw);
        }
    }

    #[test]
    fn test_smallest_period_is_one_nanosecond() {
        let config = from_pairs(&[("CGPERF_SAMPLE_PERIOD", "1e-9")]).unwrap();
        assert_eq!(config.sample_period, Duration::from_nanos(1));
    }

    #[test]
    fn test_invalid_bool() {
        let err = from_pairs(&[("CGPERF_ENABLE_RAPL", "maybe")]).unwrap_err();
        assert_eq!(err.var, ENABLE_RAPL_VAR);
    }
}
