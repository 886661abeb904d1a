//! Samples emitted by the daemon, one JSON object per line.

use std::io::{self, Write};

use serde::Serialize;

use crate::cgroup::CgroupName;

/// Per-cgroup counter deltas collected in one polling round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSample {
    /// Timestamp (in UNIX epoch milliseconds)
    pub timestamp: u64,
    pub backend: &'static str,
    pub cgroup: CgroupName,
    /// Metric names in selection order; repeated names are repeated here too.
    pub metric_names: Vec<&'static str>,
    /// Summed counts since the previous sample, aligned with `metric_names`.
    pub metric_values: Vec<u64>,
}

impl CounterSample {
    pub const BACKEND: &'static str = "perfhw";

    pub fn new(
        timestamp: u64,
        cgroup: CgroupName,
        metric_names: Vec<&'static str>,
        metric_values: Vec<u64>,
    ) -> Self {
        Self {
            timestamp,
            backend: Self::BACKEND,
            cgroup,
            metric_names,
            metric_values,
        }
    }
}

/// Cumulative energy counters of every RAPL zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnergySample {
    /// Timestamp (in UNIX epoch milliseconds)
    pub timestamp: u64,
    pub backend: &'static str,
    pub zone_names: Vec<String>,
    pub energy_uj: Vec<u64>,
    pub max_energy_range_uj: Vec<u64>,
}

impl EnergySample {
    pub const BACKEND: &'static str = "rapl";

    pub fn new(
        timestamp: u64,
        zone_names: Vec<String>,
        energy_uj: Vec<u64>,
        max_energy_range_uj: Vec<u64>,
    ) -> Self {
        Self {
            timestamp,
            backend: Self::BACKEND,
            zone_names,
            energy_uj,
            max_energy_range_uj,
        }
    }
}

#[derive(Serialize)]
struct Record<'a, T> {
    hostname: &'a str,
    #[serde(flatten)]
    sample: &'a T,
}

/// Writes `sample` tagged with `hostname` as a single JSON line.
pub fn write_line<W, T>(mut writer: W, hostname: &str, sample: &T) -> io::Result<()>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer(&mut writer, &Record { hostname, sample })?;
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_sample_line() {
        let sample = CounterSample::new(
            1_700_000_000_000,
            CgroupName::new("/oar/job_1").unwrap(),
            vec!["instructions", "instructions"],
            vec![10, 20],
        );
        let mut out = Vec::new();
        write_line(&mut out, "node-1", &sample).unwrap();

        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "hostname": "node-1",
                "timestamp": 1_700_000_000_000u64,
                "backend": "perfhw",
                "cgroup": "/oar/job_1",
                "metric_names": ["instructions", "instructions"],
                "metric_values": [10, 20],
            })
        );
    }

    #[test]
    fn test_energy_sample_line() {
        let sample = EnergySample::new(
            5,
            vec!["package-0".into(), "core".into(), "dram".into()],
            vec![1, 2, 3],
            vec![10, 20, 30],
        );
        let mut out = Vec::new();
        write_line(&mut out, "node-1", &sample).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["backend"], "rapl");
        assert_eq!(value["zone_names"][0], "package-0");
        assert_eq!(value["max_energy_range_uj"][2], 30);
    }
}
