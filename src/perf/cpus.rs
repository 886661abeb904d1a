//! Online CPU detection from sysfs.

use std::io;
use std::path::Path;

use crate::fsutil;

pub const ONLINE_CPUS_PATH: &str = "/sys/devices/system/cpu/online";

/// Returns the number of online CPUs listed in `path` (e.g. `0-3,8-11`).
pub fn online_cpus(path: impl AsRef<Path>) -> io::Result<usize> {
    let path = path.as_ref();
    let raw = fsutil::read_trimmed(path).map_err(|e| e.source)?;
    parse_cpu_list(&raw).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid cpu list `{raw}` in `{}`", path.display()),
        )
    })
}

/// Counts the CPUs in a kernel cpu list. Returns `None` for a malformed or empty list.
fn parse_cpu_list(text: &str) -> Option<usize> {
    let mut total = 0usize;
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse::<usize>().ok()?;
                let end = end.trim().parse::<usize>().ok()?;
                if end < start {
                    return None;
                }
                total = total.saturating_add(end - start + 1);
            }
            None => {
                part.parse::<usize>().ok()?;
                total = total.saturating_add(1);
            }
        }
    }
    (total > 0).then_some(total)
}
