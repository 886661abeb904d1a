use crate::fsutil;

use super::parser::parse_mount_entry;
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Which cgroup hierarchy flavour hosts the perf_event controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    /// Dedicated v1 hierarchy with the `perf_event` controller attached.
    V1,
    /// Unified v2 hierarchy; perf_event is implicitly available on every cgroup.
    V2,
}

/// Mount point of the hierarchy that perf counters are scoped against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfEventHierarchy {
    pub mount_point: PathBuf,
    pub version: CgroupVersion,
}

/// Detects the perf_event hierarchy and validates that it is an accessible directory.
///
/// The returned mount point is canonicalized.
///
/// # Errors
///
/// Returns errors from [`detect_perf_event_hierarchy`] and:
///
/// - [`Error::Canonicalization`] / [`Error::Metadata`] if the path cannot be accessed.
/// - [`Error::NotADirectory`] if the resolved path is not a directory.
///
/// # Example
///
/// ```no_run
/// use cgperf::mountinfo::detect_validated_perf_event_hierarchy;
///
/// let hierarchy = detect_validated_perf_event_hierarchy("/proc/self/mountinfo").unwrap();
/// println!("perf_event root: {}", hierarchy.mount_point.display());
/// ```
pub fn detect_validated_perf_event_hierarchy(
    path: impl AsRef<Path>,
) -> Result<PerfEventHierarchy> {
    let raw = detect_perf_event_hierarchy(&path)?;
    let canonical =
        std::fs::canonicalize(&raw.mount_point).map_err(|e| Error::Canonicalization {
            path: raw.mount_point.clone(),
            source: e,
        })?;

    let metadata = std::fs::metadata(&canonical).map_err(|e| Error::Metadata {
        path: canonical.clone(),
        source: e,
    })?;

    if !metadata.is_dir() {
        return Err(Error::NotADirectory { path: canonical });
    }

    Ok(PerfEventHierarchy {
        mount_point: canonical,
        version: raw.version,
    })
}

/// Detects the perf_event hierarchy by parsing a Linux `mountinfo` file.
///
/// A cgroup v1 mount carrying the `perf_event` controller is preferred, since on
/// hybrid hosts that is where the kernel accounts perf cgroup events. Otherwise the
/// first `cgroup2` mount is used.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
/// - [`Error::MissingPerfEventMount`] if neither kind of mount is present.
pub fn detect_perf_event_hierarchy(path: impl AsRef<Path>) -> Result<PerfEventHierarchy> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_from_reader(buf, path)
}

fn detect_from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<PerfEventHierarchy> {
    let mut line = String::with_capacity(256);
    let mut unified = None;

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        let entry = parse_mount_entry(line.as_str()).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        match entry.fs_type {
            "cgroup" if entry.has_super_option("perf_event") => {
                log::debug!(
                    "Found cgroup v1 perf_event mount with root `{}`: {}",
                    entry.root,
                    entry.mount_point
                );
                return Ok(PerfEventHierarchy {
                    mount_point: PathBuf::from(entry.mount_point),
                    version: CgroupVersion::V1,
                });
            }
            "cgroup2" if unified.is_none() => {
                log::debug!(
                    "Found `cgroup2` mount with root `{}`: {}",
                    entry.root,
                    entry.mount_point
                );
                unified = Some(PathBuf::from(entry.mount_point));
            }
            _ => {}
        }

        line.clear();
    }

    match unified {
        Some(mount_point) => Ok(PerfEventHierarchy {
            mount_point,
            version: CgroupVersion::V2,
        }),
        None => Err(Error::MissingPerfEventMount {
            path: origin.to_path_buf(),
        }),
    }
}
