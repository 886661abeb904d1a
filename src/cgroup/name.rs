use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::{Error, Result};

/// Linux `PATH_MAX`; no cgroup directory path can be longer.
const CGROUP_NAME_MAX_LEN: usize = 4096;

/// A validated cgroup identifier.
///
/// # Examples
///
/// ```
/// # use cgperf::cgroup::CgroupName;
/// let name = CgroupName::new("/oar/job_42").unwrap();
/// assert_eq!(name.as_ref(), "/oar/job_42");
/// assert_eq!(
///     name.resolve("/sys/fs/cgroup/perf_event"),
///     std::path::PathBuf::from("/sys/fs/cgroup/perf_event/oar/job_42"),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CgroupName(Arc<str>);

impl CgroupName {
    /// Creates a new `CgroupName` from the given raw name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is empty, longer than `PATH_MAX`,
    /// contains a NUL byte or a `..` component.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        let invalid = |reason| {
            Err(Error::InvalidName {
                name: src.to_owned(),
                reason,
            })
        };

        if src.trim_matches('/').is_empty() {
            return invalid("empty name");
        }
        if src.len() > CGROUP_NAME_MAX_LEN {
            return invalid("name exceeds PATH_MAX");
        }
        if src.contains('\0') {
            return invalid("name contains a NUL byte");
        }
        if Path::new(src)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return invalid("name escapes the hierarchy root");
        }

        Ok(Self(src.into()))
    }

    /// Returns the cgroup directory under the given hierarchy root.
    pub fn resolve(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(self.0.trim_start_matches('/'))
    }
}

impl FromStr for CgroupName {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for CgroupName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CgroupName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for CgroupName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl fmt::Display for CgroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
