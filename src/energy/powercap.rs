//! Discovery of RAPL zones in the powercap sysfs tree.
//!
//! See <https://www.kernel.org/doc/html/latest/power/powercap/powercap.html>.
//! A package zone lives at `<root>/intel-rapl:<N>`; its sub-zones live at
//! `<root>/intel-rapl:<N>/intel-rapl:<N>:<M>` and are told apart by their `name`
//! attribute (`core`, `uncore`, `dram`, ...), not by `M`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::fsutil;

use super::{Error, Result};

pub const DEFAULT_POWERCAP_ROOT: &str = "/sys/class/powercap";
const PACKAGE_PREFIX: &str = "intel-rapl:";

pub(super) const ENERGY_FILE: &str = "energy_uj";
pub(super) const MAX_RANGE_FILE: &str = "max_energy_range_uj";
const NAME_FILE: &str = "name";

/// The zone kinds reported for every package, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    Package,
    Core,
    Dram,
}

impl ZoneKind {
    pub const ALL: [ZoneKind; 3] = [ZoneKind::Package, ZoneKind::Core, ZoneKind::Dram];

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneKind::Package => "package",
            ZoneKind::Core => "core",
            ZoneKind::Dram => "dram",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A zone directory and the value of its `name` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDir {
    pub path: PathBuf,
    pub name: String,
}

/// The zones of one initialized package, one slot per [`ZoneKind::ALL`] entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageZones {
    pub package: u32,
    /// `None` when the package has no sub-zone of that kind.
    pub zones: [Option<ZoneDir>; 3],
}

/// Read access to a powercap sysfs tree.
#[derive(Debug, Clone)]
pub struct Powercap {
    root: PathBuf,
}

impl Default for Powercap {
    fn default() -> Self {
        Self::new(DEFAULT_POWERCAP_ROOT)
    }
}

impl Powercap {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the indices of all RAPL packages, ascending.
    ///
    /// A missing powercap root counts as zero packages.
    pub fn packages(&self) -> Result<Vec<u32>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(Error::Enumerate {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut packages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::Enumerate {
                path: self.root.clone(),
                source,
            })?;
            if let Some(package) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix(PACKAGE_PREFIX))
                .and_then(|index| index.parse::<u32>().ok())
            {
                packages.push(package);
            }
        }
        packages.sort_unstable();
        Ok(packages)
    }

    /// Validates package `package` and locates its zones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageInit`] if the package zone's `name` or `energy_uj`
    /// attribute cannot be read, or its sub-zones cannot be listed.
    pub fn init_package(&self, package: u32) -> Result<PackageZones> {
        let dir = self.root.join(format!("{PACKAGE_PREFIX}{package}"));
        let name = fsutil::read_trimmed(dir.join(NAME_FILE))
            .map_err(|e| Error::package_init(package, e))?;
        fsutil::read_u64(dir.join(ENERGY_FILE)).map_err(|e| Error::package_init(package, e))?;

        let mut zones: [Option<ZoneDir>; 3] = [None, None, None];
        zones[0] = Some(ZoneDir {
            path: dir.clone(),
            name,
        });

        let subzone_prefix = format!("{PACKAGE_PREFIX}{package}:");
        let init_err = |source| Error::PackageInit {
            package,
            path: dir.clone(),
            source,
        };
        for entry in fs::read_dir(&dir).map_err(init_err)? {
            let entry = entry.map_err(init_err)?;
            let is_subzone = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(&subzone_prefix));
            if !is_subzone {
                continue;
            }

            let path = entry.path();
            let name = fsutil::read_trimmed(path.join(NAME_FILE))
                .map_err(|e| Error::package_init(package, e))?;
            let slot = match name.as_str() {
                "core" => 1,
                "dram" => 2,
                _ => continue,
            };
            if zones[slot].is_none() {
                zones[slot] = Some(ZoneDir { path, name });
            }
        }

        Ok(PackageZones { package, zones })
    }
}
