use std::path::PathBuf;

use crate::fsutil;

use super::powercap::{ENERGY_FILE, MAX_RANGE_FILE, Powercap, ZoneKind};
use super::{Error, Result};

/// One (package, zone kind) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyZone {
    pub package_index: u32,
    pub kind: ZoneKind,
    /// The zone's powercap `name`, or the kind name for an unsupported zone.
    pub display_name: String,
    dir: Option<PathBuf>,
}

impl EnergyZone {
    /// Returns false if the package exposes no zone of this kind; such zones read as 0.
    pub fn is_supported(&self) -> bool {
        self.dir.is_some()
    }

    fn read(&self, file: &str) -> Result<u64> {
        match &self.dir {
            Some(dir) => Ok(fsutil::read_u64(dir.join(file))?),
            None => Ok(0),
        }
    }
}

/// Energy counters of every package, enumerated once.
///
/// Every package contributes one entry per [`ZoneKind::ALL`] kind, so a host with
/// `P` packages always yields `P * 3` zones in package-major order.
#[derive(Debug, Clone)]
pub struct EnergyReader {
    zones: Vec<EnergyZone>,
    max_range_uj: Vec<u64>,
}

impl EnergyReader {
    /// Enumerates packages and zones and reads their wraparound ceilings.
    ///
    /// # Errors
    ///
    /// - [`Error::NoPackagesFound`] if the host exposes no RAPL package.
    /// - [`Error::PackageInit`] if any package fails to initialize; no partial
    ///   reader is returned.
    pub fn initialize(powercap: &Powercap) -> Result<Self> {
        let packages = powercap.packages()?;
        if packages.is_empty() {
            return Err(Error::NoPackagesFound {
                path: powercap.root().to_path_buf(),
            });
        }

        let mut zones = Vec::with_capacity(packages.len() * ZoneKind::ALL.len());
        let mut max_range_uj = Vec::with_capacity(zones.capacity());
        for package in packages {
            let found = powercap.init_package(package)?;
            for (kind, dir) in ZoneKind::ALL.into_iter().zip(found.zones) {
                let zone = match dir {
                    Some(dir) => EnergyZone {
                        package_index: package,
                        kind,
                        display_name: dir.name,
                        dir: Some(dir.path),
                    },
                    None => {
                        log::debug!("RAPL package {package} has no `{kind}` zone");
                        EnergyZone {
                            package_index: package,
                            kind,
                            display_name: kind.to_string(),
                            dir: None,
                        }
                    }
                };
                let max = zone.read(MAX_RANGE_FILE).map_err(|err| match err {
                    Error::Read(e) => Error::package_init(package, e),
                    other => other,
                })?;
                max_range_uj.push(max);
                zones.push(zone);
            }
        }

        log::debug!("Initialized {} RAPL zones", zones.len());
        Ok(Self {
            zones,
            max_range_uj,
        })
    }

    pub fn zones(&self) -> &[EnergyZone] {
        &self.zones
    }

    pub fn zone_names(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.display_name.clone()).collect()
    }

    /// Reads the cumulative energy of every zone in microjoules, in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if any supported zone cannot be read.
    pub fn read_energy_uj(&self) -> Result<Vec<u64>> {
        self.zones.iter().map(|z| z.read(ENERGY_FILE)).collect()
    }

    /// The wraparound ceiling of every zone in microjoules, read at initialization.
    pub fn read_max_range_uj(&self) -> &[u64] {
        &self.max_range_uj
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
