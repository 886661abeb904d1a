//! Cumulative RAPL energy counters from the powercap sysfs interface.
//!
//! Zones are enumerated once; afterwards only the hardware counters change.
//! Values are reported as-is: computing deltas and handling wraparound (using
//! [`EnergyReader::read_max_range_uj`]) is left to the consumer.
mod error;
mod powercap;
mod reader;

pub use error::{Error, Result};
pub use powercap::{DEFAULT_POWERCAP_ROOT, PackageZones, Powercap, ZoneDir, ZoneKind};
pub use reader::{EnergyReader, EnergyZone};
