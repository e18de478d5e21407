//! # sensors
//!
//! Everything that reads energy counters from the host: the [`Sensor`] API,
//! the powercap implementation, the delta tracker and the sampler tying them
//! together.
pub mod powercap_rapl;
pub mod sampler;
pub mod tracker;
pub mod units;
pub mod utils;

use crate::errors::PowercapReadError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// !!!!!!!!!!!!!!!!! Sensor !!!!!!!!!!!!!!!!!!!!!!!
/// Sensor trait, the Sensor API.
///
/// A sensor discovers the energy domains currently present on the host.
/// It is called again on every sample, domains may come and go.
pub trait Sensor: Send + Sync {
    fn generate_topology(&self) -> Result<Topology, PowercapReadError>;
}

// !!!!!!!!!!!!!!!!! Topology !!!!!!!!!!!!!!!!!!!!!!!
/// Topology is the result of one enumeration: every energy domain found,
/// sorted by key, and the entries that had to be skipped.
#[derive(Debug, Default)]
pub struct Topology {
    pub domains: Vec<EnergyDomain>,
    pub skipped: Vec<PowercapReadError>,
}

impl Topology {
    pub fn new() -> Topology {
        Topology::default()
    }

    /// Adds `domain` unless a domain with the same key is already known.
    pub fn safe_add_domain(&mut self, domain: EnergyDomain) {
        let key = domain.key();
        if !self.domains.iter().any(|d| d.key() == key) {
            self.domains.push(domain);
        } else {
            debug!("Domain {} already in topology, ignoring {:?}", key, domain.path);
        }
    }

    pub fn add_skipped(&mut self, error: PowercapReadError) {
        warn!("{}", error);
        self.skipped.push(error);
    }

    /// Sorts domains by key. Enumeration order of the filesystem isn't stable.
    pub fn sort(&mut self) {
        self.domains.sort_by_key(|d| d.key());
    }

    pub fn keys(&self) -> Vec<DomainKey> {
        self.domains.iter().map(|d| d.key()).collect()
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

// !!!!!!!!!!!!!!!!! EnergyDomain !!!!!!!!!!!!!!!!!!!!!!!
/// One counter source: either the package-level counter of a CPU package
/// or one of its subdomains (core, uncore, dram...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyDomain {
    pub package_id: u16,
    /// "package" for the package counter itself, the subdomain name otherwise.
    pub domain_name: String,
    /// Directory holding energy_uj and max_energy_range_uj.
    pub path: PathBuf,
}

impl EnergyDomain {
    pub fn new(package_id: u16, domain_name: &str, path: &Path) -> EnergyDomain {
        EnergyDomain {
            package_id,
            domain_name: String::from(domain_name),
            path: path.to_path_buf(),
        }
    }

    pub fn key(&self) -> DomainKey {
        DomainKey::new(self.package_id, &self.domain_name)
    }

    pub fn counter_uj_path(&self) -> PathBuf {
        self.path.join("energy_uj")
    }

    pub fn max_range_uj_path(&self) -> PathBuf {
        self.path.join("max_energy_range_uj")
    }
}

impl fmt::Display for EnergyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Domain: {} ({})", self.key(), self.path.display())
    }
}

// !!!!!!!!!!!!!!!!! DomainKey !!!!!!!!!!!!!!!!!!!!!!!
/// Stable identifier of a domain across polls, rendered as `pkg0-dram`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainKey(String);

impl DomainKey {
    pub fn new(package_id: u16, domain_name: &str) -> DomainKey {
        DomainKey(format!("pkg{}-{}", package_id, domain_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// !!!!!!!!!!!!!!!!! Record !!!!!!!!!!!!!!!!!!!!!!!
/// Record struct represents an energy measurement tied to a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: Duration,
    pub value: u64,
    pub unit: units::Unit,
}

impl Record {
    pub fn new(timestamp: Duration, value: u64, unit: units::Unit) -> Record {
        Record {
            timestamp,
            value,
            unit,
        }
    }

    /// Returns the value converted to `unit`.
    pub fn value_in(&self, unit: &units::Unit) -> f64 {
        units::Unit::to(self.value as f64, &self.unit, unit)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recorded {} {} at {:?}",
            self.value, self.unit, self.timestamp
        )
    }
}
