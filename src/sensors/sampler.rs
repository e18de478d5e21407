//! # sampler
//!
//! The pull-based entrypoint used by every exporter: [`EnergySampler::sample`]
//! enumerates the domains and observes each of them while holding the
//! tracker lock, so two overlapping scrapes can't corrupt each other's
//! baselines.
use crate::errors::PowercapReadError;
use crate::sensors::tracker::DeltaTracker;
use crate::sensors::utils::current_system_time_since_epoch;
use crate::sensors::{units, DomainKey, EnergyDomain, Record, Sensor, Topology};
use std::sync::{Mutex, PoisonError};

/// Label schema shared by every energy value, in exposition order.
pub const LABELS: [&str; 3] = ["instance", "package", "domain"];

/// Metadata of an exposed metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub metric_type: &'static str,
    pub labels: Vec<&'static str>,
}

/// Energy consumed by one domain since the previous sample.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainSample {
    pub key: DomainKey,
    pub instance: String,
    pub package: String,
    pub domain: String,
    /// Delta in microjoules.
    pub record: Record,
}

impl DomainSample {
    fn new(domain: &EnergyDomain, instance: &str, record: Record) -> DomainSample {
        DomainSample {
            key: domain.key(),
            instance: String::from(instance),
            package: domain.package_id.to_string(),
            domain: domain.domain_name.clone(),
            record,
        }
    }

    /// Label values, in the order of [`LABELS`].
    pub fn labels(&self) -> Vec<(&'static str, &str)> {
        vec![
            (LABELS[0], self.instance.as_str()),
            (LABELS[1], self.package.as_str()),
            (LABELS[2], self.domain.as_str()),
        ]
    }

    pub fn joules(&self) -> f64 {
        self.record.value_in(&units::Unit::Joule)
    }
}

/// Outcome of one [`EnergySampler::sample`] call.
#[derive(Debug)]
pub enum Sample {
    /// Every enumerated domain has a value.
    Complete(Vec<DomainSample>),
    /// Some entries or domains were skipped, the others have a value.
    Partial(Vec<DomainSample>, Vec<PowercapReadError>),
    /// The powercap interface is absent or unreadable on this host.
    NoData(PowercapReadError),
}

impl Sample {
    pub fn values(&self) -> &[DomainSample] {
        match self {
            Sample::Complete(values) | Sample::Partial(values, _) => values.as_slice(),
            Sample::NoData(_) => &[],
        }
    }

    pub fn find(&self, key: &str) -> Option<&DomainSample> {
        self.values().iter().find(|v| v.key.as_str() == key)
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Sample::NoData(_))
    }
}

/// Owns a sensor and the delta tracker fed by it.
pub struct EnergySampler {
    sensor: Box<dyn Sensor>,
    tracker: Mutex<DeltaTracker>,
    hostname: String,
}

impl EnergySampler {
    pub fn new(sensor: Box<dyn Sensor>, tracker: DeltaTracker, hostname: &str) -> EnergySampler {
        EnergySampler {
            sensor,
            tracker: Mutex::new(tracker),
            hostname: String::from(hostname),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the energy delta of every domain currently present.
    ///
    /// The tracker lock is held from enumeration to the last observation.
    pub fn sample(&self) -> Sample {
        // observe() commits with a single insert, the state is usable after a panic
        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);

        let topology = match self.sensor.generate_topology() {
            Ok(topology) => topology,
            Err(error) => {
                warn!("No RAPL data available for this sample: {}", error);
                return Sample::NoData(error);
            }
        };
        tracker.retain(&topology.keys());

        let Topology { domains, skipped } = topology;
        let mut failures = skipped;
        let mut values = Vec::with_capacity(domains.len());
        let timestamp = current_system_time_since_epoch();
        for domain in &domains {
            match tracker.observe(domain) {
                Ok(delta) => values.push(DomainSample::new(
                    domain,
                    &self.hostname,
                    Record::new(timestamp, delta, units::Unit::MicroJoule),
                )),
                Err(error) => {
                    warn!("Skipping {} for this sample: {}", domain.key(), error);
                    failures.push(error);
                }
            }
        }

        finish_sample(values, failures)
    }

    /// Metadata of the metrics built from [`EnergySampler::sample`].
    pub fn descriptors(&self) -> Vec<MetricDescriptor> {
        vec![MetricDescriptor {
            name: "rapl_energy_joules",
            help: "RAPL energy consumed since the previous scrape, in joules.",
            metric_type: "gauge",
            labels: LABELS.to_vec(),
        }]
    }

    /// Number of domains the tracker holds a baseline for.
    pub fn tracked_domains(&self) -> usize {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Nothing read and every failure meaning "no data on this host" (absent
/// or permission denied) is a no-data sample, not a partial one.
fn finish_sample(values: Vec<DomainSample>, mut failures: Vec<PowercapReadError>) -> Sample {
    if failures.is_empty() {
        return Sample::Complete(values);
    }
    if values.is_empty() && failures.iter().all(PowercapReadError::is_no_data) {
        let error = failures.swap_remove(0);
        warn!("No RAPL data available for this sample: {}", error);
        return Sample::NoData(error);
    }
    Sample::Partial(values, failures)
}
