#[cfg(feature = "json")]
pub mod json;
#[cfg(feature = "prometheus")]
pub mod prometheus;
pub mod stdout;
pub mod utils;

use crate::sensors::sampler::{EnergySampler, Sample};
use crate::sensors::utils::current_system_time_since_epoch;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use utils::get_version;

/// One value ready to be formatted by an exporter.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: String,
    pub metric_type: String,
    pub timestamp: Duration,
    pub hostname: String,
    pub attributes: BTreeMap<String, String>,
    pub description: String,
    pub metric_value: MetricValueType,
}

#[derive(Clone)]
pub enum MetricValueType {
    IntUnsigned(u64),
    FloatDouble(f64),
    Text(String),
}

impl fmt::Display for MetricValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            MetricValueType::Text(text) => write!(f, "{text}"),
            MetricValueType::FloatDouble(value) => write!(f, "{value}"),
            MetricValueType::IntUnsigned(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Debug for MetricValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An Exporter is what tells rapl-exporter when to sample and how to export
/// or expose the result.
/// It either serves the metrics to a scraper or prints them at its own pace,
/// in both cases by calling [`EnergySampler::sample`] through a [`MetricGenerator`].
pub trait Exporter {
    /// Runs the exporter.
    fn run(&mut self);

    /// The name of the kind of the exporter, for example "json".
    fn kind(&self) -> &str;
}

/// Turns samples into [`Metric`]s.
pub struct MetricGenerator {
    sampler: Arc<EnergySampler>,
    data: Vec<Metric>,
}

impl MetricGenerator {
    pub fn new(sampler: Arc<EnergySampler>) -> MetricGenerator {
        MetricGenerator {
            sampler,
            data: Vec::new(),
        }
    }

    /// Samples once and generates the energy metrics plus the self metrics.
    /// Returns the sample so callers can report what was skipped.
    pub fn gen_all_metrics(&mut self) -> Sample {
        let sample = self.sampler.sample();
        self.gen_energy_metrics(&sample);
        self.gen_self_metrics(&sample);
        sample
    }

    fn gen_energy_metrics(&mut self, sample: &Sample) {
        let descriptors = self.sampler.descriptors();
        let Some(descriptor) = descriptors.first() else {
            return;
        };
        for value in sample.values() {
            let attributes = value
                .labels()
                .into_iter()
                .map(|(k, v)| (String::from(k), String::from(v)))
                .collect();
            self.data.push(Metric {
                name: String::from(descriptor.name),
                metric_type: String::from(descriptor.metric_type),
                timestamp: value.record.timestamp,
                hostname: value.instance.clone(),
                attributes,
                description: String::from(descriptor.help),
                metric_value: MetricValueType::FloatDouble(value.joules()),
            });
        }
    }

    fn gen_self_metrics(&mut self, sample: &Sample) {
        let timestamp = current_system_time_since_epoch();
        let hostname = String::from(self.sampler.hostname());
        let skipped = match sample {
            Sample::Complete(_) => 0,
            Sample::Partial(_, failures) => failures.len(),
            Sample::NoData(_) => 0,
        };

        self.data.push(Metric {
            name: String::from("rapl_exporter_self_version"),
            metric_type: String::from("gauge"),
            timestamp,
            hostname: hostname.clone(),
            attributes: BTreeMap::new(),
            description: String::from("Version number of rapl-exporter."),
            metric_value: MetricValueType::Text(get_version()),
        });
        self.data.push(Metric {
            name: String::from("rapl_exporter_self_domains_tracked"),
            metric_type: String::from("gauge"),
            timestamp,
            hostname: hostname.clone(),
            attributes: BTreeMap::new(),
            description: String::from("Number of RAPL domains with a baseline in the tracker."),
            metric_value: MetricValueType::IntUnsigned(self.sampler.tracked_domains() as u64),
        });
        self.data.push(Metric {
            name: String::from("rapl_exporter_self_domains_skipped"),
            metric_type: String::from("gauge"),
            timestamp,
            hostname: hostname.clone(),
            attributes: BTreeMap::new(),
            description: String::from("Number of RAPL entries skipped during the last sample."),
            metric_value: MetricValueType::IntUnsigned(skipped as u64),
        });
        self.data.push(Metric {
            name: String::from("rapl_exporter_self_data_available"),
            metric_type: String::from("gauge"),
            timestamp,
            hostname,
            attributes: BTreeMap::new(),
            description: String::from("1 if the powercap interface could be read, 0 otherwise."),
            metric_value: MetricValueType::IntUnsigned(u64::from(!sample.is_no_data())),
        });
    }

    /// Returns the metrics generated so far and empties the buffer.
    pub fn pop_metrics(&mut self) -> Vec<Metric> {
        std::mem::take(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_sampler;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn energy_metrics_carry_labels() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("intel-rapl:0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), "package-0\n").unwrap();
        fs::write(dir.join("energy_uj"), "1000\n").unwrap();

        let sampler = build_sampler(root.path().to_str().unwrap(), false, "node-1").unwrap();
        let mut generator = MetricGenerator::new(sampler);
        generator.gen_all_metrics();
        fs::write(dir.join("energy_uj"), "2501000\n").unwrap();
        generator.pop_metrics();
        generator.gen_all_metrics();
        let metrics = generator.pop_metrics();

        let energy = metrics
            .iter()
            .find(|m| m.name == "rapl_energy_joules")
            .unwrap();
        assert_eq!(energy.attributes.get("package").unwrap(), "0");
        assert_eq!(energy.attributes.get("domain").unwrap(), "package");
        assert_eq!(energy.attributes.get("instance").unwrap(), "node-1");
        assert_eq!(energy.metric_value.to_string(), "2.5");

        let tracked = metrics
            .iter()
            .find(|m| m.name == "rapl_exporter_self_domains_tracked")
            .unwrap();
        assert_eq!(tracked.metric_value.to_string(), "1");
    }

    #[test]
    fn no_data_only_emits_self_metrics() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("powercap");
        let sampler = build_sampler(missing.to_str().unwrap(), false, "node-1").unwrap();
        let mut generator = MetricGenerator::new(sampler);
        assert!(generator.gen_all_metrics().is_no_data());
        let metrics = generator.pop_metrics();
        assert!(metrics.iter().all(|m| m.name.starts_with("rapl_exporter_self_")));
        let available = metrics
            .iter()
            .find(|m| m.name == "rapl_exporter_self_data_available")
            .unwrap();
        assert_eq!(available.metric_value.to_string(), "0");
    }
}

//  Copyright 2020 The rapl-exporter authors.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
