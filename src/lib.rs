//! Per-scrape RAPL energy deltas read from the Linux powercap interface.
//!
//! [`sensors`] holds the core: domain enumeration, the delta tracker and
//! the [`sensors::sampler::EnergySampler`]. [`exporters`] format samples
//! for Prometheus, the terminal or JSON.
#[macro_use]
extern crate log;
pub mod errors;
pub mod exporters;
pub mod sensors;

use errors::PowercapReadError;
use sensors::powercap_rapl::PowercapRAPLSensor;
use sensors::sampler::EnergySampler;
use sensors::tracker::DeltaTracker;
use std::sync::Arc;

/// Builds a sampler reading the powercap tree found at `powercap_path`.
///
/// Fails only when the path can't be used as a powercap root at all.
/// A host without RAPL support still gets a sampler, whose samples
/// report no data.
pub fn build_sampler(
    powercap_path: &str,
    evict_stale: bool,
    hostname: &str,
) -> Result<Arc<EnergySampler>, PowercapReadError> {
    let sensor = PowercapRAPLSensor::new(powercap_path)?;
    Ok(Arc::new(EnergySampler::new(
        Box::new(sensor),
        DeltaTracker::with_eviction(evict_stale),
        hostname,
    )))
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
