use crate::exporters::*;
use crate::sensors::sampler::{EnergySampler, Sample};
use crate::sensors::utils::current_system_time_since_epoch;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

/// An Exporter that writes the energy consumed by each RAPL domain
/// in the JSON format, either in a file or to the standard output.
pub struct JsonExporter {
    sampler: Arc<EnergySampler>,
    time_step: Duration,
    time_limit: Option<Duration>,
    out_writer: BufWriter<Box<dyn Write>>,
}

/// Holds the arguments for a JsonExporter.
#[derive(clap::Args, Debug)]
pub struct ExporterArgs {
    /// Maximum time spent measuring, in seconds.
    /// If unspecified, runs forever.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Interval between two measurements, in seconds
    #[arg(short, long, value_name = "SECONDS", default_value_t = 2)]
    pub step: u64,

    /// Destination file for the report (if absent, print the report to stdout)
    #[arg(short, long)]
    pub file: Option<String>,
}

// Below are the structures that will store the reports.

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Domain {
    key: String,
    package: String,
    name: String,
    energy_microjoules: u64,
    energy_joules: f64,
    timestamp: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Report {
    host: String,
    timestamp: f64,
    status: String,
    domains: Vec<Domain>,
    skipped: Vec<String>,
}

impl Report {
    fn from_sample(host: &str, sample: &Sample) -> Report {
        let domains = sample
            .values()
            .iter()
            .map(|v| Domain {
                key: v.key.to_string(),
                package: v.package.clone(),
                name: v.domain.clone(),
                energy_microjoules: v.record.value,
                energy_joules: v.joules(),
                timestamp: v.record.timestamp.as_secs_f64(),
            })
            .collect();
        let (status, skipped) = match sample {
            Sample::Complete(_) => ("complete", vec![]),
            Sample::Partial(_, failures) => {
                ("partial", failures.iter().map(|f| f.to_string()).collect())
            }
            Sample::NoData(error) => ("no_data", vec![error.to_string()]),
        };
        Report {
            host: String::from(host),
            timestamp: current_system_time_since_epoch().as_secs_f64(),
            status: String::from(status),
            domains,
            skipped,
        }
    }
}

impl Exporter for JsonExporter {
    /// Runs [iterate()] every `step` until `timeout`
    fn run(&mut self) {
        let step = self.time_step;
        info!("Measurement step is: {step:?}");

        if let Some(timeout) = self.time_limit {
            let t0 = Instant::now();
            while t0.elapsed() <= timeout {
                self.iterate();
                thread::sleep(self.time_step);
            }
        } else {
            loop {
                self.iterate();
                thread::sleep(self.time_step);
            }
        }
    }

    fn kind(&self) -> &str {
        "json"
    }
}

impl JsonExporter {
    /// Instantiates and returns a new JsonExporter.
    pub fn new(sampler: Arc<EnergySampler>, args: ExporterArgs) -> io::Result<JsonExporter> {
        let out_writer: Box<dyn Write> = match &args.file {
            Some(path) => Box::new(File::create(path)?),
            None => Box::new(io::stdout()),
        };
        Ok(JsonExporter {
            sampler,
            time_step: Duration::from_secs(args.step),
            time_limit: args.timeout.map(Duration::from_secs),
            out_writer: BufWriter::new(out_writer),
        })
    }

    fn iterate(&mut self) {
        let sample = self.sampler.sample();
        let report = Report::from_sample(self.sampler.hostname(), &sample);
        if let Err(error) = self.write_report(&report) {
            error!("Couldn't write JSON report: {}", error);
        }
    }

    /// One report per line.
    fn write_report(&mut self, report: &Report) -> io::Result<()> {
        serde_json::to_writer(&mut self.out_writer, report)?;
        self.out_writer.write_all(b"\n")?;
        self.out_writer.flush()
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
