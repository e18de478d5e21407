use crate::exporters::*;
use crate::sensors::sampler::{EnergySampler, Sample};
use crate::sensors::utils::current_system_time_since_epoch;
use chrono::{Local, TimeZone};
use colored::*;
use std::fmt::Write as _;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// An Exporter that displays the energy consumed by each RAPL domain
/// on the standard output of the terminal.
pub struct StdoutExporter {
    sampler: Arc<EnergySampler>,
    time_step: Duration,
    time_limit: Option<Duration>,
}

/// Holds the arguments for a StdoutExporter.
///
/// When using rapl-exporter as a command-line application, such a struct will be
/// automatically populated by the clap library. If you're using it as
/// a library, you should populate the arguments yourself.
#[derive(clap::Args, Debug)]
pub struct ExporterArgs {
    /// Maximum time spent measuring, in seconds.
    /// If unspecified, runs forever.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Interval between two measurements, in seconds
    #[arg(short, long, value_name = "SECONDS", default_value_t = 2)]
    pub step: u64,
}

impl Exporter for StdoutExporter {
    /// Runs [iterate()] every `step` until `timeout`
    fn run(&mut self) {
        println!("Measurement step is: {}s", self.time_step.as_secs());
        if let Some(timeout) = self.time_limit {
            let now = Instant::now();
            while now.elapsed() <= timeout {
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
        "stdout"
    }
}

impl StdoutExporter {
    /// Instantiates and returns a new StdoutExporter
    pub fn new(sampler: Arc<EnergySampler>, args: ExporterArgs) -> StdoutExporter {
        StdoutExporter {
            sampler,
            time_step: Duration::from_secs(args.step),
            time_limit: args.timeout.map(Duration::from_secs),
        }
    }

    fn iterate(&mut self) {
        let sample = self.sampler.sample();
        println!("{}", self.render(&sample));
    }

    /// Formats one sample as a small table, one line per domain.
    pub fn render(&self, sample: &Sample) -> String {
        let mut to_print = String::new();
        let timestamp = sample
            .values()
            .first()
            .map(|v| v.record.timestamp)
            .unwrap_or_else(current_system_time_since_epoch);
        let date = Local
            .timestamp_opt(timestamp.as_secs() as i64, 0)
            .single()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| String::from("-"));
        let _ = writeln!(to_print, "Host:\t{}\t{}", self.sampler.hostname(), date);

        match sample {
            Sample::NoData(error) => {
                let _ = writeln!(to_print, "{}", format!("No RAPL data: {error}").bright_yellow());
            }
            Sample::Complete(values) | Sample::Partial(values, _) => {
                let _ = writeln!(to_print, "Domain\t\tEnergy");
                for v in values {
                    let _ = writeln!(to_print, "{}\t{:.6} J", v.key, v.joules());
                }
            }
        }
        if let Sample::Partial(_, failures) = sample {
            for f in failures {
                let _ = writeln!(to_print, "{}", format!("skipped: {f}").bright_yellow());
            }
        }
        to_print.push_str("------------------------------------------------------------");
        to_print
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
