//! Per-scrape RAPL energy exporter.
#[macro_use]
extern crate log;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use rapl_exporter::exporters::{self, utils};
use rapl_exporter::sensors::powercap_rapl::DEFAULT_POWERCAP_PATH;
use rapl_exporter::sensors::sampler::EnergySampler;
use std::process;
use std::sync::Arc;

// the struct below defines the main command-line interface
/// Exposes the energy consumed by each RAPL domain since the previous scrape.
#[derive(Parser)]
#[command(author, version)]
struct Cli {
    /// The exporter module to use to output the energy metrics
    #[command(subcommand)]
    exporter: ExporterChoice,

    /// Increase the verbosity level
    #[arg(short, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,

    /// Don't print the header to the standard output
    #[arg(long, default_value_t = false)]
    no_header: bool,

    /// Root of the powercap sysfs tree
    #[arg(long, value_name = "DIR", default_value_t = String::from(DEFAULT_POWERCAP_PATH))]
    powercap_path: String,

    /// Forget the baseline of domains that are no longer enumerated
    #[arg(long, default_value_t = false)]
    evict_stale: bool,
}

/// Defines the possible subcommands, one per exporter.
///
/// ### Description style
/// Per the clap documentation, the description of commands and arguments should be written in the style applied here,
/// *not* in the third-person. That is, use "Do xyz" instead of "Does xyz".
#[derive(Subcommand)]
enum ExporterChoice {
    /// Write the metrics in the JSON format to a file or to stdout
    #[cfg(feature = "json")]
    Json(exporters::json::ExporterArgs),

    /// Expose the metrics to a Prometheus HTTP endpoint
    #[cfg(feature = "prometheus")]
    Prometheus(exporters::prometheus::ExporterArgs),

    /// Write the metrics to the terminal
    Stdout(exporters::stdout::ExporterArgs),
}

fn main() {
    let cli = Cli::parse();
    loggerv::init_with_verbosity(cli.verbose.into()).expect("unable to initialize the logger");

    let sampler = match rapl_exporter::build_sampler(
        &cli.powercap_path,
        cli.evict_stale,
        &utils::get_hostname(),
    ) {
        Ok(sampler) => sampler,
        Err(error) => {
            error!("{}", error);
            process::exit(1);
        }
    };

    let mut exporter = match build_exporter(cli.exporter, sampler) {
        Ok(exporter) => exporter,
        Err(error) => {
            error!("Couldn't start the exporter: {}", error);
            process::exit(1);
        }
    };
    if !cli.no_header {
        print_header(exporter.kind());
    }

    exporter.run();
}

fn build_exporter(
    choice: ExporterChoice,
    sampler: Arc<EnergySampler>,
) -> std::io::Result<Box<dyn exporters::Exporter>> {
    let exporter: Box<dyn exporters::Exporter> = match choice {
        #[cfg(feature = "json")]
        ExporterChoice::Json(args) => Box::new(exporters::json::JsonExporter::new(sampler, args)?),
        #[cfg(feature = "prometheus")]
        ExporterChoice::Prometheus(args) => {
            Box::new(exporters::prometheus::PrometheusExporter::new(sampler, args))
        }
        ExporterChoice::Stdout(args) => {
            Box::new(exporters::stdout::StdoutExporter::new(sampler, args))
        }
    };
    // Note that invalid choices are automatically turned into errors by `parse()` before the Cli is populated,
    // that's why they don't appear in this function.
    Ok(exporter)
}

fn print_header(exporter_name: &str) {
    let title = format!("rapl-exporter {exporter_name} exporter");
    println!("{}", title.red().bold());
    println!("Sending ⚡ metrics");
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
