//! # PrometheusExporter
//!
//! `PrometheusExporter` implementation, exposes metrics to
//! an HTTP endpoint matching the Prometheus.io text format.
use super::utils::escape_label_value;
use crate::exporters::{Exporter, Metric, MetricGenerator};
use crate::sensors::sampler::EnergySampler;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Write;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Default address to expose the service is any ipv4
const DEFAULT_IP_ADDRESS: &str = "0.0.0.0";

/// Exporter that exposes metrics to an HTTP endpoint
/// matching the Prometheus.io metrics format.
pub struct PrometheusExporter {
    sampler: Arc<EnergySampler>,
    args: ExporterArgs,
}

/// Holds the arguments for a PrometheusExporter.
#[derive(clap::Args, Debug)]
pub struct ExporterArgs {
    /// IP address (v4 or v6) of the metrics endpoint for Prometheus
    #[arg(short, long, default_value_t = String::from(DEFAULT_IP_ADDRESS))]
    pub address: String,

    /// TCP port of the metrics endpoint for Prometheus
    #[arg(short, long, default_value_t = 9110)]
    pub port: u16,

    /// Suffix of the metrics endpoint, as in /metrics
    #[arg(short, long, default_value_t = String::from("metrics"))]
    pub suffix: String,
}

impl PrometheusExporter {
    /// Instantiates PrometheusExporter and returns the instance.
    pub fn new(sampler: Arc<EnergySampler>, args: ExporterArgs) -> PrometheusExporter {
        PrometheusExporter { sampler, args }
    }
}

impl Exporter for PrometheusExporter {
    /// Starts an HTTP server to expose the metrics in Prometheus format.
    fn run(&mut self) {
        info!(
            "Starting Prometheus exporter on [{}]:{}/{}",
            self.args.address, self.args.port, self.args.suffix
        );
        let address = match self.args.address.parse::<IpAddr>() {
            Ok(address) => address,
            Err(error) => {
                error!("{} is not a valid IP address: {}", self.args.address, error);
                return;
            }
        };
        match runner(
            self.sampler.clone(),
            SocketAddr::new(address, self.args.port),
            self.args.suffix.clone(),
        ) {
            Ok(()) => warn!("Prometheus exporter shut down gracefully."),
            Err(error) => error!("Something failed in the prometheus exporter: {}", error),
        }
    }

    fn kind(&self) -> &str {
        "prometheus"
    }
}

#[tokio::main]
/// Main function running the HTTP server.
async fn runner(
    sampler: Arc<EnergySampler>,
    address: SocketAddr,
    endpoint: String,
) -> Result<(), hyper::Error> {
    let make_svc = make_service_fn(move |_| {
        let sampler = sampler.clone();
        let endpoint = endpoint.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                show_metrics(req, sampler.clone(), endpoint.clone())
            }))
        }
    });
    let server = Server::try_bind(&address)?.serve(make_svc);
    server.await
}

/// Samples the RAPL counters and answers with the text exposition format.
async fn show_metrics(
    req: Request<Body>,
    sampler: Arc<EnergySampler>,
    endpoint: String,
) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path();
    trace!("{}", path);
    if path.trim_start_matches('/') != endpoint {
        return Ok(landing_page(&endpoint));
    }

    // file reads are blocking, keep them off the reactor
    let generated = tokio::task::spawn_blocking(move || {
        let mut metric_generator = MetricGenerator::new(sampler);
        metric_generator.gen_all_metrics();
        metric_generator.pop_metrics()
    })
    .await;

    let response = match generated {
        Ok(metrics) => Response::builder()
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(Body::from(format_metrics(&metrics))),
        Err(error) => {
            error!("Sampling task failed: {}", error);
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("sampling failed\n"))
        }
    };
    Ok(response.unwrap_or_else(|_| Response::new(Body::empty())))
}

fn landing_page(endpoint: &str) -> Response<Body> {
    Response::new(Body::from(format!(
        "<a href=\"https://www.kernel.org/doc/html/latest/power/powercap/powercap.html\">RAPL</a> \
         energy exporter here. Metrics available on <a href=\"/{endpoint}\">/{endpoint}</a>"
    )))
}

/// Renders one metric line, e.g. `rapl_energy_joules{domain="core"} 1.5`.
pub fn format_metric(key: &str, value: &str, labels: Option<&BTreeMap<String, String>>) -> String {
    let mut result = String::from(key);
    if let Some(labels) = labels {
        if !labels.is_empty() {
            result.push('{');
            for (k, v) in labels.iter() {
                let _ = write!(result, "{}=\"{}\",", k, escape_label_value(v));
            }
            result.pop();
            result.push('}');
        }
    }
    let _ = writeln!(result, " {value}");
    result
}

/// Renders all metrics, with HELP and TYPE lines once per metric name.
pub fn format_metrics(metrics: &[Metric]) -> String {
    let mut body = String::new();
    let mut names: Vec<&str> = vec![];
    for m in metrics {
        if !names.contains(&m.name.as_str()) {
            names.push(&m.name);
        }
    }
    for name in names {
        let mut family = metrics.iter().filter(|m| m.name == name).peekable();
        if let Some(first) = family.peek() {
            let _ = writeln!(body, "# HELP {} {}", name, first.description);
            let _ = writeln!(body, "# TYPE {} {}", name, first.metric_type);
        }
        for m in family {
            body.push_str(&format_metric(
                name,
                &m.metric_value.to_string(),
                Some(&m.attributes),
            ));
        }
    }
    body
}
