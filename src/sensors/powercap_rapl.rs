use crate::errors::PowercapReadError;
use crate::sensors::utils::read_trimmed;
use crate::sensors::{EnergyDomain, Sensor, Topology};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the kernel exposes the powercap control types.
pub const DEFAULT_POWERCAP_PATH: &str = "/sys/class/powercap";

/// Name of the package-level domain, whatever its index.
pub const PACKAGE_DOMAIN_NAME: &str = "package";

/// Sensor enumerating RAPL domains from the powercap sysfs tree:
///
/// ```text
/// /sys/class/powercap/intel-rapl:0/name             -> package-0
/// /sys/class/powercap/intel-rapl:0/intel-rapl:0:0/name -> core
/// /sys/class/powercap/intel-rapl:0/intel-rapl:0:1/name -> dram
/// ```
pub struct PowercapRAPLSensor {
    base_path: PathBuf,
    re_package: Regex,
    re_domain: Regex,
}

impl PowercapRAPLSensor {
    /// Instantiates the sensor. Only the shape of `base_path` is checked here,
    /// a missing powercap tree is reported on each sample instead.
    pub fn new(base_path: &str) -> Result<PowercapRAPLSensor, PowercapReadError> {
        let path = PathBuf::from(base_path);
        if base_path.is_empty() || !path.is_absolute() {
            return Err(PowercapReadError::InvalidRoot(path));
        }
        Ok(PowercapRAPLSensor {
            base_path: path,
            re_package: Regex::new(r"^intel-rapl:(\d+)$").expect("package pattern is valid"),
            re_domain: Regex::new(r"^intel-rapl:(\d+):(\d+)$").expect("domain pattern is valid"),
        })
    }

    /// Lists (package_id, folder) for every top-level intel-rapl:X entry.
    fn list_packages(&self, topo: &mut Topology) -> Result<Vec<(u16, PathBuf)>, PowercapReadError> {
        let entries =
            fs::read_dir(&self.base_path).map_err(|e| PowercapReadError::from_io(e, &self.base_path))?;
        let mut packages = vec![];
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    topo.add_skipped(partial_failure(&self.base_path, error));
                    continue;
                }
            };
            let folder_name = entry.file_name();
            let Some(folder_name) = folder_name.to_str() else {
                continue;
            };
            if let Some(caps) = self.re_package.captures(folder_name) {
                match caps[1].parse::<u16>() {
                    Ok(package_id) => packages.push((package_id, entry.path())),
                    Err(_) => topo.add_skipped(PowercapReadError::EnumerationPartialFailure {
                        path: entry.path(),
                        cause: Box::new(PowercapReadError::MalformedReading {
                            path: entry.path(),
                            content: String::from(&caps[1]),
                        }),
                    }),
                }
            }
        }
        Ok(packages)
    }

    fn add_package(&self, topo: &mut Topology, package_id: u16, folder: &Path) {
        match read_trimmed(&folder.join("name")) {
            Ok(name) => {
                let name = normalize_domain_name(&name);
                trace!("Found package {} ({}) in {}", package_id, name, folder.display());
                topo.safe_add_domain(EnergyDomain::new(package_id, &name, folder));
            }
            Err(error) => topo.add_skipped(PowercapReadError::EnumerationPartialFailure {
                path: folder.to_path_buf(),
                cause: Box::new(error),
            }),
        }
    }

    /// Adds every intel-rapl:X:Y entry nested under a package folder.
    fn add_subdomains(&self, topo: &mut Topology, package_id: u16, folder: &Path) {
        let entries = match fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(error) => {
                topo.add_skipped(partial_failure(folder, error));
                return;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    topo.add_skipped(partial_failure(folder, error));
                    continue;
                }
            };
            let folder_name = entry.file_name();
            let Some(folder_name) = folder_name.to_str() else {
                continue;
            };
            let Some(caps) = self.re_domain.captures(folder_name) else {
                continue;
            };
            // intel-rapl:X:Y should only live under intel-rapl:X
            if caps[1].parse::<u16>().ok() != Some(package_id) {
                debug!("Ignoring {} under package {}", folder_name, package_id);
                continue;
            }
            let domain_folder = entry.path();
            match read_trimmed(&domain_folder.join("name")) {
                Ok(name) => {
                    trace!("Found domain {} in {}", name, domain_folder.display());
                    topo.safe_add_domain(EnergyDomain::new(package_id, &name, &domain_folder));
                }
                Err(error) => topo.add_skipped(PowercapReadError::EnumerationPartialFailure {
                    path: domain_folder,
                    cause: Box::new(error),
                }),
            }
        }
    }
}

impl Sensor for PowercapRAPLSensor {
    fn generate_topology(&self) -> Result<Topology, PowercapReadError> {
        let mut topo = Topology::new();
        let packages = self.list_packages(&mut topo)?;
        for (package_id, folder) in packages {
            self.add_package(&mut topo, package_id, &folder);
            self.add_subdomains(&mut topo, package_id, &folder);
        }
        topo.sort();
        debug!(
            "Topology generated from {}: {:?}",
            self.base_path.display(),
            topo.keys()
        );
        Ok(topo)
    }
}

/// package-0, package-1... all become "package", the index is in the key already.
fn normalize_domain_name(name: &str) -> String {
    match name.strip_prefix("package-") {
        Some(index) if index.chars().all(|c| c.is_ascii_digit()) => {
            String::from(PACKAGE_DOMAIN_NAME)
        }
        _ => String::from(name),
    }
}

fn partial_failure(path: &Path, error: std::io::Error) -> PowercapReadError {
    PowercapReadError::EnumerationPartialFailure {
        path: path.to_path_buf(),
        cause: Box::new(PowercapReadError::from_io(error, path)),
    }
}
