use rapl_exporter::build_sampler;
use rapl_exporter::sensors::sampler::Sample;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const MAX_RANGE: u64 = 4_294_967_295;

/// Creates a fake powercap zone under `root` and returns its folder.
fn add_zone(root: &Path, rel: &str, name: &str, energy_uj: u64) -> PathBuf {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("name"), format!("{name}\n")).unwrap();
    fs::write(dir.join("max_energy_range_uj"), format!("{MAX_RANGE}\n")).unwrap();
    set_energy(&dir, energy_uj);
    dir
}

fn set_energy(zone: &Path, energy_uj: u64) {
    fs::write(zone.join("energy_uj"), format!("{energy_uj}\n")).unwrap();
}

fn delta(sample: &Sample, key: &str) -> Option<u64> {
    sample.find(key).map(|v| v.record.value)
}

#[test]
fn package_counter_increment() {
    let root = TempDir::new().unwrap();
    let pkg = add_zone(root.path(), "intel-rapl:0", "package-0", 1000);
    let sampler = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();

    let first = sampler.sample();
    assert!(matches!(first, Sample::Complete(_)));
    assert_eq!(delta(&first, "pkg0-package"), Some(0));

    set_energy(&pkg, 1500);
    assert_eq!(delta(&sampler.sample(), "pkg0-package"), Some(500));
}

#[test]
fn package_counter_wraparound() {
    let root = TempDir::new().unwrap();
    let pkg = add_zone(root.path(), "intel-rapl:0", "package-0", 4_000_000_000);
    let sampler = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();
    sampler.sample();

    set_energy(&pkg, 50_000);
    assert_eq!(delta(&sampler.sample(), "pkg0-package"), Some(344_967_295));
}

#[test]
fn package_and_subdomains_tracked_separately() {
    let root = TempDir::new().unwrap();
    let pkg = add_zone(root.path(), "intel-rapl:0", "package-0", 10_000);
    let core = add_zone(root.path(), "intel-rapl:0/intel-rapl:0:0", "core", 5_000);
    let dram = add_zone(root.path(), "intel-rapl:0/intel-rapl:0:1", "dram", 100);
    let sampler = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();
    sampler.sample();

    set_energy(&pkg, 13_000);
    set_energy(&core, 6_000);
    set_energy(&dram, 50);
    let sample = sampler.sample();
    assert_eq!(delta(&sample, "pkg0-package"), Some(3_000));
    assert_eq!(delta(&sample, "pkg0-core"), Some(1_000));
    assert_eq!(delta(&sample, "pkg0-dram"), Some(50 + MAX_RANGE - 100));
    assert_eq!(sample.values().len(), 3);
}

#[test]
fn unreadable_subdomain_is_omitted() {
    let root = TempDir::new().unwrap();
    let pkg = add_zone(root.path(), "intel-rapl:0", "package-0", 1_000);
    let core = add_zone(root.path(), "intel-rapl:0/intel-rapl:0:0", "core", 1_000);
    let dram = add_zone(root.path(), "intel-rapl:0/intel-rapl:0:1", "dram", 1_000);
    let sampler = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();
    sampler.sample();

    // a directory in place of the counter can't be read, even as root
    fs::remove_file(dram.join("energy_uj")).unwrap();
    fs::create_dir(dram.join("energy_uj")).unwrap();
    set_energy(&pkg, 1_400);
    set_energy(&core, 1_200);

    match sampler.sample() {
        Sample::Partial(values, failures) => {
            assert_eq!(failures.len(), 1);
            let keys: Vec<&str> = values.iter().map(|v| v.key.as_str()).collect();
            assert_eq!(keys, vec!["pkg0-core", "pkg0-package"]);
            assert_eq!(values[0].record.value, 200);
            assert_eq!(values[1].record.value, 400);
        }
        other => panic!("expected a partial sample, got {other:?}"),
    }

    // once readable again, dram resumes from its last good baseline
    fs::remove_dir(dram.join("energy_uj")).unwrap();
    set_energy(&dram, 1_750);
    let sample = sampler.sample();
    assert!(matches!(sample, Sample::Complete(_)));
    assert_eq!(delta(&sample, "pkg0-dram"), Some(750));
}

#[test]
fn malformed_counter_is_omitted() {
    let root = TempDir::new().unwrap();
    let pkg = add_zone(root.path(), "intel-rapl:0", "package-0", 1_000);
    add_zone(root.path(), "intel-rapl:1", "package-1", 1_000);
    let sampler = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();
    sampler.sample();

    fs::write(pkg.join("energy_uj"), "garbage\n").unwrap();
    let sample = sampler.sample();
    assert!(matches!(sample, Sample::Partial(_, _)));
    assert_eq!(delta(&sample, "pkg0-package"), None);
    assert_eq!(delta(&sample, "pkg1-package"), Some(0));
}

#[test]
fn absent_interface_then_available() {
    let root = TempDir::new().unwrap();
    let powercap = root.path().join("powercap");
    let sampler = build_sampler(powercap.to_str().unwrap(), false, "host").unwrap();

    let sample = sampler.sample();
    assert!(sample.is_no_data());
    assert!(sample.values().is_empty());

    let pkg = add_zone(&powercap, "intel-rapl:0", "package-0", 2_000);
    assert_eq!(delta(&sampler.sample(), "pkg0-package"), Some(0));
    set_energy(&pkg, 2_600);
    assert_eq!(delta(&sampler.sample(), "pkg0-package"), Some(600));
}

#[test]
fn relative_root_is_a_hard_failure() {
    assert!(build_sampler("sys/class/powercap", false, "host").is_err());
}

#[test]
fn concurrent_samples_do_not_lose_energy() {
    let root = TempDir::new().unwrap();
    let pkg = add_zone(root.path(), "intel-rapl:0", "package-0", 1_000);
    let sampler = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();
    sampler.sample();
    set_energy(&pkg, 9_000);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sampler = Arc::clone(&sampler);
            thread::spawn(move || delta(&sampler.sample(), "pkg0-package").unwrap())
        })
        .collect();
    let deltas: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(deltas.iter().sum::<u64>(), 8_000);
    assert_eq!(deltas.iter().filter(|d| **d == 8_000).count(), 1);
}

#[test]
fn stale_domains_evicted_only_on_demand() {
    let root = TempDir::new().unwrap();
    add_zone(root.path(), "intel-rapl:0", "package-0", 1_000);
    let pkg1 = add_zone(root.path(), "intel-rapl:1", "package-1", 1_000);

    let keeping = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();
    let evicting = build_sampler(root.path().to_str().unwrap(), true, "host").unwrap();
    keeping.sample();
    evicting.sample();
    assert_eq!(keeping.tracked_domains(), 2);
    assert_eq!(evicting.tracked_domains(), 2);

    fs::remove_dir_all(&pkg1).unwrap();
    keeping.sample();
    evicting.sample();
    assert_eq!(keeping.tracked_domains(), 2);
    assert_eq!(evicting.tracked_domains(), 1);

    // a domain coming back after eviction starts from a fresh baseline
    let pkg1 = add_zone(root.path(), "intel-rapl:1", "package-1", 5_000);
    assert_eq!(delta(&evicting.sample(), "pkg1-package"), Some(0));
    assert_eq!(delta(&keeping.sample(), "pkg1-package"), Some(4_000));
    set_energy(&pkg1, 5_100);
    assert_eq!(delta(&evicting.sample(), "pkg1-package"), Some(100));
}

#[test]
fn enumeration_is_stable_across_samples() {
    let root = TempDir::new().unwrap();
    add_zone(root.path(), "intel-rapl:1", "package-1", 1);
    add_zone(root.path(), "intel-rapl:0", "package-0", 1);
    add_zone(root.path(), "intel-rapl:0/intel-rapl:0:0", "core", 1);
    let sampler = build_sampler(root.path().to_str().unwrap(), false, "host").unwrap();

    let keys = |s: &Sample| -> Vec<String> {
        s.values().iter().map(|v| v.key.to_string()).collect()
    };
    let first = keys(&sampler.sample());
    let second = keys(&sampler.sample());
    assert_eq!(first, vec!["pkg0-core", "pkg0-package", "pkg1-package"]);
    assert_eq!(first, second);
}
