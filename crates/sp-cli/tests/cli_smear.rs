use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_specstat"))
}

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("specstat_cli_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

/// 1D energy spectrum (0..10 MeV, 10 bins) with 1000 counts in the middle.
fn write_peak_spectrum(path: &PathBuf) {
    let mut data = vec![0.0; 10];
    data[5] = 1000.0;
    let json = serde_json::json!({
        "axes": [{"name": "energy", "low": 0.0, "high": 10.0, "n_bins": 10}],
        "data": data,
    });
    std::fs::write(path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
}

fn load_data(path: &PathBuf) -> Vec<f64> {
    let json = std::fs::read_to_string(path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    v.get("data")
        .and_then(|d| d.as_array())
        .expect("data should be an array")
        .iter()
        .map(|x| x.as_f64().unwrap())
        .collect()
}

fn smeared_sibling(path: &PathBuf) -> PathBuf {
    let stem = path.file_stem().unwrap().to_str().unwrap();
    path.with_file_name(format!("{stem}_smeared.json"))
}

#[test]
fn test_smear_writes_smeared_sibling() {
    let input = tmp_path("peak.json");
    write_peak_spectrum(&input);

    let out = run(&["smear", input.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let output = smeared_sibling(&input);
    assert!(output.exists(), "expected {} to be written", output.display());

    let data = load_data(&output);
    let total: f64 = data.iter().sum();
    // Light-yield sigma at 5.5 MeV is ~0.17 MeV, far from the range edges,
    // so the total is conserved to numerical precision.
    assert!((total - 1000.0).abs() < 1e-6, "total {}", total);
    assert!(data[5] < 1000.0, "content must spread out of the peak bin");

    std::fs::remove_file(&input).ok();
    std::fs::remove_file(&output).ok();
}

#[test]
fn test_smear_with_fixed_energy_resolution() {
    let input = tmp_path("peak_eres.json");
    write_peak_spectrum(&input);

    let out = run(&["smear", "-r", "0.05", input.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let data = load_data(&smeared_sibling(&input));
    let total: f64 = data.iter().sum();
    // sigma = 0.05 * 5.5 MeV = 0.275 MeV; still well inside the range.
    assert!((total - 1000.0).abs() < 1e-6, "total {}", total);

    std::fs::remove_file(&input).ok();
    std::fs::remove_file(&smeared_sibling(&input)).ok();
}

#[test]
fn test_weight_parallel_matches_weight() {
    let serial_in = tmp_path("serial.json");
    let parallel_in = tmp_path("parallel.json");
    write_peak_spectrum(&serial_in);
    write_peak_spectrum(&parallel_in);

    let out = run(&["smear", "-m", "weight", serial_in.to_str().unwrap()]);
    assert!(out.status.success());
    let out = run(&[
        "smear",
        "-m",
        "weight_parallel",
        "--workers",
        "3",
        parallel_in.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let serial = load_data(&smeared_sibling(&serial_in));
    let parallel = load_data(&smeared_sibling(&parallel_in));
    for (s, p) in serial.iter().zip(&parallel) {
        assert!((s - p).abs() < 1e-9);
    }

    for p in [&serial_in, &parallel_in] {
        std::fs::remove_file(p).ok();
        std::fs::remove_file(&smeared_sibling(p)).ok();
    }
}

#[test]
fn test_random_smear_is_reproducible_per_seed() {
    let a_in = tmp_path("rand_a.json");
    let b_in = tmp_path("rand_b.json");
    write_peak_spectrum(&a_in);
    write_peak_spectrum(&b_in);

    let out = run(&["smear", "-m", "random", "--seed", "17", a_in.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let out = run(&["smear", "-m", "random", "--seed", "17", b_in.to_str().unwrap()]);
    assert!(out.status.success());

    assert_eq!(load_data(&smeared_sibling(&a_in)), load_data(&smeared_sibling(&b_in)));

    for p in [&a_in, &b_in] {
        std::fs::remove_file(p).ok();
        std::fs::remove_file(&smeared_sibling(p)).ok();
    }
}

#[test]
fn test_unknown_method_is_a_usage_error() {
    let input = tmp_path("unused.json");
    write_peak_spectrum(&input);

    let out = run(&["smear", "-m", "sideways", input.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("sideways"), "stderr: {}", stderr);
    assert!(!smeared_sibling(&input).exists());

    std::fs::remove_file(&input).ok();
}

#[test]
fn test_missing_input_file_fails() {
    let out = run(&["smear", "/nonexistent/spectrum.json"]);
    assert!(!out.status.success());
}
