use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dc-cli"))
}

fn repo_root() -> PathBuf {
    // crates/dc-cli -> repo root
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures").join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn select(model: &str, seed: &str, draws: &str) -> serde_json::Value {
    let model = fixture_path(model);
    let model = model.to_string_lossy();
    let out = run(&["select", "--model", model.as_ref(), "--seed", seed, "--draws", draws]);
    assert!(
        out.status.success(),
        "select should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON")
}

fn counts(v: &serde_json::Value) -> Vec<(String, u64)> {
    v.get("counts")
        .and_then(|x| x.as_object())
        .expect("counts should be an object")
        .iter()
        .map(|(k, c)| (k.clone(), c.as_u64().expect("counts should be integers")))
        .collect()
}

#[test]
fn same_seed_same_draws() {
    let a = select("redbus_model.json", "7", "500");
    let b = select("redbus_model.json", "7", "500");
    assert_eq!(counts(&a), counts(&b));
    assert_eq!(a["seed"], 7);
    assert_eq!(a["draws"], 500);
    assert_eq!(a["model"], "red bus / blue bus");
}

#[test]
fn counts_cover_every_alternative_and_sum_to_draws() {
    let v = select("mnl_model.json", "11", "3000");
    let c = counts(&v);
    assert_eq!(c.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), vec!["highway", "local"]);
    assert_eq!(c.iter().map(|(_, n)| n).sum::<u64>(), 3000);

    // P(highway) = 2/3; 3000 draws keep the share well within 0.05.
    let share = c[0].1 as f64 / 3000.0;
    assert!((share - 2.0 / 3.0).abs() < 0.05, "highway share {share}");
}

#[test]
fn zero_draws_report_zero_counts() {
    let v = select("cross_model.json", "1", "0");
    assert!(counts(&v).iter().all(|(_, n)| *n == 0));
    assert_eq!(counts(&v).len(), 3);
}
