use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "depiction-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_depiction<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_depiction");
    Command::new(bin)
        .args(args)
        .output()
        .expect("depiction command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should be valid json: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn geo_json_normalizes_out_of_range_input() {
    let output = run_depiction(["geo", "--lat", "95", "--lon", "190", "--radius", "1", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["latitude"], 90.0);
    let longitude = payload["longitude"].as_f64().expect("longitude should be a number");
    assert!((longitude + 170.0).abs() < 1e-9);
    let up = payload["up"].as_array().expect("up should be an array");
    assert!((up[1].as_f64().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn tiles_json_lists_the_neighbourhood() {
    let output = run_depiction([
        "tiles", "--lat", "45.5017", "--lon", "-73.5673", "--zoom", "10", "--radius", "1",
        "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["center"], "10/302/366");
    assert_eq!(payload["tiles"].as_array().map(Vec::len), Some(9));
}

#[test]
fn tiles_rejects_zoom_out_of_range() {
    let output = run_depiction(["tiles", "--lat", "0", "--lon", "0", "--zoom", "31"]);
    assert_failure(&output);
}

#[test]
fn tiles_rejects_an_oversized_radius() {
    let output = run_depiction([
        "tiles", "--lat", "0", "--lon", "0", "--zoom", "16", "--radius", "16000",
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("--radius"));
}

#[test]
fn load_reports_the_ledger() {
    let tmp = TempDirGuard::new("load");
    let store = tmp.path().join("entities.jsonl");
    fs::write(
        &store,
        concat!(
            "{\"id\":\"00000000-0000-0000-0000-000000000001\",\"name\":\"root\"}\n",
            "{\"id\":\"00000000-0000-0000-0000-000000000002\",\"transform\":{\"parent\":\"00000000-0000-0000-0000-000000000001\"}}\n",
        ),
    )
    .expect("store should write");

    let output = run_depiction(["load", "--store", store.to_str().unwrap(), "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["resident"], 2);
    assert_eq!(payload["ledger"]["reload_state"], "idle");
    assert_eq!(payload["ledger"]["entities"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        payload["ledger"]["loaders"][0]["scopes"][0]["key"],
        "named:all"
    );
}

#[test]
fn load_rejects_a_bad_config() {
    let tmp = TempDirGuard::new("bad-config");
    let config = tmp.path().join("datasource.toml");
    fs::write(&config, "name = \"\"\n").expect("config should write");

    let output = run_depiction([
        "load",
        "--store",
        tmp.path().join("missing.jsonl").to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("name must not be empty"));
}
