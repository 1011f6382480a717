use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "uldl-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

const SMALL_SCENARIO: &str = r#"
{
    "prefix_name": "small",
    "sim_stop_s": 2.0,
    "app_stop_s": 1.5,
    "downlink": { "unit_size_bytes": 1000, "total_units": 50, "rate": "8Mb/s" },
    "uplink": { "unit_size_bytes": 500, "total_units": 20, "rate": "1Mb/s" }
}
"#;

fn read_rows(path: &Path) -> Vec<Vec<f64>> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
        .lines()
        .map(|line| {
            line.split_whitespace()
                .map(|col| col.parse::<f64>().expect("numeric column"))
                .collect()
        })
        .collect()
}

#[test]
fn tcp_uldl_writes_traces_for_both_directions() {
    let dir = unique_temp_dir("both");
    let config = write_file(&dir, "scenario.json", SMALL_SCENARIO);

    let output = Command::new(env!("CARGO_BIN_EXE_tcp_uldl"))
        .args(["--config", config.to_str().unwrap(), "--out-dir", dir.to_str().unwrap()])
        .output()
        .expect("run tcp_uldl");
    assert!(
        output.status.success(),
        "tcp_uldl failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    for d in ["dl", "ul"] {
        for tag in ["cwnd", "ssth", "rtt", "ack", "cong-state", "tp"] {
            let path = dir.join(format!("small-{d}-{tag}.data"));
            assert!(path.exists(), "missing {}", path.display());
        }
    }

    let tp = read_rows(&dir.join("small-dl-tp.data"));
    assert_eq!(tp.len(), 2);
    assert!(tp.iter().all(|row| row.len() == 3));
    assert_eq!(tp[0][0], 0.5);
    assert_eq!(tp[1][0], 1.5);
    assert!(tp.iter().all(|row| row[0] > 0.0));

    let cwnd = read_rows(&dir.join("small-dl-cwnd.data"));
    assert_eq!(cwnd[0], vec![0.0, 25_000.0]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dl: units_sent=50, bytes_received=50000"), "stdout={stdout}");
    assert!(stdout.contains("ul: units_sent=20, bytes_received=10000"), "stdout={stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn tcp_uldl_without_uplink_writes_only_downlink_traces() {
    let dir = unique_temp_dir("dl-only");
    let config = write_file(&dir, "scenario.json", SMALL_SCENARIO);

    let output = Command::new(env!("CARGO_BIN_EXE_tcp_uldl"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--out-dir",
            dir.to_str().unwrap(),
            "--enable-ul",
            "false",
            "--prefix-name",
            "dlonly",
        ])
        .output()
        .expect("run tcp_uldl");
    assert!(
        output.status.success(),
        "tcp_uldl failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(dir.join("dlonly-dl-tp.data").exists());
    assert!(dir.join("dlonly-dl-cwnd.data").exists());
    assert!(!dir.join("dlonly-ul-tp.data").exists());
    assert!(!dir.join("dlonly-ul-cwnd.data").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("ul:"), "stdout={stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn tcp_uldl_no_metrics_writes_only_throughput() {
    let dir = unique_temp_dir("no-metrics");
    let config = write_file(&dir, "scenario.json", SMALL_SCENARIO);

    let output = Command::new(env!("CARGO_BIN_EXE_tcp_uldl"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--out-dir",
            dir.to_str().unwrap(),
            "--no-metrics",
        ])
        .output()
        .expect("run tcp_uldl");
    assert!(output.status.success());

    let mut names: Vec<String> = fs::read_dir(&dir)
        .expect("read out dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".data"))
        .collect();
    names.sort();
    assert_eq!(names, vec!["small-dl-tp.data", "small-ul-tp.data"]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn tcp_uldl_rejects_invalid_config() {
    let dir = unique_temp_dir("bad-config");
    let config = write_file(
        &dir,
        "scenario.json",
        r#"{ "downlink": { "unit_size_bytes": 1400, "total_units": 10, "rate": 0 } }"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_tcp_uldl"))
        .args(["--config", config.to_str().unwrap(), "--out-dir", dir.to_str().unwrap()])
        .output()
        .expect("run tcp_uldl");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid parameter"), "stderr={stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn tcp_uldl_rejects_unparsable_config() {
    let dir = unique_temp_dir("unparsable");
    let config = write_file(&dir, "scenario.json", "{ not json");

    let output = Command::new(env!("CARGO_BIN_EXE_tcp_uldl"))
        .args(["--config", config.to_str().unwrap()])
        .output()
        .expect("run tcp_uldl");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("config:"));

    let _ = fs::remove_dir_all(&dir);
}
