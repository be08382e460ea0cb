use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn summary_reports_empty_history() {
    let dir = tempdir().unwrap();

    let output = Command::cargo_bin("seqmem")
        .unwrap()
        .args(["--summary", "--stats-dir"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "You have answered correctly 0 times out of 0 in 0 runs (0%)"
    );
}

#[test]
fn summary_reads_persisted_history() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("stats.json"),
        r#"[{"total":6,"correct":4},{"total":5,"correct":5}]"#,
    )
    .unwrap();

    let output = Command::cargo_bin("seqmem")
        .unwrap()
        .args(["--summary", "--stats-dir"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "You have answered correctly 9 times out of 11 in 2 runs (81.82%)"
    );
}

#[test]
fn reset_stats_needs_confirmation_flag() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("stats.json"), r#"[{"total":3,"correct":1}]"#).unwrap();

    Command::cargo_bin("seqmem")
        .unwrap()
        .args(["--reset-stats", "--stats-dir"])
        .arg(dir.path())
        .assert()
        .failure();
    assert_eq!(
        fs::read_to_string(dir.path().join("stats.json")).unwrap(),
        r#"[{"total":3,"correct":1}]"#
    );

    Command::cargo_bin("seqmem")
        .unwrap()
        .args(["--reset-stats", "--yes", "--stats-dir"])
        .arg(dir.path())
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(dir.path().join("stats.json")).unwrap(),
        "[]"
    );
}
